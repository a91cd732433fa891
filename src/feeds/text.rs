//! Pure text helpers shared by the feed parsers. Each is a total function
//! over arbitrary input so parsers stay unit-testable on fixture strings.

use regex::Regex;
use std::sync::LazyLock;

static HTML_TAG: LazyLock<Regex> = LazyLock::new(|| compiled(r"</?[a-zA-Z][^>]*>"));

/// Compiles a pattern that is fixed at compile time.
#[expect(clippy::expect_used)]
pub(crate) fn compiled(pattern: &str) -> Regex {
    Regex::new(pattern).expect("hardcoded pattern")
}

/// First capture group of the first match, if any.
pub(crate) fn first_capture<'h>(pattern: &Regex, haystack: &'h str) -> Option<&'h str> {
    pattern
        .captures(haystack)
        .and_then(|captures| captures.get(1))
        .map(|group| group.as_str())
}

/// Decodes the HTML entities that show up in escaped feed markup.
pub fn unescape_entities(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(at) = rest.find('&') {
        let (head, tail) = rest.split_at(at);
        out.push_str(head);
        let mut matched = false;
        for (entity, replacement) in [
            ("&lt;", "<"),
            ("&gt;", ">"),
            ("&quot;", "\""),
            ("&#39;", "'"),
            ("&apos;", "'"),
            ("&nbsp;", " "),
            ("&amp;", "&"),
        ] {
            if let Some(after) = tail.strip_prefix(entity) {
                out.push_str(replacement);
                rest = after;
                matched = true;
                break;
            }
        }
        if !matched {
            out.push('&');
            rest = tail.get(1..).unwrap_or_default();
        }
    }
    out.push_str(rest);
    out
}

/// Removes markup tags and collapses all whitespace runs to single spaces.
pub fn strip_html(raw: &str) -> String {
    let without_tags = HTML_TAG.replace_all(raw, " ");
    collapse_whitespace(&without_tags)
}

pub fn collapse_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncates to at most `max` characters on a char boundary.
pub fn truncate_chars(raw: &str, max: usize) -> String {
    raw.chars().take(max).collect()
}

/// Strips an optional `<![CDATA[...]]>` wrapper around an element body.
pub fn strip_cdata(raw: &str) -> &str {
    let trimmed = raw.trim();
    match trimmed
        .strip_prefix("<![CDATA[")
        .and_then(|inner| inner.strip_suffix("]]>"))
    {
        Some(inner) => inner,
        None => trimmed,
    }
}
