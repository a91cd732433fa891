//! Feed A: the Google Workspace status dashboard Atom feed. Entries are
//! status updates, newest first, several per incident; the incident id lives
//! in the entry link under `incidents/`.

use crate::feeds::text;
use crate::models::{Incident, Provider};
use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

const SERVICE_NAME: &str = "Gmail";
const SERVICE_KEYWORD: &str = "gmail";
const RESOLVED_KEYWORD: &str = "resolved";
const TITLE_MAX_CHARS: usize = 200;
const DESCRIPTION_MAX_CHARS: usize = 1000;

static ENTRY_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| text::compiled(r"(?s)<entry\b[^>]*>(.*?)</entry>"));
static LINK_HREF: LazyLock<Regex> =
    LazyLock::new(|| text::compiled(r#"<link\b[^>]*href="([^"]*)""#));
static TITLE: LazyLock<Regex> =
    LazyLock::new(|| text::compiled(r"(?s)<title\b[^>]*>(.*?)</title>"));
static SUMMARY: LazyLock<Regex> =
    LazyLock::new(|| text::compiled(r"(?s)<summary\b[^>]*>(.*?)</summary>"));
static UPDATED: LazyLock<Regex> =
    LazyLock::new(|| text::compiled(r"<updated\b[^>]*>([^<]*)</updated>"));
static INCIDENT_PATH: LazyLock<Regex> =
    LazyLock::new(|| text::compiled(r##"incidents/([^/?\s"#]+)"##));

// Two phrasings the dashboard uses for when an incident started, matched
// against the unescaped summary markup.
static BEGAN_AT: LazyLock<Regex> = LazyLock::new(|| {
    text::compiled(r"(?i)<b>[^<]*incident began at\s+(\d{4}-\d{2}-\d{2} \d{2}:\d{2})")
});
static BEGINNING_ON: LazyLock<Regex> = LazyLock::new(|| {
    text::compiled(r"(?i)beginning on\s+[A-Za-z]+,?\s+(\d{4}-\d{2}-\d{2} \d{2}:\d{2})")
});
static DESCRIPTION_PASSAGE: LazyLock<Regex> =
    LazyLock::new(|| text::compiled(r"(?s)Description\s*:?\s*(.+?)\s*We will provide"));

/// Parses the Atom document into the Gmail incidents it reports. Entries
/// that do not mention the service, or carry no incident link, contribute
/// nothing; only the newest entry per incident id survives.
pub fn parse(raw: &str) -> Vec<Incident> {
    let mut seen_ids: HashSet<String> = HashSet::new();
    let mut incidents = Vec::new();

    for captures in ENTRY_BLOCK.captures_iter(raw) {
        let Some(entry) = captures.get(1).map(|group| group.as_str()) else {
            continue;
        };

        let Some(link) = text::first_capture(&LINK_HREF, entry) else {
            continue;
        };
        let Some(id) = extract_incident_id(link) else {
            continue;
        };

        let title_html =
            text::unescape_entities(text::first_capture(&TITLE, entry).unwrap_or_default());
        let summary_html =
            text::unescape_entities(text::first_capture(&SUMMARY, entry).unwrap_or_default());

        if !mentions_service(&title_html) && !mentions_service(&summary_html) {
            continue;
        }
        if !seen_ids.insert(id.to_owned()) {
            continue;
        }

        let is_resolved = mentions_resolved(&title_html) || mentions_resolved(&summary_html);
        let updated = text::first_capture(&UPDATED, entry)
            .and_then(|value| DateTime::parse_from_rfc3339(value.trim()).ok())
            .map(|value| value.with_timezone(&Utc));

        incidents.push(Incident {
            provider: Provider::Gmail,
            service: SERVICE_NAME.to_owned(),
            id: id.to_owned(),
            title: text::truncate_chars(&text::strip_html(&title_html), TITLE_MAX_CHARS),
            description: extract_description(&summary_html),
            link: link.to_owned(),
            start_time: extract_start_time(&summary_html),
            end_time: None,
            duration: None,
            updated,
            is_resolved,
            users_affected: None,
            status: None,
        });
    }

    incidents
}

fn mentions_service(html: &str) -> bool {
    html.to_lowercase().contains(SERVICE_KEYWORD)
}

fn mentions_resolved(html: &str) -> bool {
    html.to_lowercase().contains(RESOLVED_KEYWORD)
}

/// Trailing path segment after `incidents/` in the entry link.
fn extract_incident_id(link: &str) -> Option<&str> {
    text::first_capture(&INCIDENT_PATH, link)
}

/// Start time from the summary, trying the bolded "incident began at" phrase
/// first, then the "beginning on <weekday>, <date-time>" phrase. Timestamps
/// in the dashboard markup carry no zone and are taken as UTC.
fn extract_start_time(summary_html: &str) -> Option<DateTime<Utc>> {
    let captured = text::first_capture(&BEGAN_AT, summary_html)
        .or_else(|| text::first_capture(&BEGINNING_ON, summary_html))?;
    NaiveDateTime::parse_from_str(captured, "%Y-%m-%d %H:%M")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Plain-text description: markup stripped and whitespace collapsed; when a
/// "Description ... We will provide" passage exists, only its inner text is
/// kept.
fn extract_description(summary_html: &str) -> String {
    let plain = text::strip_html(summary_html);
    let passage = text::first_capture(&DESCRIPTION_PASSAGE, &plain).unwrap_or(&plain);
    text::truncate_chars(passage, DESCRIPTION_MAX_CHARS)
}
