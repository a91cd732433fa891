//! Feed C: the Zoho Mail status RSS feed. Items describe current disruption;
//! the feed never marks anything resolved, it just stops reporting it, so
//! incidents from here close only via retention.

use crate::feeds::text;
use crate::models::{Incident, Provider};
use chrono::{DateTime, Utc};
use regex::Regex;
use std::sync::LazyLock;

const SERVICE_NAME: &str = "Zoho Mail";
const STATUS_PAGE_URL: &str = "https://status.zoho.com";
const AVAILABLE_STATUS: &str = "available";
const KEYWORDS: [&str; 3] = ["mail", "smtp", "imap"];
const TITLE_MAX_CHARS: usize = 200;
const DESCRIPTION_MAX_CHARS: usize = 1000;

static ITEM_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| text::compiled(r"(?s)<item\b[^>]*>(.*?)</item>"));
static TITLE: LazyLock<Regex> =
    LazyLock::new(|| text::compiled(r"(?s)<title\b[^>]*>(.*?)</title>"));
static DESCRIPTION: LazyLock<Regex> =
    LazyLock::new(|| text::compiled(r"(?s)<description\b[^>]*>(.*?)</description>"));
static LINK: LazyLock<Regex> = LazyLock::new(|| text::compiled(r"(?s)<link\b[^>]*>(.*?)</link>"));
static GUID: LazyLock<Regex> = LazyLock::new(|| text::compiled(r"(?s)<guid\b[^>]*>(.*?)</guid>"));
static PUB_DATE: LazyLock<Regex> =
    LazyLock::new(|| text::compiled(r"<pubDate\b[^>]*>([^<]*)</pubDate>"));
static STATUS: LazyLock<Regex> =
    LazyLock::new(|| text::compiled(r"(?s)<status\b[^>]*>(.*?)</status>"));

/// Parses the RSS document. An item is kept when its text mentions a mail
/// keyword, or when its status element reports anything but "available".
/// Items without a guid get a synthetic id derived from `now`, which is NOT
/// stable across polls; such incidents may re-open under a fresh key each
/// run.
pub fn parse(raw: &str, now: DateTime<Utc>) -> Vec<Incident> {
    let mut incidents = Vec::new();

    for captures in ITEM_BLOCK.captures_iter(raw) {
        let Some(item) = captures.get(1).map(|group| group.as_str()) else {
            continue;
        };

        let title = plain_text(text::first_capture(&TITLE, item).unwrap_or_default());
        let description = plain_text(text::first_capture(&DESCRIPTION, item).unwrap_or_default());
        let status = text::first_capture(&STATUS, item)
            .map(|value| text::strip_cdata(value).trim().to_owned())
            .filter(|value| !value.is_empty());

        let keyword_hit = mentions_keyword(&title) || mentions_keyword(&description);
        let status_hit = status
            .as_deref()
            .is_some_and(|value| !value.eq_ignore_ascii_case(AVAILABLE_STATUS));
        if !keyword_hit && !status_hit {
            continue;
        }

        let id = text::first_capture(&GUID, item)
            .map(|value| text::strip_cdata(value).trim().to_owned())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| now.timestamp_millis().to_string());

        let link = text::first_capture(&LINK, item)
            .map(|value| text::strip_cdata(value).trim().to_owned())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| STATUS_PAGE_URL.to_owned());

        let start_time = text::first_capture(&PUB_DATE, item)
            .and_then(|value| DateTime::parse_from_rfc2822(value.trim()).ok())
            .map(|value| value.with_timezone(&Utc));

        incidents.push(Incident {
            provider: Provider::Zoho,
            service: SERVICE_NAME.to_owned(),
            id,
            title: text::truncate_chars(&title, TITLE_MAX_CHARS),
            description: text::truncate_chars(&description, DESCRIPTION_MAX_CHARS),
            link,
            start_time,
            end_time: None,
            duration: None,
            updated: None,
            // The feed reports only ongoing disruption; absence is the only
            // resolution signal and the engine never sees absent incidents.
            is_resolved: false,
            users_affected: None,
            status,
        });
    }

    incidents
}

fn plain_text(element_body: &str) -> String {
    text::strip_html(&text::unescape_entities(text::strip_cdata(element_body)))
}

fn mentions_keyword(plain: &str) -> bool {
    let lowered = plain.to_lowercase();
    KEYWORDS.iter().any(|keyword| lowered.contains(keyword))
}
