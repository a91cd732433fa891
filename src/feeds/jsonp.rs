//! Feed B: the iCloud system status payload. JSON, usually wrapped in a
//! JSONP callback call that has to be stripped before parsing. One incident
//! per event on the matching mail service.

use crate::feeds::text;
use crate::models::{Incident, Provider};
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;

const SERVICE_NAME: &str = "iCloud Mail";
const STATUS_PAGE_URL: &str = "https://www.apple.com/support/systemstatus/";
const RESOLVED_STATUS: &str = "resolved";
const TITLE_MAX_CHARS: usize = 200;
const DESCRIPTION_MAX_CHARS: usize = 1000;

/// Parses the (possibly JSONP-wrapped) payload into incidents for the target
/// mail service. Malformed JSON is an error for the caller to log; a payload
/// without the service or without events is simply empty.
pub fn parse(raw: &str) -> Result<Vec<Incident>, serde_json::Error> {
    let payload: StatusPayload = serde_json::from_str(strip_callback(raw))?;

    let mut incidents = Vec::new();
    for service in payload.services {
        if !service.service_name.eq_ignore_ascii_case(SERVICE_NAME) {
            continue;
        }
        for event in service.events {
            // An event with no id cannot be reconciled across runs; drop it
            // rather than fabricating a key.
            let Some(id) = event.message_id.clone() else {
                continue;
            };

            let start_time = event.epoch_start_date.and_then(timestamp_from_millis);
            let end_time = event.epoch_end_date.and_then(timestamp_from_millis);
            let duration = match (event.epoch_start_date, event.epoch_end_date) {
                (Some(start), Some(end)) => format_duration_ms(end.saturating_sub(start)),
                _ => None,
            };

            let status_type = event.status_type.clone().unwrap_or_default();
            let title = if status_type.is_empty() {
                format!("{}: incident", service.service_name)
            } else {
                format!("{}: {}", service.service_name, status_type)
            };

            incidents.push(Incident {
                provider: Provider::Icloud,
                service: service.service_name.clone(),
                id,
                title: text::truncate_chars(&title, TITLE_MAX_CHARS),
                description: text::truncate_chars(
                    event.message.as_deref().unwrap_or_default(),
                    DESCRIPTION_MAX_CHARS,
                ),
                link: STATUS_PAGE_URL.to_owned(),
                start_time,
                end_time,
                duration,
                updated: None,
                is_resolved: event.event_status.as_deref() == Some(RESOLVED_STATUS),
                users_affected: event.users_affected,
                status: event.status_type,
            });
        }
    }

    Ok(incidents)
}

/// Unwraps a JSONP callback: drops everything up to and including the first
/// `(`, plus the trailing `)` and optional `;`. A payload that already starts
/// with `{` or `[` passes through untouched.
pub fn strip_callback(raw: &str) -> &str {
    let trimmed = raw.trim();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return trimmed;
    }
    let Some(open) = trimmed.find('(') else {
        return trimmed;
    };
    let inner = trimmed.get(open + 1..).unwrap_or_default().trim_end();
    let inner = inner.strip_suffix(';').unwrap_or(inner).trim_end();
    inner.strip_suffix(')').unwrap_or(inner).trim()
}

/// Span between two epoch-millisecond stamps, in minutes rounded to nearest:
/// under an hour as `"<N> minute(s)"`, otherwise `"<H> hour(s)"` with the
/// minute clause appended only when nonzero.
fn format_duration_ms(delta_ms: i64) -> Option<String> {
    if delta_ms < 0 {
        return None;
    }
    let minutes = (delta_ms + 30_000) / 60_000;
    if minutes < 60 {
        return Some(pluralize(minutes, "minute"));
    }
    let hours = minutes / 60;
    let remainder = minutes % 60;
    if remainder == 0 {
        Some(pluralize(hours, "hour"))
    } else {
        Some(format!(
            "{} {}",
            pluralize(hours, "hour"),
            pluralize(remainder, "minute")
        ))
    }
}

fn pluralize(value: i64, unit: &str) -> String {
    if value == 1 {
        format!("1 {unit}")
    } else {
        format!("{value} {unit}s")
    }
}

fn timestamp_from_millis(millis: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis).single()
}

#[derive(Debug, Deserialize)]
struct StatusPayload {
    #[serde(default)]
    services: Vec<ServiceEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServiceEntry {
    #[serde(default)]
    service_name: String,
    #[serde(default)]
    events: Vec<ServiceEvent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServiceEvent {
    message_id: Option<String>,
    status_type: Option<String>,
    event_status: Option<String>,
    message: Option<String>,
    users_affected: Option<String>,
    epoch_start_date: Option<i64>,
    epoch_end_date: Option<i64>,
}
