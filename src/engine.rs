//! The reconciliation engine: compares each freshly polled incident with its
//! persisted tracking record and drives the tracker accordingly. One pass per
//! invocation; all clock-dependent logic takes `now` explicitly.

use crate::models::{Incident, TrackingRecord, WatchState};
use crate::tracker::{Tracker, TrackerError};
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

/// Minimum gap between progress comments on a still-active incident.
const UPDATE_INTERVAL_HOURS: i64 = 2;
/// Resolved records older than this are dropped from the state file.
pub const RETENTION_DAYS: i64 = 7;

/// What the state machine wants to do for one `(provider, id)` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// No local record and the incident is active: adopt an existing open
    /// issue if the tracker has one for this key, otherwise create one.
    CreateOrRecover,
    /// Tracked and still active: post a progress comment.
    Update,
    /// Tracked as active but the provider now reports it resolved.
    Close,
    Skip,
}

/// The decision table. Resolved records are final: they are never reopened,
/// and an incident that was never tracked is not worth creating just to
/// close.
pub fn decide(
    prior: Option<&TrackingRecord>,
    incident_resolved: bool,
    now: DateTime<Utc>,
) -> Decision {
    match prior {
        None if incident_resolved => Decision::Skip,
        None => Decision::CreateOrRecover,
        Some(record) if record.is_resolved => Decision::Skip,
        Some(_) if incident_resolved => Decision::Close,
        Some(record)
            if now - record.last_update >= Duration::hours(UPDATE_INTERVAL_HOURS) =>
        {
            Decision::Update
        }
        Some(_) => Decision::Skip,
    }
}

/// Counters for one reconciliation pass, logged at completion.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub created: usize,
    pub recovered: usize,
    pub updated: usize,
    pub closed: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Runs the state machine over every polled incident, then prunes expired
/// resolved records and stamps the run. A tracker failure for one incident is
/// logged and leaves its record untouched; the remaining incidents still
/// process and the caller still persists the state.
pub async fn reconcile(
    state: &mut WatchState,
    incidents: &[Incident],
    tracker: &impl Tracker,
    now: DateTime<Utc>,
) -> ReconcileSummary {
    let mut summary = ReconcileSummary::default();

    for incident in incidents {
        let key = incident.key();
        match decide(state.incidents.get(&key), incident.is_resolved, now) {
            Decision::Skip => {
                debug!(key = %key, resolved = incident.is_resolved, "no action");
                summary.skipped += 1;
            }
            Decision::CreateOrRecover => match create_or_recover(incident, tracker, now).await {
                Ok((record, recovered)) => {
                    if recovered {
                        info!(key = %key, issue = record.issue_number, "adopted existing open issue");
                        summary.recovered += 1;
                    } else {
                        info!(key = %key, issue = record.issue_number, "issue created");
                        summary.created += 1;
                    }
                    state.incidents.insert(key, record);
                }
                Err(error) => {
                    warn!(key = %key, error = %error, "issue creation failed, will retry next run");
                    summary.failed += 1;
                }
            },
            Decision::Update => {
                let Some(record) = state.incidents.get_mut(&key) else {
                    continue;
                };
                match tracker
                    .comment(record.issue_number, &progress_comment(incident))
                    .await
                {
                    Ok(()) => {
                        record.last_update = now;
                        info!(key = %key, issue = record.issue_number, "progress comment posted");
                        summary.updated += 1;
                    }
                    Err(error) => {
                        warn!(key = %key, issue = record.issue_number, error = %error, "progress comment failed");
                        summary.failed += 1;
                    }
                }
            }
            Decision::Close => {
                let Some(record) = state.incidents.get_mut(&key) else {
                    continue;
                };
                match close_out(record.issue_number, incident, tracker).await {
                    Ok(()) => {
                        record.is_resolved = true;
                        record.resolved_at = Some(now);
                        record.last_update = now;
                        info!(key = %key, issue = record.issue_number, "issue closed");
                        summary.closed += 1;
                    }
                    Err(error) => {
                        warn!(key = %key, issue = record.issue_number, error = %error, "close failed, will retry next run");
                        summary.failed += 1;
                    }
                }
            }
        }
    }

    let pruned = prune_resolved(state, now);
    if pruned > 0 {
        info!(pruned, "expired resolved records dropped");
    }
    state.last_run = now;

    summary
}

async fn create_or_recover(
    incident: &Incident,
    tracker: &impl Tracker,
    now: DateTime<Utc>,
) -> Result<(TrackingRecord, bool), TrackerError> {
    let (issue_number, recovered) = match tracker
        .search_open_issue(incident.provider, &incident.id)
        .await?
    {
        Some(number) => (number, true),
        None => (tracker.create_issue(incident).await?, false),
    };

    Ok((
        TrackingRecord {
            issue_number,
            is_resolved: false,
            created_at: now,
            last_update: now,
            resolved_at: None,
        },
        recovered,
    ))
}

async fn close_out(
    issue_number: u64,
    incident: &Incident,
    tracker: &impl Tracker,
) -> Result<(), TrackerError> {
    tracker
        .comment(issue_number, &close_comment(incident))
        .await?;
    tracker.close_issue(issue_number).await
}

fn progress_comment(incident: &Incident) -> String {
    let mut body = format!("Still active per the {} status feed.", incident.service);
    if let Some(status) = &incident.status {
        body.push_str(&format!("\nStatus: {status}"));
    }
    if !incident.description.is_empty() {
        body.push_str("\n\n");
        body.push_str(&incident.description);
    }
    body
}

fn close_comment(incident: &Incident) -> String {
    let mut body = format!(
        "The {} status feed reports this incident as resolved.",
        incident.service
    );
    if let Some(duration) = &incident.duration {
        body.push_str(&format!("\nOutage duration: {duration}."));
    }
    if let Some(end_time) = incident.end_time {
        body.push_str(&format!("\nEnded: {}.", end_time.to_rfc3339()));
    }
    body
}

/// True when a resolved record has aged out of the retention window. A
/// resolved record without a timestamp counts from epoch zero, so it is
/// always expired.
pub fn is_expired(record: &TrackingRecord, now: DateTime<Utc>) -> bool {
    if !record.is_resolved {
        return false;
    }
    let resolved_at = record.resolved_at.unwrap_or(DateTime::UNIX_EPOCH);
    resolved_at < now - Duration::days(RETENTION_DAYS)
}

/// Drops expired resolved records; returns how many were removed.
pub fn prune_resolved(state: &mut WatchState, now: DateTime<Utc>) -> usize {
    let before = state.incidents.len();
    state.incidents.retain(|_, record| !is_expired(record, now));
    before - state.incidents.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::UNIX_EPOCH + Duration::days(30)
    }

    fn record(
        is_resolved: bool,
        last_update: DateTime<Utc>,
        resolved_at: Option<DateTime<Utc>>,
    ) -> TrackingRecord {
        TrackingRecord {
            issue_number: 1,
            is_resolved,
            created_at: DateTime::UNIX_EPOCH,
            last_update,
            resolved_at,
        }
    }

    #[test]
    fn active_incident_without_record_creates_or_recovers() {
        assert_eq!(decide(None, false, now()), Decision::CreateOrRecover);
    }

    #[test]
    fn resolved_incident_without_record_is_ignored() {
        assert_eq!(decide(None, true, now()), Decision::Skip);
    }

    #[test]
    fn active_record_closes_when_provider_reports_resolved() {
        let prior = record(false, now(), None);
        assert_eq!(decide(Some(&prior), true, now()), Decision::Close);
    }

    #[test]
    fn resolved_record_is_never_reopened() {
        let prior = record(true, now(), Some(now()));
        assert_eq!(decide(Some(&prior), false, now()), Decision::Skip);
        assert_eq!(decide(Some(&prior), true, now()), Decision::Skip);
    }

    #[test]
    fn progress_update_waits_for_the_two_hour_window() {
        let at = now();
        let fresh = record(false, at - Duration::minutes(119), None);
        assert_eq!(decide(Some(&fresh), false, at), Decision::Skip);

        let due = record(false, at - Duration::hours(2), None);
        assert_eq!(decide(Some(&due), false, at), Decision::Update);
    }

    #[test]
    fn pruning_honors_the_seven_day_boundary() {
        let at = now();
        let mut state = WatchState::default();
        state.incidents.insert(
            "gmail-old".to_owned(),
            record(true, at, Some(at - Duration::days(7) - Duration::seconds(1))),
        );
        state.incidents.insert(
            "gmail-fresh".to_owned(),
            record(true, at, Some(at - Duration::days(6) - Duration::hours(23))),
        );
        state.incidents.insert(
            "gmail-active".to_owned(),
            record(false, at - Duration::days(30), None),
        );

        assert_eq!(prune_resolved(&mut state, at), 1);
        assert!(!state.incidents.contains_key("gmail-old"));
        assert!(state.incidents.contains_key("gmail-fresh"));
        assert!(state.incidents.contains_key("gmail-active"));
    }

    #[test]
    fn resolved_record_without_timestamp_is_expired() {
        let orphan = record(true, now(), None);
        assert!(is_expired(&orphan, now()));
    }

    #[test]
    fn active_record_never_expires() {
        let active = record(false, DateTime::UNIX_EPOCH, None);
        assert!(!is_expired(&active, now()));
    }
}
