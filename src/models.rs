use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Gmail,
    Icloud,
    Zoho,
}

impl Provider {
    pub const ALL: [Provider; 3] = [Provider::Gmail, Provider::Icloud, Provider::Zoho];

    pub fn as_str(self) -> &'static str {
        match self {
            Provider::Gmail => "gmail",
            Provider::Icloud => "icloud",
            Provider::Zoho => "zoho",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// One service disruption as reported by a provider feed for one poll.
#[derive(Debug, Clone, PartialEq)]
pub struct Incident {
    pub provider: Provider,
    pub service: String,
    pub id: String,
    pub title: String,
    pub description: String,
    pub link: String,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration: Option<String>,
    pub updated: Option<DateTime<Utc>>,
    pub is_resolved: bool,
    pub users_affected: Option<String>,
    pub status: Option<String>,
}

impl Incident {
    /// Composite key identifying the same real-world event across runs.
    pub fn key(&self) -> String {
        format!("{}-{}", self.provider, self.id)
    }
}

/// Persisted association between an incident key and its tracker issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingRecord {
    pub issue_number: u64,
    pub is_resolved: bool,
    pub created_at: DateTime<Utc>,
    pub last_update: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
}

/// The state file document: one tracking record per incident key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchState {
    #[serde(default)]
    pub incidents: BTreeMap<String, TrackingRecord>,
    pub last_run: DateTime<Utc>,
}

impl Default for WatchState {
    fn default() -> Self {
        Self {
            incidents: BTreeMap::new(),
            last_run: DateTime::UNIX_EPOCH,
        }
    }
}
