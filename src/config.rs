use std::{env, path::PathBuf};
use thiserror::Error;

const DEFAULT_REPO: &str = "mailwatch/incidents";
const DEFAULT_LABEL: &str = "mail-outage";
const DEFAULT_STATE_PATH: &str = "mailwatch-state.json";
const DEFAULT_API_BASE: &str = "https://api.github.com";
const DEFAULT_GMAIL_FEED_URL: &str = "https://www.google.com/appsstatus/dashboard/en/feed.atom";
const DEFAULT_ICLOUD_FEED_URL: &str =
    "https://www.apple.com/support/systemstatus/data/system_status_en_US.js";
const DEFAULT_ZOHO_FEED_URL: &str = "https://status.zoho.com/rss";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub github_token: String,
    pub repo_owner: String,
    pub repo_name: String,
    pub issue_label: String,
    pub state_path: PathBuf,
    pub api_base: String,
    pub gmail_feed_url: String,
    pub icloud_feed_url: String,
    pub zoho_feed_url: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing env var: {0}")]
    MissingEnv(String),
    #[error("invalid repo in env var {name}: expected owner/name, got {value}")]
    InvalidRepo { name: String, value: String },
}

impl AppConfig {
    /// Reads the runtime configuration from the environment. The tracker
    /// token is the only mandatory variable; everything else has a default
    /// so a single env var is enough for a scheduled run.
    pub fn from_env() -> Result<Self, ConfigError> {
        let github_token = read_token()?;

        let repo = env::var("MAILWATCH_REPO").unwrap_or_else(|_| DEFAULT_REPO.to_owned());
        let (repo_owner, repo_name) = parse_repo("MAILWATCH_REPO", &repo)?;

        let issue_label =
            env::var("MAILWATCH_LABEL").unwrap_or_else(|_| DEFAULT_LABEL.to_owned());
        let state_path = PathBuf::from(
            env::var("MAILWATCH_STATE_PATH").unwrap_or_else(|_| DEFAULT_STATE_PATH.to_owned()),
        );
        let api_base =
            env::var("MAILWATCH_API_BASE").unwrap_or_else(|_| DEFAULT_API_BASE.to_owned());

        let gmail_feed_url = env::var("MAILWATCH_GMAIL_FEED_URL")
            .unwrap_or_else(|_| DEFAULT_GMAIL_FEED_URL.to_owned());
        let icloud_feed_url = env::var("MAILWATCH_ICLOUD_FEED_URL")
            .unwrap_or_else(|_| DEFAULT_ICLOUD_FEED_URL.to_owned());
        let zoho_feed_url = env::var("MAILWATCH_ZOHO_FEED_URL")
            .unwrap_or_else(|_| DEFAULT_ZOHO_FEED_URL.to_owned());

        Ok(Self {
            github_token,
            repo_owner,
            repo_name,
            issue_label,
            state_path,
            api_base,
            gmail_feed_url,
            icloud_feed_url,
            zoho_feed_url,
        })
    }
}

/// The token is looked up under the mailwatch-specific name first so a shared
/// runner can still carry a plain GITHUB_TOKEN for other jobs.
fn read_token() -> Result<String, ConfigError> {
    env::var("MAILWATCH_GITHUB_TOKEN")
        .or_else(|_| env::var("GITHUB_TOKEN"))
        .map_err(|_| ConfigError::MissingEnv("MAILWATCH_GITHUB_TOKEN".to_owned()))
}

fn parse_repo(name: &str, value: &str) -> Result<(String, String), ConfigError> {
    match value.split_once('/') {
        Some((owner, repo)) if !owner.is_empty() && !repo.is_empty() && !repo.contains('/') => {
            Ok((owner.to_owned(), repo.to_owned()))
        }
        _ => Err(ConfigError::InvalidRepo {
            name: name.to_owned(),
            value: value.to_owned(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_splits_into_owner_and_name() {
        let parsed = parse_repo("MAILWATCH_REPO", "acme/status-issues");
        assert_eq!(
            parsed.ok(),
            Some(("acme".to_owned(), "status-issues".to_owned()))
        );
    }

    #[test]
    fn repo_without_separator_is_rejected() {
        assert!(parse_repo("MAILWATCH_REPO", "acme").is_err());
        assert!(parse_repo("MAILWATCH_REPO", "/status-issues").is_err());
        assert!(parse_repo("MAILWATCH_REPO", "acme/").is_err());
        assert!(parse_repo("MAILWATCH_REPO", "acme/too/deep").is_err());
    }
}
