use crate::{
    config::AppConfig,
    models::{Incident, Provider},
};
use reqwest::{
    Client,
    header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT},
};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT_VALUE: &str = concat!("mailwatch/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid tracker token: {0}")]
    InvalidToken(#[from] reqwest::header::InvalidHeaderValue),
}

/// Issue-tracker operations the reconciliation engine needs. Tests swap in a
/// recording mock; production uses [`GithubTracker`].
#[async_trait::async_trait]
pub trait Tracker {
    /// Finds an open issue previously created for this incident, by label and
    /// by the incident key embedded in the issue body. This is how orphaned
    /// local state is re-associated after the state file is lost.
    async fn search_open_issue(
        &self,
        provider: Provider,
        id: &str,
    ) -> Result<Option<u64>, TrackerError>;

    async fn create_issue(&self, incident: &Incident) -> Result<u64, TrackerError>;

    async fn comment(&self, issue_number: u64, body: &str) -> Result<(), TrackerError>;

    async fn close_issue(&self, issue_number: u64) -> Result<(), TrackerError>;
}

pub struct GithubTracker {
    http: Client,
    api_base: String,
    owner: String,
    repo: String,
    label: String,
}

impl GithubTracker {
    pub fn new(config: &AppConfig) -> Result<Self, TrackerError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "x-github-api-version",
            HeaderValue::from_static("2022-11-28"),
        );
        let auth = format!("Bearer {}", config.github_token.trim());
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&auth)?);

        let http = Client::builder()
            .default_headers(headers)
            .timeout(HTTP_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_owned(),
            owner: config.repo_owner.clone(),
            repo: config.repo_name.clone(),
            label: config.issue_label.clone(),
        })
    }
}

#[async_trait::async_trait]
impl Tracker for GithubTracker {
    async fn search_open_issue(
        &self,
        provider: Provider,
        id: &str,
    ) -> Result<Option<u64>, TrackerError> {
        let query = format!(
            "repo:{}/{} is:issue is:open label:{} \"{}-{}\" in:body",
            self.owner, self.repo, self.label, provider, id
        );

        let response = self
            .http
            .get(format!("{}/search/issues", self.api_base))
            .query(&[("q", query.as_str()), ("per_page", "1")])
            .send()
            .await?
            .error_for_status()?
            .json::<SearchResponse>()
            .await?;

        Ok(response.items.first().map(|item| item.number))
    }

    async fn create_issue(&self, incident: &Incident) -> Result<u64, TrackerError> {
        let payload = serde_json::json!({
            "title": incident.title,
            "body": issue_body(incident),
            "labels": [self.label],
        });

        let response = self
            .http
            .post(format!(
                "{}/repos/{}/{}/issues",
                self.api_base, self.owner, self.repo
            ))
            .json(&payload)
            .send()
            .await?
            .error_for_status()?
            .json::<IssueResponse>()
            .await?;

        Ok(response.number)
    }

    async fn comment(&self, issue_number: u64, body: &str) -> Result<(), TrackerError> {
        self.http
            .post(format!(
                "{}/repos/{}/{}/issues/{}/comments",
                self.api_base, self.owner, self.repo, issue_number
            ))
            .json(&serde_json::json!({ "body": body }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn close_issue(&self, issue_number: u64) -> Result<(), TrackerError> {
        self.http
            .patch(format!(
                "{}/repos/{}/{}/issues/{}",
                self.api_base, self.owner, self.repo, issue_number
            ))
            .json(&serde_json::json!({
                "state": "closed",
                "state_reason": "completed",
            }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// Renders the issue body. The trailing key line is load-bearing: recovery
/// search matches on it, so it must stay textual and unambiguous.
pub fn issue_body(incident: &Incident) -> String {
    let mut body = format!(
        "**Service**: {}\n**Provider**: {}\n**Status page**: {}\n",
        incident.service, incident.provider, incident.link
    );
    if let Some(start_time) = incident.start_time {
        body.push_str(&format!("**Started**: {}\n", start_time.to_rfc3339()));
    }
    if let Some(status) = &incident.status {
        body.push_str(&format!("**Status**: {status}\n"));
    }
    if let Some(users_affected) = &incident.users_affected {
        body.push_str(&format!("**Users affected**: {users_affected}\n"));
    }
    if !incident.description.is_empty() {
        body.push('\n');
        body.push_str(&incident.description);
        body.push('\n');
    }
    body.push_str(&format!("\nIncident key: {}\n", incident.key()));
    body
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    number: u64,
}

#[derive(Debug, Deserialize)]
struct IssueResponse {
    number: u64,
}
