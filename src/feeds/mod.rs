//! Provider feed adapters. Each parser is a pure function over the raw feed
//! body; [`FeedFetcher`] owns the HTTP side and the one-provider-cannot-
//! block-another policy.

pub mod atom;
pub mod jsonp;
pub mod rss;
pub mod text;

use crate::config::AppConfig;
use crate::models::{Incident, Provider};
use chrono::Utc;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT_VALUE: &str = concat!("mailwatch/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("malformed payload: {0}")]
    Payload(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct FeedFetcher {
    client: Client,
    gmail_feed_url: String,
    icloud_feed_url: String,
    zoho_feed_url: String,
}

impl FeedFetcher {
    pub fn new(config: &AppConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(USER_AGENT_VALUE)
            .timeout(HTTP_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            gmail_feed_url: config.gmail_feed_url.clone(),
            icloud_feed_url: config.icloud_feed_url.clone(),
            zoho_feed_url: config.zoho_feed_url.clone(),
        })
    }

    /// Checks every provider feed in order. A provider that fails to fetch or
    /// parse is logged and contributes nothing; it cannot block the others.
    pub async fn collect_all(&self) -> Vec<Incident> {
        let mut incidents = Vec::new();
        for provider in Provider::ALL {
            match self.collect_provider(provider).await {
                Ok(mut batch) => {
                    info!(provider = %provider, incidents = batch.len(), "feed checked");
                    incidents.append(&mut batch);
                }
                Err(error) => {
                    warn!(provider = %provider, error = %error, "feed check failed");
                }
            }
        }
        incidents
    }

    async fn collect_provider(&self, provider: Provider) -> Result<Vec<Incident>, FetchError> {
        match provider {
            Provider::Gmail => {
                let raw = self.fetch_text(&self.gmail_feed_url).await?;
                Ok(atom::parse(&raw))
            }
            Provider::Icloud => {
                let raw = self.fetch_text(&self.icloud_feed_url).await?;
                Ok(jsonp::parse(&raw)?)
            }
            Provider::Zoho => {
                let raw = self.fetch_text(&self.zoho_feed_url).await?;
                Ok(rss::parse(&raw, Utc::now()))
            }
        }
    }

    async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.text().await?)
    }
}
