use std::time::Duration;

use feed_rs::model::Feed;
use feed_rs::parser;
use reqwest::{Client, StatusCode};
use tracing::{debug, info, warn};

use crate::model::Snapshot;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {0}")]
    Status(StatusCode),
    #[error("malformed feed: {0}")]
    Feed(#[from] parser::ParseFeedError),
    #[error("malformed json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Network access needed by the collection pipeline.
#[allow(async_fn_in_trait)]
pub trait Source {
    /// Download and parse one RSS/Atom document
    async fn fetch_feed(&self, url: &str) -> Result<Feed, FetchError>;

    /// Download an article page as text
    async fn fetch_page(&self, url: &str) -> Result<String, FetchError>;
}

/// Access to the payload currently deployed on the live site.
#[allow(async_fn_in_trait)]
pub trait SnapshotSource {
    async fn fetch_previous_snapshot(&self) -> Option<Snapshot>;
}

pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;

        Ok(Self { client })
    }

    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }
        Ok(response.bytes().await?.to_vec())
    }

    pub async fn fetch_json(&self, url: &str) -> Result<serde_json::Value, FetchError> {
        let bytes = self.get_bytes(url).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

impl Source for Fetcher {
    async fn fetch_feed(&self, url: &str) -> Result<Feed, FetchError> {
        info!("Fetching feed: {}", url);
        let bytes = self.get_bytes(url).await?;
        Ok(parser::parse(&bytes[..])?)
    }

    async fn fetch_page(&self, url: &str) -> Result<String, FetchError> {
        let bytes = self.get_bytes(url).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// The deployed `news.json`, reached over HTTP.
pub struct LiveSnapshot<'a> {
    fetcher: &'a Fetcher,
    url: String,
}

impl<'a> LiveSnapshot<'a> {
    pub fn new(fetcher: &'a Fetcher, url: String) -> Self {
        Self { fetcher, url }
    }
}

impl SnapshotSource for LiveSnapshot<'_> {
    async fn fetch_previous_snapshot(&self) -> Option<Snapshot> {
        match self.fetcher.fetch_json(&self.url).await {
            Ok(value) if value.is_object() => Some(Snapshot::new(value)),
            Ok(_) => {
                debug!("Live artifact at {} is not a JSON object", self.url);
                None
            }
            Err(e) => {
                warn!("Could not fetch live artifact {}: {}", self.url, e);
                None
            }
        }
    }
}
