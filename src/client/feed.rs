//! Pulse feed sources
//!
//! The pulse page polls its API with a `{"category": "new"}` query; we replay
//! that request directly and fall back to a plain GET of the same endpoint.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, REFERER, USER_AGENT};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::config::Config;
use crate::core::error::FeedError;

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Envelope returned by the pulse API
#[derive(Debug, Clone, Deserialize)]
pub struct FeedResponse {
    #[serde(default)]
    pub data: Vec<Value>,
}

/// Anything that can deliver one raw batch of pulse items
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<Value>, FeedError>;

    fn name(&self) -> &str;
}

fn build_client(config: &Config) -> Result<Client, FeedError> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    if let Ok(referer) = HeaderValue::from_str(&config.monitor_url) {
        headers.insert(REFERER, referer);
    }

    let client = Client::builder()
        .default_headers(headers)
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .build()?;
    Ok(client)
}

async fn read_batch(response: reqwest::Response) -> Result<Vec<Value>, FeedError> {
    let status = response.status();
    if !status.is_success() {
        return Err(FeedError::Status(status.as_u16()));
    }
    let body = response.bytes().await?;
    let envelope: FeedResponse = serde_json::from_slice(&body)?;
    Ok(envelope.data)
}

/// Plain `GET` of the pulse API
pub struct DirectFeedClient {
    client: Client,
    api_url: String,
}

impl DirectFeedClient {
    pub fn new(config: &Config) -> Result<Self, FeedError> {
        Ok(Self {
            client: build_client(config)?,
            api_url: config.api_url.clone(),
        })
    }
}

#[async_trait]
impl FeedSource for DirectFeedClient {
    #[instrument(skip(self), fields(url = %self.api_url))]
    async fn fetch(&self) -> Result<Vec<Value>, FeedError> {
        debug!("Calling pulse API directly");
        let response = self.client.get(&self.api_url).send().await?;
        let data = read_batch(response).await?;
        debug!(items = data.len(), "Direct fetch complete");
        Ok(data)
    }

    fn name(&self) -> &str {
        "direct"
    }
}

/// `POST` of the category query the pulse page issues
pub struct PulseQueryClient {
    client: Client,
    api_url: String,
    category: String,
}

impl PulseQueryClient {
    pub fn new(config: &Config) -> Result<Self, FeedError> {
        Ok(Self {
            client: build_client(config)?,
            api_url: config.api_url.clone(),
            category: config.pulse_category.clone(),
        })
    }
}

#[async_trait]
impl FeedSource for PulseQueryClient {
    #[instrument(skip(self), fields(url = %self.api_url, category = %self.category))]
    async fn fetch(&self) -> Result<Vec<Value>, FeedError> {
        let query = serde_json::json!({ "category": self.category });
        let response = self.client.post(&self.api_url).json(&query).send().await?;
        let data = read_batch(response).await?;
        debug!(items = data.len(), "Pulse query complete");
        Ok(data)
    }

    fn name(&self) -> &str {
        "pulse-query"
    }
}

/// Saved pulse response on disk, for replays
pub struct FileFeed {
    path: PathBuf,
}

impl FileFeed {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl FeedSource for FileFeed {
    async fn fetch(&self) -> Result<Vec<Value>, FeedError> {
        let content = tokio::fs::read(&self.path).await?;
        let envelope: FeedResponse = serde_json::from_slice(&content)?;
        info!(path = %self.path.display(), items = envelope.data.len(), "Loaded saved feed");
        Ok(envelope.data)
    }

    fn name(&self) -> &str {
        "file"
    }
}

/// Tries `primary`, then `secondary` when the primary fails
pub struct FallbackFeed {
    primary: Box<dyn FeedSource>,
    secondary: Box<dyn FeedSource>,
}

impl FallbackFeed {
    pub fn new(primary: Box<dyn FeedSource>, secondary: Box<dyn FeedSource>) -> Self {
        Self { primary, secondary }
    }

    /// Pulse query first, direct GET as fallback
    pub fn from_config(config: &Config) -> Result<Self, FeedError> {
        Ok(Self::new(
            Box::new(PulseQueryClient::new(config)?),
            Box::new(DirectFeedClient::new(config)?),
        ))
    }
}

#[async_trait]
impl FeedSource for FallbackFeed {
    async fn fetch(&self) -> Result<Vec<Value>, FeedError> {
        match self.primary.fetch().await {
            Ok(data) => return Ok(data),
            Err(e) => warn!(
                source = self.primary.name(),
                error = %e,
                fallback = self.secondary.name(),
                "Feed source failed, trying fallback"
            ),
        }

        match self.secondary.fetch().await {
            Ok(data) => Ok(data),
            Err(e) => {
                warn!(source = self.secondary.name(), error = %e, "Fallback feed source failed");
                Err(FeedError::Exhausted)
            }
        }
    }

    fn name(&self) -> &str {
        "fallback"
    }
}
