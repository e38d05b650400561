//! Bark push notifications
//!
//! Messages are POSTed as JSON to the device endpoint. If that fails the same
//! message is sent as `GET {endpoint}/{title}/{body}` instead.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::core::error::NotifyError;
use crate::core::types::Token;

const BARK_TIMEOUT_SECS: u64 = 10;
const PREVIEW_CHARS: usize = 100;

#[derive(Debug, Serialize)]
struct BarkPayload<'a> {
    title: &'a str,
    body: &'a str,
}

#[derive(Debug, Clone)]
pub struct BarkNotifier {
    endpoint: String,
    client: Client,
}

impl BarkNotifier {
    pub fn new(endpoint: &str) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(BARK_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            endpoint: endpoint.trim().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn is_enabled(&self) -> bool {
        !self.endpoint.is_empty()
    }

    #[instrument(skip(self, body))]
    pub async fn send_message(&self, title: &str, body: &str) -> Result<(), NotifyError> {
        if !self.is_enabled() {
            debug!("Bark endpoint not configured, skipping push");
            return Err(NotifyError::Disabled);
        }

        debug!(preview = %preview(body), "Sending bark push (POST)");
        match self
            .client
            .post(&self.endpoint)
            .json(&BarkPayload { title, body })
            .send()
            .await
        {
            Ok(response) if response.status() == StatusCode::OK => {
                debug!("Bark push accepted (POST)");
                return Ok(());
            }
            Ok(response) => warn!(
                status = response.status().as_u16(),
                "Bark POST rejected, retrying as GET"
            ),
            Err(e) => warn!(error = %e, "Bark POST failed, retrying as GET"),
        }

        let url = self.fallback_url(title, body)?;
        let response = self.client.get(url).send().await?;
        if response.status() == StatusCode::OK {
            debug!("Bark push accepted (GET)");
            Ok(())
        } else {
            Err(NotifyError::Status(response.status().as_u16()))
        }
    }

    /// `{endpoint}/{title}/{body}` with both segments percent-encoded
    pub fn fallback_url(&self, title: &str, body: &str) -> Result<Url, NotifyError> {
        let mut url = Url::parse(&self.endpoint)
            .map_err(|e| NotifyError::InvalidEndpoint(format!("{}: {}", self.endpoint, e)))?;
        url.path_segments_mut()
            .map_err(|_| NotifyError::InvalidEndpoint(self.endpoint.clone()))?
            .pop_if_empty()
            .push(title)
            .push(body);
        Ok(url)
    }

    /// Startup summary listing the given tokens
    pub async fn send_startup_message(&self, tokens: &[Token]) -> Result<(), NotifyError> {
        let (title, body) = startup_message(tokens);
        self.send_message(&title, &body).await?;
        info!(tokens = tokens.len(), "📱 Startup notification pushed");
        Ok(())
    }

    /// One push per token. `Ok(true)` if at least one push went through.
    pub async fn send_new_token_message(&self, tokens: &[Token]) -> Result<bool, NotifyError> {
        if tokens.is_empty() {
            return Ok(false);
        }
        if !self.is_enabled() {
            return Err(NotifyError::Disabled);
        }

        let mut any_success = false;
        for token in tokens {
            let (title, body) = new_token_message(token);
            match self.send_message(&title, &body).await {
                Ok(()) => any_success = true,
                Err(e) => warn!(token_id = token.token_id, error = %e, "New token push failed"),
            }
        }

        if any_success {
            info!(tokens = tokens.len(), "📱 New token notifications pushed");
        }
        Ok(any_success)
    }
}

pub fn startup_message(tokens: &[Token]) -> (String, String) {
    let title = "🚀 Spark monitor started".to_string();
    if tokens.is_empty() {
        return (title, "Monitor started, no new tokens right now".to_string());
    }

    let mut body = format!("Monitor started, latest {} tokens:\n", tokens.len());
    for (i, token) in tokens.iter().enumerate() {
        body.push_str(&format!("{}. {} ({})\n", i + 1, token.name, token.ticker));
    }
    (title, body)
}

pub fn new_token_message(token: &Token) -> (String, String) {
    let mut lines = vec![
        format!("Name: {}", token.name),
        format!("Ticker: {}", token.ticker),
        format!("Address: {}", token.token_address),
        format!("Created: {}", token.token_created_at),
    ];
    if let Some(description) = &token.description {
        lines.push(format!("Description: {}", description));
    }
    ("🎉 New token found".to_string(), lines.join("\n"))
}

fn preview(body: &str) -> String {
    if body.chars().count() <= PREVIEW_CHARS {
        body.to_string()
    } else {
        let cut: String = body.chars().take(PREVIEW_CHARS).collect();
        format!("{}...", cut)
    }
}
