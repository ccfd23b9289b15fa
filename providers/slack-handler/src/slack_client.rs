use crate::error::SlackError;
use crate::types::{PostMessageResponse, SlackMessage};
use crate::Result;
use keiho_core::{retry_with_backoff, RetryConfig};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, error, warn};

pub const DEFAULT_BASE_URL: &str = "https://slack.com";

/// Slack Web API client for `chat.postMessage`
pub struct SlackClient {
    http_client: Client,
    token: String,
    base_url: String,
    retry: RetryConfig,
}

impl SlackClient {
    pub fn new(token: impl Into<String>) -> Result<Self> {
        let token = token.into();
        if token.is_empty() {
            return Err(SlackError::Configuration("Slack token is empty".to_string()));
        }

        let http_client = Client::builder().timeout(Duration::from_secs(10)).build()?;

        Ok(Self {
            http_client,
            token,
            base_url: DEFAULT_BASE_URL.to_string(),
            retry: RetryConfig::default(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Post `message`, retrying rate limits and server errors.
    /// A rate limit waits at least as long as Slack's `Retry-After`.
    pub async fn post_message(&self, message: &SlackMessage) -> Result<()> {
        retry_with_backoff(&self.retry, || self.post_once(message)).await
    }

    async fn post_once(&self, message: &SlackMessage) -> Result<()> {
        debug!("Posting message to Slack channel {}", message.channel);

        let response = self
            .http_client
            .post(format!("{}/api/chat.postMessage", self.base_url))
            .bearer_auth(&self.token)
            .json(message)
            .send()
            .await
            .map_err(|e| {
                error!("Failed to send request to Slack: {}", e);
                SlackError::Http(e)
            })?;

        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(1);

            warn!("Rate limited by Slack, retry after {} seconds", retry_after_secs);
            return Err(SlackError::RateLimited { retry_after_secs });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SlackError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let body: PostMessageResponse = response.json().await?;
        if !body.ok {
            let reason = body.error.unwrap_or_else(|| "unknown_error".to_string());
            warn!("Slack rejected message to {}: {}", message.channel, reason);
            return Err(SlackError::Rejected(reason));
        }

        debug!(
            "Slack message posted to {} (ts {})",
            message.channel,
            body.ts.as_deref().unwrap_or("-")
        );
        Ok(())
    }
}
