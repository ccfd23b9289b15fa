use keiho_core::{KeihoError, Retryable};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SlackError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Slack API returned status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Rate limited by Slack, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Slack rejected the message: {0}")]
    Rejected(String),

    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

impl Retryable for SlackError {
    fn is_retryable(&self) -> bool {
        match self {
            SlackError::Http(e) => e.is_timeout() || e.is_connect(),
            SlackError::Api { status, .. } => *status >= 500,
            SlackError::RateLimited { .. } => true,
            SlackError::Rejected(_) | SlackError::Configuration(_) => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            SlackError::RateLimited { retry_after_secs } => {
                Some(Duration::from_secs(*retry_after_secs))
            }
            _ => None,
        }
    }
}

impl From<SlackError> for KeihoError {
    fn from(err: SlackError) -> Self {
        match err {
            SlackError::Configuration(msg) => KeihoError::Configuration(msg),
            other => KeihoError::Delivery(other.to_string()),
        }
    }
}
