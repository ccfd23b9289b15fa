use keiho_core::{KeihoError, Retryable};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DataflowError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Dataflow API returned status {status}: {body}")]
    Api { status: u16, body: String },

    /// The API rejected the bearer token; the token source has been told to
    /// drop it
    #[error("Dataflow API rejected the access token: {0}")]
    Unauthorized(String),

    #[error("Failed to obtain an access token: {0}")]
    Auth(String),

    #[error("Job {job_id} has an invalid {field} '{value}': {reason}")]
    InvalidTimestamp {
        job_id: String,
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

impl Retryable for DataflowError {
    fn is_retryable(&self) -> bool {
        match self {
            DataflowError::Http(e) => e.is_timeout() || e.is_connect(),
            DataflowError::Api { status, .. } => *status == 429 || *status >= 500,
            DataflowError::Unauthorized(_) => true,
            DataflowError::Auth(_)
            | DataflowError::InvalidTimestamp { .. }
            | DataflowError::Configuration(_) => false,
        }
    }
}

impl From<DataflowError> for KeihoError {
    fn from(err: DataflowError) -> Self {
        match err {
            DataflowError::Configuration(msg) => KeihoError::Configuration(msg),
            other => KeihoError::Source(other.to_string()),
        }
    }
}
