//! Error types for the alerting engine

use thiserror::Error;

#[derive(Error, Debug)]
pub enum KeihoError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Source error: {0}")]
    Source(String),

    #[error("Delivery error: {0}")]
    Delivery(String),

    #[error("Timeout error: {operation} took longer than {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid schedule '{expression}': {reason}")]
    InvalidSchedule { expression: String, reason: String },
}

impl KeihoError {
    /// Get error code for logging/monitoring
    pub fn error_code(&self) -> &'static str {
        match self {
            KeihoError::Storage(_) => "STORAGE_ERROR",
            KeihoError::Source(_) => "SOURCE_ERROR",
            KeihoError::Delivery(_) => "DELIVERY_ERROR",
            KeihoError::Timeout { .. } => "TIMEOUT_ERROR",
            KeihoError::Configuration(_) => "CONFIGURATION_ERROR",
            KeihoError::InvalidSchedule { .. } => "INVALID_SCHEDULE",
        }
    }
}
