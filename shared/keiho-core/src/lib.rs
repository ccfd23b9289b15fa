//! Keiho alerting engine
//!
//! On every scheduled tick the [`Monitor`] polls its [`Checker`]s for events
//! since the last successful run, drops notifications that were already
//! delivered within the dedup TTL, fans the rest out to every [`Handler`] and
//! records the new run watermark in [`Storage`].

pub mod checker;
pub mod config;
pub mod error;
pub mod handler;
pub mod monitor;
pub mod notification;
pub mod retry;
pub mod schedule;
pub mod state;
pub mod storage;

#[cfg(test)]
pub mod test_utilities;

pub use checker::Checker;
pub use config::MonitorConfig;
pub use error::KeihoError;
pub use handler::{Handler, LogHandler};
pub use monitor::{CycleReport, Monitor};
pub use notification::Notification;
pub use retry::{retry_with_backoff, RetryConfig, Retryable};
pub use state::{DeliveryLedger, WatermarkStore, DEFAULT_WATERMARK_KEY};
pub use storage::{MemoryStorage, Storage, StoredValue};

// Re-export Result type for convenience
pub type Result<T> = std::result::Result<T, KeihoError>;
