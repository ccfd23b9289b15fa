//! Key-value storage contract used for dedup records and the run watermark
//!
//! Values are a tagged union so the watermark (RFC 3339 text) and dedup
//! records (whole notifications) share one store without runtime casts.

mod memory;

pub use memory::MemoryStorage;

use crate::notification::Notification;
use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A value held by a [`Storage`] backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum StoredValue {
    Text(String),
    Notification(Notification),
}

impl StoredValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            StoredValue::Text(text) => Some(text),
            StoredValue::Notification(_) => None,
        }
    }

    pub fn as_notification(&self) -> Option<&Notification> {
        match self {
            StoredValue::Notification(notification) => Some(notification),
            StoredValue::Text(_) => None,
        }
    }
}

impl From<Notification> for StoredValue {
    fn from(notification: Notification) -> Self {
        StoredValue::Notification(notification)
    }
}

/// Key-value cache with optional per-entry expiration.
///
/// Implementations must be safe to call concurrently. Any store with TTL
/// semantics can back the engine.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Upsert `key`. When `expires` is true the entry gets the store's
    /// default TTL, otherwise it never expires.
    async fn store(&self, key: &str, value: StoredValue, expires: bool) -> Result<()>;

    /// The live value for `key`, `None` when absent or expired
    async fn get(&self, key: &str) -> Result<Option<StoredValue>>;

    /// Whether a live entry for `key` is present
    async fn exists(&self, key: &str) -> Result<bool>;
}
