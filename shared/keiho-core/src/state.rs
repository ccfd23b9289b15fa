//! Typed accessors over [`Storage`] for the two kinds of engine state:
//! the run watermark and the dedup records.

use crate::notification::Notification;
use crate::storage::{Storage, StoredValue};
use crate::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use std::sync::Arc;
use tracing::{debug, warn};

/// Storage key of the run watermark unless configured otherwise
pub const DEFAULT_WATERMARK_KEY: &str = "KEIHO_LAST_RUNTIME";

/// Reads and writes the "processed up to" timestamp.
///
/// The value is kept as RFC 3339 text with full sub-second precision and
/// never expires.
#[derive(Clone)]
pub struct WatermarkStore {
    storage: Arc<dyn Storage>,
    key: String,
}

impl WatermarkStore {
    pub fn new(storage: Arc<dyn Storage>, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// The stored watermark.
    ///
    /// Returns `Ok(None)` when the key is absent, holds a non-text value, or
    /// holds text that is not an RFC 3339 timestamp.
    pub async fn load(&self) -> Result<Option<DateTime<Utc>>> {
        let Some(value) = self.storage.get(&self.key).await? else {
            return Ok(None);
        };

        let Some(raw) = value.as_text() else {
            warn!("watermark {} holds a non-timestamp value, ignoring it", self.key);
            return Ok(None);
        };

        match DateTime::parse_from_rfc3339(raw) {
            Ok(parsed) => Ok(Some(parsed.with_timezone(&Utc))),
            Err(e) => {
                warn!("failed to parse watermark {} '{}': {}", self.key, raw, e);
                Ok(None)
            }
        }
    }

    /// The stored watermark, or `fallback` when it is missing, malformed or
    /// the storage read fails
    pub async fn load_or(&self, fallback: DateTime<Utc>) -> DateTime<Utc> {
        match self.load().await {
            Ok(Some(watermark)) => watermark,
            Ok(None) => {
                debug!("no usable watermark under {}, using {}", self.key, fallback);
                fallback
            }
            Err(e) => {
                warn!(
                    "failed to read watermark {}: {}. Using {}",
                    self.key, e, fallback
                );
                fallback
            }
        }
    }

    pub async fn save(&self, at: DateTime<Utc>) -> Result<()> {
        let raw = at.to_rfc3339_opts(SecondsFormat::AutoSi, true);
        self.storage
            .store(&self.key, StoredValue::Text(raw), false)
            .await
    }
}

/// Dedup records: a live record under a notification key means the
/// notification was already dispatched within the storage TTL.
#[derive(Clone)]
pub struct DeliveryLedger {
    storage: Arc<dyn Storage>,
}

impl DeliveryLedger {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub async fn is_delivered(&self, key: &str) -> Result<bool> {
        self.storage.exists(key).await
    }

    /// Record `notification` as delivered, subject to the storage TTL
    pub async fn mark_delivered(&self, notification: &Notification) -> Result<()> {
        self.storage
            .store(
                &notification.key,
                StoredValue::Notification(notification.clone()),
                true,
            )
            .await
    }

    /// The notification recorded under `key`, if the record is still live
    pub async fn delivered(&self, key: &str) -> Result<Option<Notification>> {
        Ok(self
            .storage
            .get(key)
            .await?
            .and_then(|value| value.as_notification().cloned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utilities::FailingStorage;
    use crate::MemoryStorage;
    use chrono::{Duration as ChronoDuration, TimeZone};
    use std::time::Duration;

    fn memory() -> Arc<dyn Storage> {
        Arc::new(MemoryStorage::new(Duration::from_secs(60)))
    }

    #[tokio::test]
    async fn watermark_round_trips_with_subsecond_precision() {
        let store = WatermarkStore::new(memory(), DEFAULT_WATERMARK_KEY);
        let at = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();

        store.save(at).await.unwrap();

        assert_eq!(store.load().await.unwrap(), Some(at));
    }

    #[tokio::test]
    async fn missing_watermark_is_none() {
        let store = WatermarkStore::new(memory(), DEFAULT_WATERMARK_KEY);
        assert_eq!(store.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn malformed_watermark_falls_back() {
        let storage = memory();
        storage
            .store(
                DEFAULT_WATERMARK_KEY,
                StoredValue::Text("yesterday-ish".to_string()),
                false,
            )
            .await
            .unwrap();
        let store = WatermarkStore::new(storage, DEFAULT_WATERMARK_KEY);
        let fallback = Utc::now();

        assert_eq!(store.load().await.unwrap(), None);
        assert_eq!(store.load_or(fallback).await, fallback);
    }

    #[tokio::test]
    async fn wrong_value_type_falls_back() {
        let storage = memory();
        storage
            .store(
                DEFAULT_WATERMARK_KEY,
                Notification::new("k", "t", "d").into(),
                false,
            )
            .await
            .unwrap();
        let store = WatermarkStore::new(storage, DEFAULT_WATERMARK_KEY);

        assert_eq!(store.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn non_utc_offsets_are_normalised() {
        let storage = memory();
        storage
            .store(
                DEFAULT_WATERMARK_KEY,
                StoredValue::Text("2024-03-01T10:00:00+02:00".to_string()),
                false,
            )
            .await
            .unwrap();
        let store = WatermarkStore::new(storage, DEFAULT_WATERMARK_KEY);

        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        assert_eq!(store.load().await.unwrap(), Some(expected));
    }

    #[tokio::test]
    async fn read_failure_uses_fallback() {
        let store = WatermarkStore::new(Arc::new(FailingStorage), DEFAULT_WATERMARK_KEY);
        let fallback = Utc::now() - ChronoDuration::minutes(5);

        assert!(store.load().await.is_err());
        assert_eq!(store.load_or(fallback).await, fallback);
    }

    #[tokio::test]
    async fn custom_key_is_used() {
        let storage = memory();
        let store = WatermarkStore::new(storage.clone(), "OTHER_RUNTIME");
        store.save(Utc::now()).await.unwrap();

        assert!(storage.exists("OTHER_RUNTIME").await.unwrap());
        assert!(!storage.exists(DEFAULT_WATERMARK_KEY).await.unwrap());
    }

    #[tokio::test]
    async fn ledger_records_notification() {
        let ledger = DeliveryLedger::new(memory());
        let notification = Notification::new("A", "title", "description");

        assert!(!ledger.is_delivered("A").await.unwrap());
        ledger.mark_delivered(&notification).await.unwrap();

        assert!(ledger.is_delivered("A").await.unwrap());
        assert_eq!(ledger.delivered("A").await.unwrap(), Some(notification));
    }
}
