//! Test doubles shared by the unit tests

use crate::checker::Checker;
use crate::handler::Handler;
use crate::notification::Notification;
use crate::storage::{MemoryStorage, Storage, StoredValue};
use crate::{KeihoError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

pub fn notification(key: &str) -> Notification {
    Notification::new(key, format!("title {}", key), format!("description {}", key))
}

/// Returns the same notifications on every call and remembers each `since`
pub struct StaticChecker {
    name: String,
    notifications: Vec<Notification>,
    delay: Option<Duration>,
    seen: Arc<Mutex<Vec<DateTime<Utc>>>>,
}

impl StaticChecker {
    pub fn new(name: &str, notifications: Vec<Notification>) -> Self {
        Self {
            name: name.to_string(),
            notifications,
            delay: None,
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn seen_since(&self) -> Vec<DateTime<Utc>> {
        self.seen.lock().clone()
    }
}

#[async_trait]
impl Checker for StaticChecker {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check(&self, since: DateTime<Utc>) -> Result<Vec<Notification>> {
        self.seen.lock().push(since);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.notifications.clone())
    }
}

pub struct FailingChecker;

#[async_trait]
impl Checker for FailingChecker {
    fn name(&self) -> &str {
        "failing"
    }

    async fn check(&self, _since: DateTime<Utc>) -> Result<Vec<Notification>> {
        Err(KeihoError::Source("source unreachable".to_string()))
    }
}

pub struct PanickingChecker;

#[async_trait]
impl Checker for PanickingChecker {
    async fn check(&self, _since: DateTime<Utc>) -> Result<Vec<Notification>> {
        panic!("checker blew up");
    }
}

/// Never completes
pub struct PendingChecker;

#[async_trait]
impl Checker for PendingChecker {
    async fn check(&self, _since: DateTime<Utc>) -> Result<Vec<Notification>> {
        std::future::pending().await
    }
}

/// Records every notification it receives, optionally failing after
/// recording or sleeping before returning
pub struct RecordingHandler {
    name: String,
    fail: bool,
    delay: Option<Duration>,
    received: Arc<Mutex<Vec<Notification>>>,
}

impl RecordingHandler {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            fail: false,
            delay: None,
            received: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn keys(&self) -> Vec<String> {
        self.received.lock().iter().map(|n| n.key.clone()).collect()
    }
}

#[async_trait]
impl Handler for RecordingHandler {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, notification: &Notification) -> Result<()> {
        self.received.lock().push(notification.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail {
            return Err(KeihoError::Delivery(format!(
                "{} rejected {}",
                self.name, notification.key
            )));
        }
        Ok(())
    }
}

/// Never completes
pub struct PendingHandler;

#[async_trait]
impl Handler for PendingHandler {
    fn name(&self) -> &str {
        "pending"
    }

    async fn handle(&self, _notification: &Notification) -> Result<()> {
        std::future::pending().await
    }
}

/// Every operation fails
pub struct FailingStorage;

#[async_trait]
impl Storage for FailingStorage {
    async fn store(&self, key: &str, _value: StoredValue, _expires: bool) -> Result<()> {
        Err(KeihoError::Storage(format!("cannot write {}", key)))
    }

    async fn get(&self, key: &str) -> Result<Option<StoredValue>> {
        Err(KeihoError::Storage(format!("cannot read {}", key)))
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Err(KeihoError::Storage(format!("cannot read {}", key)))
    }
}

/// In-memory storage with selectively failing operations
pub struct ScriptedStorage {
    inner: MemoryStorage,
    fail_get: bool,
    fail_exists: bool,
    fail_expiring_writes: bool,
    fail_persistent_writes: bool,
}

impl ScriptedStorage {
    pub fn new() -> Self {
        Self {
            inner: MemoryStorage::new(Duration::from_secs(3600)),
            fail_get: false,
            fail_exists: false,
            fail_expiring_writes: false,
            fail_persistent_writes: false,
        }
    }

    pub fn fail_exists(mut self) -> Self {
        self.fail_exists = true;
        self
    }

    /// Dedup record writes fail
    pub fn fail_expiring_writes(mut self) -> Self {
        self.fail_expiring_writes = true;
        self
    }

    /// Watermark writes fail
    pub fn fail_persistent_writes(mut self) -> Self {
        self.fail_persistent_writes = true;
        self
    }

    pub fn fail_everything(mut self) -> Self {
        self.fail_get = true;
        self.fail_exists = true;
        self.fail_expiring_writes = true;
        self.fail_persistent_writes = true;
        self
    }
}

#[async_trait]
impl Storage for ScriptedStorage {
    async fn store(&self, key: &str, value: StoredValue, expires: bool) -> Result<()> {
        if (expires && self.fail_expiring_writes) || (!expires && self.fail_persistent_writes) {
            return Err(KeihoError::Storage(format!("cannot write {}", key)));
        }
        self.inner.store(key, value, expires).await
    }

    async fn get(&self, key: &str) -> Result<Option<StoredValue>> {
        if self.fail_get {
            return Err(KeihoError::Storage(format!("cannot read {}", key)));
        }
        self.inner.get(key).await
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        if self.fail_exists {
            return Err(KeihoError::Storage(format!("cannot read {}", key)));
        }
        self.inner.exists(key).await
    }
}
