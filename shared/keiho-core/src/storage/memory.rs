use super::{Storage, StoredValue};
use crate::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

#[derive(Debug, Clone)]
struct Entry {
    value: StoredValue,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }
}

/// In-memory TTL cache
///
/// Expired entries are never returned, whether or not the eviction sweep
/// started by [`MemoryStorage::spawn_eviction`] has removed them yet.
#[derive(Debug, Clone)]
pub struct MemoryStorage {
    entries: Arc<DashMap<String, Entry>>,
    default_ttl: Duration,
}

impl MemoryStorage {
    /// Create a store whose expiring entries live for `default_ttl`
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            default_ttl,
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.iter().filter(|e| e.is_live(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every expired entry, returning how many were dropped
    pub fn purge_expired(&self) -> usize {
        purge(&self.entries, Instant::now())
    }

    /// Start the background eviction sweep on the current tokio runtime.
    ///
    /// The task stops on its own once every clone of this store is dropped.
    pub fn spawn_eviction(&self, every: Duration) -> JoinHandle<()> {
        let entries = Arc::downgrade(&self.entries);
        let every = every.max(Duration::from_millis(1));

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // first tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;

                let Some(entries) = entries.upgrade() else {
                    debug!("memory storage dropped, stopping eviction sweep");
                    break;
                };

                let removed = purge(&entries, Instant::now());
                if removed > 0 {
                    debug!("evicted {} expired entries", removed);
                }
            }
        })
    }

    fn live_entry(&self, key: &str) -> Option<Entry> {
        let now = Instant::now();
        let entry = self.entries.get(key).map(|e| e.value().clone())?;
        if entry.is_live(now) {
            return Some(entry);
        }

        // ref guard is released above; safe to take the write lock
        self.entries.remove_if(key, |_, e| !e.is_live(now));
        None
    }
}

fn purge(entries: &DashMap<String, Entry>, now: Instant) -> usize {
    let before = entries.len();
    entries.retain(|_, e| e.is_live(now));
    before.saturating_sub(entries.len())
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn store(&self, key: &str, value: StoredValue, expires: bool) -> Result<()> {
        let expires_at = expires.then(|| Instant::now() + self.default_ttl);
        self.entries
            .insert(key.to_string(), Entry { value, expires_at });
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<StoredValue>> {
        Ok(self.live_entry(key).map(|e| e.value))
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.live_entry(key).is_some())
    }
}
