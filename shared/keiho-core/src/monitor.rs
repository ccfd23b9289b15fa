//! The monitor: one run-collect-dedupe-dispatch cycle per call to
//! [`Monitor::start`].
//!
//! Checkers run in parallel against the stored watermark. The collected
//! notifications are then processed one at a time: the dedup check and the
//! dedup write for one key complete before the next notification is looked
//! at, so two notifications sharing a key are never both dispatched in the
//! same cycle. Handlers for a single notification run in parallel.

use crate::checker::Checker;
use crate::config::MonitorConfig;
use crate::handler::Handler;
use crate::notification::Notification;
use crate::state::{DeliveryLedger, WatermarkStore};
use crate::storage::Storage;
use crate::{KeihoError, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Summary of one completed cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    /// Captured before any work; written as the new watermark
    pub started_at: DateTime<Utc>,
    /// Watermark the checkers were polled with
    pub since: DateTime<Utc>,
    pub collected: usize,
    pub delivered: usize,
    pub skipped_duplicates: usize,
    pub checker_failures: usize,
    pub handler_failures: usize,
}

enum Dispatch {
    Skipped,
    Delivered { handler_failures: usize },
}

/// Orchestrates checkers, handlers and storage.
///
/// Holds no run-to-run state of its own; the watermark and dedup records
/// live in [`Storage`].
pub struct Monitor {
    config: MonitorConfig,
    checkers: Vec<Arc<dyn Checker>>,
    handlers: Vec<Arc<dyn Handler>>,
    watermark: WatermarkStore,
    ledger: DeliveryLedger,
}

impl Monitor {
    pub fn new(config: MonitorConfig, storage: Arc<dyn Storage>) -> Self {
        let watermark = WatermarkStore::new(storage.clone(), config.watermark_key.clone());
        let ledger = DeliveryLedger::new(storage);

        Self {
            config,
            checkers: Vec::new(),
            handlers: Vec::new(),
            watermark,
            ledger,
        }
    }

    pub fn with_checker(mut self, checker: Arc<dyn Checker>) -> Self {
        self.checkers.push(checker);
        self
    }

    pub fn with_handler(mut self, handler: Arc<dyn Handler>) -> Self {
        self.handlers.push(handler);
        self
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn checker_count(&self) -> usize {
        self.checkers.len()
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Run one cycle.
    ///
    /// Checker, handler and dedup bookkeeping failures are logged and
    /// absorbed. The only error returned is a failure to write the new
    /// watermark. Dropping the returned future aborts all in-flight checker
    /// and handler tasks.
    pub async fn start(&self) -> Result<CycleReport> {
        let started_at = Utc::now();
        info!("Starting monitor cycle at {}", started_at);

        let since = self.watermark.load_or(started_at).await;
        debug!("Polling {} checkers for events since {}", self.checkers.len(), since);

        let (notifications, checker_failures) = self.collect(since).await;

        let mut report = CycleReport {
            started_at,
            since,
            collected: notifications.len(),
            delivered: 0,
            skipped_duplicates: 0,
            checker_failures,
            handler_failures: 0,
        };

        for notification in &notifications {
            match self.dispatch(notification).await {
                Dispatch::Skipped => report.skipped_duplicates += 1,
                Dispatch::Delivered { handler_failures } => {
                    report.delivered += 1;
                    report.handler_failures += handler_failures;
                }
            }
        }

        if let Err(e) = self.watermark.save(started_at).await {
            error!(
                "Failed to store watermark {} under {}: {}",
                started_at,
                self.watermark.key(),
                e
            );
            return Err(e);
        }

        info!(
            "Monitor cycle finished: {} collected, {} delivered, {} duplicates, {} checker failures, {} handler failures",
            report.collected,
            report.delivered,
            report.skipped_duplicates,
            report.checker_failures,
            report.handler_failures
        );

        Ok(report)
    }

    /// Poll every checker in parallel and merge their notifications.
    /// Returns the merged notifications and the number of failed checkers.
    async fn collect(&self, since: DateTime<Utc>) -> (Vec<Notification>, usize) {
        let limit = self.config.checker_timeout();
        let mut tasks = JoinSet::new();

        for checker in &self.checkers {
            let checker = Arc::clone(checker);
            tasks.spawn(async move {
                let name = checker.name().to_string();
                let result = bounded(checker.check(since), limit, || format!("checker {}", name)).await;
                (name, result)
            });
        }

        let mut notifications = Vec::new();
        let mut failures = 0;

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((name, Ok(found))) => {
                    debug!("Checker {} returned {} notifications", name, found.len());
                    notifications.extend(found);
                }
                Ok((name, Err(e))) => {
                    failures += 1;
                    error!("Checker {} failed [{}]: {}", name, e.error_code(), e);
                }
                Err(e) => {
                    failures += 1;
                    error!("Checker task did not complete: {}", e);
                }
            }
        }

        (notifications, failures)
    }

    async fn dispatch(&self, notification: &Notification) -> Dispatch {
        let key = notification.key.as_str();

        let delivered = match self.ledger.is_delivered(key).await {
            Ok(delivered) => delivered,
            Err(e) => {
                warn!(
                    "Failed to check dedup record for {} [{}]: {}. Assuming not delivered",
                    key,
                    e.error_code(),
                    e
                );
                false
            }
        };

        if delivered {
            debug!("Notification {} already delivered, skipping", key);
            return Dispatch::Skipped;
        }

        info!(
            "Dispatching notification {} to {} handlers",
            key,
            self.handlers.len()
        );
        let handler_failures = self.fan_out(notification).await;

        if let Err(e) = self.ledger.mark_delivered(notification).await {
            error!("Failed to store dedup record for {}: {}", key, e);
        }

        Dispatch::Delivered { handler_failures }
    }

    /// Hand `notification` to every handler in parallel and wait for all of
    /// them. Returns the number of handlers that failed.
    async fn fan_out(&self, notification: &Notification) -> usize {
        let limit = self.config.handler_timeout();
        let shared = Arc::new(notification.clone());
        let mut tasks = JoinSet::new();

        for handler in &self.handlers {
            let handler = Arc::clone(handler);
            let notification = Arc::clone(&shared);
            tasks.spawn(async move {
                let name = handler.name().to_string();
                let result =
                    bounded(handler.handle(&notification), limit, || format!("handler {}", name))
                        .await;
                (name, result)
            });
        }

        let mut failures = 0;

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((name, Ok(()))) => {
                    debug!("Handler {} delivered {}", name, notification.key);
                }
                Ok((name, Err(e))) => {
                    failures += 1;
                    error!(
                        "Handler {} failed to handle notification {} [{}]: {}",
                        name,
                        notification.key,
                        e.error_code(),
                        e
                    );
                }
                Err(e) => {
                    failures += 1;
                    error!(
                        "Handler task for notification {} did not complete: {}",
                        notification.key, e
                    );
                }
            }
        }

        failures
    }
}

/// Await `fut`, failing with [`KeihoError::Timeout`] once `limit` elapses
async fn bounded<T, F, N>(fut: F, limit: Option<Duration>, operation: N) -> Result<T>
where
    F: Future<Output = Result<T>>,
    N: FnOnce() -> String,
{
    let Some(limit) = limit else {
        return fut.await;
    };

    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(KeihoError::Timeout {
            operation: operation(),
            timeout_ms: limit.as_millis() as u64,
        }),
    }
}
