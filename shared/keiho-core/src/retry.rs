//! Exponential backoff for adapter calls to remote APIs

use backoff::{backoff::Backoff, ExponentialBackoff};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Classification of an adapter error for [`retry_with_backoff`]
pub trait Retryable {
    fn is_retryable(&self) -> bool;

    /// Minimum wait the remote side asked for before the next attempt
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 1000,
            max_delay_ms: 30000,
            jitter: true,
        }
    }
}

impl RetryConfig {
    pub fn new(max_attempts: u32, initial_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            max_attempts,
            initial_delay_ms,
            max_delay_ms,
            jitter: true,
        }
    }

    /// Single attempt, no retries
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_delay_ms: 0,
            max_delay_ms: 0,
            jitter: false,
        }
    }

    fn to_exponential_backoff(&self) -> ExponentialBackoff {
        let mut backoff = ExponentialBackoff {
            initial_interval: Duration::from_millis(self.initial_delay_ms),
            max_interval: Duration::from_millis(self.max_delay_ms),
            max_elapsed_time: None,
            ..Default::default()
        };

        if !self.jitter {
            backoff.randomization_factor = 0.0;
        }

        backoff
    }
}

/// Run `operation` until it succeeds, fails with an error that is not
/// retryable, or `config.max_attempts` is reached.
///
/// The wait before the next attempt is the backoff interval, raised to the
/// error's [`Retryable::retry_after`] when that is longer.
pub async fn retry_with_backoff<F, Fut, T, E>(config: &RetryConfig, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + Display,
{
    let mut backoff = config.to_exponential_backoff();
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    debug!("Operation succeeded after {} attempts", attempt);
                }
                return Ok(result);
            }
            Err(error) => {
                if attempt >= config.max_attempts || !error.is_retryable() {
                    if attempt > 1 {
                        warn!("Operation failed after {} attempts: {}", attempt, error);
                    }
                    return Err(error);
                }

                let Some(interval) = backoff.next_backoff() else {
                    warn!("Backoff exhausted after {} attempts", attempt);
                    return Err(error);
                };
                let delay = match error.retry_after() {
                    Some(requested) if requested > interval => requested,
                    _ => interval,
                };

                warn!(
                    "Operation failed (attempt {}/{}), retrying in {:?}: {}",
                    attempt, config.max_attempts, delay, error
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
