//! Checker contract: turn "events since T" into notifications

use crate::notification::Notification;
use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// A pluggable event detector polled once per cycle.
///
/// A well-behaved checker only reports events whose own timestamp is
/// strictly after `since`. The monitor does not enforce this; notification
/// keys are what keeps a late report from being delivered twice.
#[async_trait]
pub trait Checker: Send + Sync {
    /// Name used in log lines
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Events that occurred after `since`. An error means this checker
    /// contributes nothing to the current cycle.
    async fn check(&self, since: DateTime<Utc>) -> Result<Vec<Notification>>;
}
