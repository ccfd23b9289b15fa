//! Configuration for the monitor

use crate::state::DEFAULT_WATERMARK_KEY;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for [`crate::Monitor`]
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MonitorConfig {
    /// Storage key of the run watermark
    #[serde(default = "default_watermark_key")]
    pub watermark_key: String,

    /// Upper bound for a single checker call; unbounded when unset
    #[serde(default)]
    pub checker_timeout_ms: Option<u64>,

    /// Upper bound for a single handler call; unbounded when unset
    #[serde(default)]
    pub handler_timeout_ms: Option<u64>,
}

impl MonitorConfig {
    pub fn checker_timeout(&self) -> Option<Duration> {
        self.checker_timeout_ms.map(Duration::from_millis)
    }

    pub fn handler_timeout(&self) -> Option<Duration> {
        self.handler_timeout_ms.map(Duration::from_millis)
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            watermark_key: default_watermark_key(),
            checker_timeout_ms: None,
            handler_timeout_ms: None,
        }
    }
}

fn default_watermark_key() -> String {
    DEFAULT_WATERMARK_KEY.to_string()
}
