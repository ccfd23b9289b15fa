//! Notification model passed from checkers to handlers
//!
//! A notification is also the unit of deduplication: the engine treats two
//! notifications with the same [`Notification::key`] as the same event, no
//! matter what the other fields contain.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use url::Url;

/// One alert-worthy event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Idempotency key. Stable across repeated detections of the same event,
    /// distinct across occurrences (e.g. job id + start time + event tag).
    pub key: String,

    pub title: String,

    pub description: String,

    /// Free-text log lines, oldest first
    #[serde(default)]
    pub logs: Vec<String>,

    /// Display label -> URL
    #[serde(default)]
    pub links: BTreeMap<String, Url>,
}

impl Notification {
    pub fn new(
        key: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            title: title.into(),
            description: description.into(),
            logs: Vec::new(),
            links: BTreeMap::new(),
        }
    }

    pub fn with_logs(mut self, logs: Vec<String>) -> Self {
        self.logs = logs;
        self
    }

    /// Add a link; a second link with the same label replaces the first
    pub fn with_link(mut self, label: impl Into<String>, url: Url) -> Self {
        self.links.insert(label.into(), url);
        self
    }

    /// The last `count` log lines, oldest first
    pub fn tail_logs(&self, count: usize) -> &[String] {
        let start = self.logs.len().saturating_sub(count);
        &self.logs[start..]
    }
}
