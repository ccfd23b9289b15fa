//! Dataflow job and job message models

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

pub const JOB_STATE_FAILED: &str = "JOB_STATE_FAILED";
pub const JOB_STATE_RUNNING: &str = "JOB_STATE_RUNNING";

pub const JOB_TYPE_STREAMING: &str = "JOB_TYPE_STREAMING";
pub const JOB_TYPE_BATCH: &str = "JOB_TYPE_BATCH";

const CONSOLE_BASE: &str = "https://console.cloud.google.com/dataflow/jobs";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub name: String,
    /// `JOB_TYPE_BATCH`, `JOB_TYPE_STREAMING` or empty when the API omits it
    pub job_type: String,
    pub project: String,
    pub location: String,
    pub start_time: DateTime<Utc>,
    pub status: JobStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStatus {
    pub state: String,
    /// When the job entered `state`
    pub updated_at: DateTime<Utc>,
}

impl JobStatus {
    pub fn is_failed(&self) -> bool {
        self.state == JOB_STATE_FAILED
    }

    pub fn is_running(&self) -> bool {
        self.state == JOB_STATE_RUNNING
    }
}

impl Job {
    pub fn is_streaming(&self) -> bool {
        self.job_type == JOB_TYPE_STREAMING
    }

    pub fn is_batch(&self) -> bool {
        self.job_type == JOB_TYPE_BATCH
    }

    /// Time since the job started, zero for start times in the future
    pub fn runtime(&self, now: DateTime<Utc>) -> Duration {
        (now - self.start_time).max(Duration::zero())
    }

    /// Link to the job in the Cloud Console
    pub fn console_url(&self) -> Result<Url, url::ParseError> {
        let mut url = Url::parse(CONSOLE_BASE)?;
        url.path_segments_mut()
            .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .push(&self.location)
            .push(&self.id);
        url.query_pairs_mut()
            .append_pair("project", &self.project)
            .append_pair("authuser", "1")
            .append_pair("hl", "en");
        Ok(url)
    }
}

/// Importance of a job message, least to most important
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MessageLevel {
    #[serde(rename = "JOB_MESSAGE_IMPORTANCE_UNKNOWN")]
    Unknown,
    #[serde(rename = "JOB_MESSAGE_DEBUG")]
    Debug,
    #[serde(rename = "JOB_MESSAGE_DETAILED")]
    Detailed,
    #[serde(rename = "JOB_MESSAGE_BASIC")]
    Basic,
    #[serde(rename = "JOB_MESSAGE_WARNING")]
    Warning,
    #[serde(rename = "JOB_MESSAGE_ERROR")]
    Error,
}

impl MessageLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageLevel::Unknown => "JOB_MESSAGE_IMPORTANCE_UNKNOWN",
            MessageLevel::Debug => "JOB_MESSAGE_DEBUG",
            MessageLevel::Detailed => "JOB_MESSAGE_DETAILED",
            MessageLevel::Basic => "JOB_MESSAGE_BASIC",
            MessageLevel::Warning => "JOB_MESSAGE_WARNING",
            MessageLevel::Error => "JOB_MESSAGE_ERROR",
        }
    }

    /// Parse an API importance string; unrecognised values map to `Unknown`
    pub fn from_api(value: &str) -> Self {
        match value {
            "JOB_MESSAGE_DEBUG" => MessageLevel::Debug,
            "JOB_MESSAGE_DETAILED" => MessageLevel::Detailed,
            "JOB_MESSAGE_BASIC" => MessageLevel::Basic,
            "JOB_MESSAGE_WARNING" => MessageLevel::Warning,
            "JOB_MESSAGE_ERROR" => MessageLevel::Error,
            _ => MessageLevel::Unknown,
        }
    }
}

impl fmt::Display for MessageLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogMessage {
    pub text: String,
    pub level: MessageLevel,
    pub time: DateTime<Utc>,
}
