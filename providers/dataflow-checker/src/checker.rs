//! Turns Dataflow job state into Keiho notifications

use crate::job::{Job, MessageLevel};
use crate::service::JobService;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use keiho_core::{Checker, Notification};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const FAILED_TITLE: &str = "❌ Dataflow Job Failed";
pub const TIMEOUT_TITLE: &str = "⏱️ Dataflow Job Running For Too Long";
pub const CONSOLE_LINK_LABEL: &str = "Open In Dataflow";
pub const LOG_FETCH_FAILED: &str = "Failed to fetch logs...";

pub type JobFilter = Arc<dyn Fn(&Job) -> bool + Send + Sync>;

#[derive(Debug, Clone, Copy)]
enum Kind {
    Error,
    Timeout,
}

impl Kind {
    fn as_str(&self) -> &'static str {
        match self {
            Kind::Error => "ERROR",
            Kind::Timeout => "TIMEOUT",
        }
    }
}

/// Reports failed jobs and batch jobs running longer than `timeout`.
///
/// A failure is reported when the job's state changed after `since`. An
/// overrunning batch job is reported on every cycle; its key only depends
/// on the job id and start time, so repeats are dropped by deduplication.
pub struct DataflowChecker {
    service: Arc<dyn JobService>,
    job_filter: Option<JobFilter>,
    timeout: Duration,
}

impl DataflowChecker {
    pub fn new(service: Arc<dyn JobService>, timeout: Duration) -> Self {
        Self {
            service,
            job_filter: None,
            timeout,
        }
    }

    /// Only check jobs for which `filter` returns true.
    ///
    /// Not meant to select failed or overrunning jobs; the checker does that
    /// itself.
    pub fn with_job_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&Job) -> bool + Send + Sync + 'static,
    {
        self.job_filter = Some(Arc::new(filter));
        self
    }

    /// Only check jobs whose name starts with `prefix`
    pub fn with_name_prefix(self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        self.with_job_filter(move |job| job.name.starts_with(&prefix))
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn accepts(&self, job: &Job) -> bool {
        self.job_filter.as_ref().map_or(true, |filter| filter(job))
    }

    async fn failure_notification(&self, job: &Job) -> Notification {
        let logs = match self.service.get_logs(&job.id, MessageLevel::Error).await {
            Ok(messages) => messages.into_iter().map(|m| m.text).collect(),
            Err(e) => {
                warn!("Failed to fetch logs for job {}: {}", job.id, e);
                vec![LOG_FETCH_FAILED.to_string()]
            }
        };

        let description = format!(
            "The job `{}` with id `{}` failed at *{}*!",
            job.name,
            job.id,
            job.status.updated_at.format("%a, %d %b %Y %H:%M:%S UTC")
        );

        with_console_link(
            Notification::new(key(Kind::Error, job), FAILED_TITLE, description).with_logs(logs),
            job,
        )
    }

    fn timeout_notification(&self, job: &Job, runtime: chrono::Duration) -> Notification {
        let description = format!(
            "The job `{}` with id `{}` crossed the maximum timeout limit with a runtime of *{}*.",
            job.name,
            job.id,
            format_runtime(runtime)
        );

        with_console_link(
            Notification::new(key(Kind::Timeout, job), TIMEOUT_TITLE, description),
            job,
        )
    }
}

#[async_trait]
impl Checker for DataflowChecker {
    fn name(&self) -> &str {
        "dataflow"
    }

    async fn check(&self, since: DateTime<Utc>) -> keiho_core::Result<Vec<Notification>> {
        let jobs = self.service.list_jobs().await?;
        let now = Utc::now();
        debug!("Checking {} Dataflow jobs updated since {}", jobs.len(), since);

        let mut notifications = Vec::new();

        for job in jobs.iter().filter(|job| self.accepts(job)) {
            if job.status.updated_at > since && job.status.is_failed() {
                info!("Dataflow job {} ({}) failed", job.name, job.id);
                notifications.push(self.failure_notification(job).await);
            }

            if !job.is_streaming() && job.status.is_running() {
                let runtime = job.runtime(now);
                if runtime.to_std().unwrap_or_default() >= self.timeout {
                    info!(
                        "Dataflow job {} ({}) running for {}",
                        job.name,
                        job.id,
                        format_runtime(runtime)
                    );
                    notifications.push(self.timeout_notification(job, runtime));
                }
            }
        }

        Ok(notifications)
    }
}

fn key(kind: Kind, job: &Job) -> String {
    format!(
        "DATAFLOW-{}-{}-{}",
        kind.as_str(),
        job.id,
        job.start_time.to_rfc3339_opts(SecondsFormat::Secs, true)
    )
}

fn with_console_link(notification: Notification, job: &Job) -> Notification {
    match job.console_url() {
        Ok(url) => notification.with_link(CONSOLE_LINK_LABEL, url),
        Err(e) => {
            warn!("Failed to build console link for job {}: {}", job.id, e);
            notification
        }
    }
}

/// Format a runtime rounded to the second, e.g. `6h0m0s`, `4m5s`, `12s`
fn format_runtime(runtime: chrono::Duration) -> String {
    let millis = runtime.num_milliseconds().max(0);
    let total = (millis + 500) / 1000;
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);

    if hours > 0 {
        format!("{}h{}m{}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m{}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}
