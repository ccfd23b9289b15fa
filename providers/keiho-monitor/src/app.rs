use crate::config::KeihoMonitorConfig;
use cron::Schedule;
use dataflow_checker::{
    DataflowChecker, DataflowService, GcpTokenSource, StaticToken, TokenSource,
};
use keiho_core::schedule::parse_schedule;
use keiho_core::{LogHandler, MemoryStorage, Monitor, RetryConfig};
use slack_handler::{SlackClient, SlackHandler};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// A fully wired monitor ready to run on its schedule
pub struct KeihoApp {
    monitor: Monitor,
    schedule: Schedule,
    storage: MemoryStorage,
    sweep_interval: Duration,
}

impl KeihoApp {
    pub fn build(config: &KeihoMonitorConfig) -> keiho_core::Result<Self> {
        config.validate()?;
        let schedule = parse_schedule(&config.schedule)?;

        let storage = MemoryStorage::new(config.dedup_ttl());
        let mut monitor = Monitor::new(config.monitor_config(), Arc::new(storage.clone()));

        if config.log_handler_enabled {
            monitor = monitor.with_handler(Arc::new(LogHandler::new()));
        }

        if let (Some(token), Some(channel)) = (&config.slack_token, &config.slack_channel) {
            let retry = RetryConfig {
                max_attempts: config.slack_max_attempts,
                ..Default::default()
            };
            let client = SlackClient::new(token.as_str())?.with_retry(retry);
            let handler = SlackHandler::new(client, channel.as_str())
                .with_max_log_lines(config.slack_max_log_lines);
            info!("Slack handler enabled for channel {}", channel);
            monitor = monitor.with_handler(Arc::new(handler));
        }

        if let (Some(project), Some(location)) =
            (&config.dataflow_project, &config.dataflow_location)
        {
            let tokens: Arc<dyn TokenSource> = match &config.dataflow_access_token {
                Some(token) => Arc::new(StaticToken::new(token.as_str())),
                None => Arc::new(GcpTokenSource::new()),
            };
            let mut service = DataflowService::new(project.as_str(), location.as_str(), tokens)?;
            if let Some(endpoint) = &config.dataflow_endpoint {
                service = service.with_base_url(endpoint.as_str());
            }

            let mut checker =
                DataflowChecker::new(Arc::new(service), config.dataflow_job_timeout());
            if let Some(prefix) = &config.dataflow_job_prefix {
                checker = checker.with_name_prefix(prefix.as_str());
            }
            info!("Dataflow checker enabled for {}/{}", project, location);
            monitor = monitor.with_checker(Arc::new(checker));
        }

        if monitor.checker_count() == 0 {
            warn!("No checkers configured, cycles will only advance the watermark");
        }
        if monitor.handler_count() == 0 {
            warn!("No handlers configured, notifications will only be recorded");
        }

        Ok(Self {
            monitor,
            schedule,
            storage,
            sweep_interval: config.sweep_interval(),
        })
    }

    pub fn monitor(&self) -> &Monitor {
        &self.monitor
    }

    pub fn storage(&self) -> &MemoryStorage {
        &self.storage
    }

    /// Run cycles on the configured schedule.
    ///
    /// The eviction sweep runs alongside and is stopped when this returns or
    /// is dropped.
    pub async fn run(&self) -> keiho_core::Result<()> {
        let sweep = self.storage.spawn_eviction(self.sweep_interval);
        let _guard = AbortOnDrop(sweep);

        info!(
            "Running monitor with {} checkers and {} handlers",
            self.monitor.checker_count(),
            self.monitor.handler_count()
        );
        self.monitor.run_on_schedule(&self.schedule).await
    }
}

struct AbortOnDrop(tokio::task::JoinHandle<()>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}
