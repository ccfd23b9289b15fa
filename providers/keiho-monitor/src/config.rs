//! Configuration for the Keiho monitor binary

use keiho_core::{KeihoError, MonitorConfig, DEFAULT_WATERMARK_KEY};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variables are read as `KEIHO_<FIELD>`, e.g. `KEIHO_SCHEDULE`
pub const ENV_PREFIX: &str = "KEIHO_";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct KeihoMonitorConfig {
    /// Cron expression, five fields or six with leading seconds
    #[serde(default = "default_schedule")]
    pub schedule: String,

    /// How long a delivered notification suppresses repeats (seconds)
    #[serde(default = "default_dedup_ttl_secs")]
    pub dedup_ttl_secs: u64,

    /// Interval of the expired-entry sweep (seconds)
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    #[serde(default = "default_watermark_key")]
    pub watermark_key: String,

    #[serde(default)]
    pub checker_timeout_ms: Option<u64>,

    #[serde(default)]
    pub handler_timeout_ms: Option<u64>,

    #[serde(default)]
    pub dataflow_project: Option<String>,

    #[serde(default)]
    pub dataflow_location: Option<String>,

    /// Fixed bearer token for the Dataflow API. When unset, Application
    /// Default Credentials are used and refreshed as they expire
    #[serde(default)]
    pub dataflow_access_token: Option<String>,

    /// Override of the Dataflow API endpoint
    #[serde(default)]
    pub dataflow_endpoint: Option<String>,

    /// Only jobs whose name starts with this prefix are checked
    #[serde(default)]
    pub dataflow_job_prefix: Option<String>,

    /// Batch jobs running longer than this are reported (minutes)
    #[serde(default = "default_job_timeout_minutes")]
    pub dataflow_job_timeout_minutes: u64,

    #[serde(default)]
    pub slack_token: Option<String>,

    #[serde(default)]
    pub slack_channel: Option<String>,

    #[serde(default = "default_max_log_lines")]
    pub slack_max_log_lines: usize,

    #[serde(default = "default_slack_max_attempts")]
    pub slack_max_attempts: u32,

    #[serde(default = "default_log_handler_enabled")]
    pub log_handler_enabled: bool,
}

impl KeihoMonitorConfig {
    /// Load configuration from `KEIHO_*` environment variables
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::prefixed(ENV_PREFIX).from_env()
    }

    /// Reject half-configured adapters and unusable durations
    pub fn validate(&self) -> Result<(), KeihoError> {
        if self.dedup_ttl_secs == 0 {
            return Err(KeihoError::Configuration(
                "dedup_ttl_secs must be greater than zero".to_string(),
            ));
        }

        if self.sweep_interval_secs == 0 {
            return Err(KeihoError::Configuration(
                "sweep_interval_secs must be greater than zero".to_string(),
            ));
        }

        if self.dataflow_project.is_some() != self.dataflow_location.is_some() {
            return Err(KeihoError::Configuration(
                "dataflow_project and dataflow_location must be set together".to_string(),
            ));
        }

        if self.slack_token.is_some() != self.slack_channel.is_some() {
            return Err(KeihoError::Configuration(
                "slack_token and slack_channel must be set together".to_string(),
            ));
        }

        if self.slack_max_attempts == 0 {
            return Err(KeihoError::Configuration(
                "slack_max_attempts must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    pub fn monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            watermark_key: self.watermark_key.clone(),
            checker_timeout_ms: self.checker_timeout_ms,
            handler_timeout_ms: self.handler_timeout_ms,
        }
    }

    pub fn dedup_ttl(&self) -> Duration {
        Duration::from_secs(self.dedup_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn dataflow_job_timeout(&self) -> Duration {
        Duration::from_secs(self.dataflow_job_timeout_minutes * 60)
    }
}

impl Default for KeihoMonitorConfig {
    fn default() -> Self {
        Self {
            schedule: default_schedule(),
            dedup_ttl_secs: default_dedup_ttl_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            watermark_key: default_watermark_key(),
            checker_timeout_ms: None,
            handler_timeout_ms: None,
            dataflow_project: None,
            dataflow_location: None,
            dataflow_access_token: None,
            dataflow_endpoint: None,
            dataflow_job_prefix: None,
            dataflow_job_timeout_minutes: default_job_timeout_minutes(),
            slack_token: None,
            slack_channel: None,
            slack_max_log_lines: default_max_log_lines(),
            slack_max_attempts: default_slack_max_attempts(),
            log_handler_enabled: default_log_handler_enabled(),
        }
    }
}

fn default_schedule() -> String {
    "* * * * *".to_string()
}

fn default_dedup_ttl_secs() -> u64 {
    60 * 60 * 24
}

fn default_sweep_interval_secs() -> u64 {
    300
}

fn default_watermark_key() -> String {
    DEFAULT_WATERMARK_KEY.to_string()
}

fn default_job_timeout_minutes() -> u64 {
    180
}

fn default_max_log_lines() -> usize {
    5
}

fn default_slack_max_attempts() -> u32 {
    3
}

fn default_log_handler_enabled() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn from_vars(pairs: &[(&str, &str)]) -> KeihoMonitorConfig {
        let vars = pairs
            .iter()
            .map(|(k, v)| (format!("{}{}", ENV_PREFIX, k), v.to_string()));
        envy::prefixed(ENV_PREFIX).from_iter(vars).unwrap()
    }

    #[test]
    fn defaults_from_empty_environment() {
        let config: KeihoMonitorConfig = envy::prefixed(ENV_PREFIX)
            .from_iter(Vec::<(String, String)>::new())
            .unwrap();

        assert_eq!(config.schedule, "* * * * *");
        assert_eq!(config.dedup_ttl(), Duration::from_secs(86_400));
        assert_eq!(config.watermark_key, "KEIHO_LAST_RUNTIME");
        assert!(config.log_handler_enabled);
        assert!(config.slack_token.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn prefixed_environment_variables_are_read() {
        let vars = vec![
            ("KEIHO_SCHEDULE".to_string(), "*/30 * * * * *".to_string()),
            ("KEIHO_DATAFLOW_PROJECT".to_string(), "analytics".to_string()),
            ("KEIHO_DATAFLOW_LOCATION".to_string(), "europe-west4".to_string()),
            ("KEIHO_DATAFLOW_JOB_TIMEOUT_MINUTES".to_string(), "2".to_string()),
            ("KEIHO_CHECKER_TIMEOUT_MS".to_string(), "15000".to_string()),
            ("KEIHO_LOG_HANDLER_ENABLED".to_string(), "false".to_string()),
            ("UNRELATED".to_string(), "ignored".to_string()),
        ];

        let config: KeihoMonitorConfig = envy::prefixed(ENV_PREFIX).from_iter(vars).unwrap();

        assert_eq!(config.schedule, "*/30 * * * * *");
        assert_eq!(config.dataflow_project.as_deref(), Some("analytics"));
        assert_eq!(config.dataflow_job_timeout(), Duration::from_secs(120));
        assert_eq!(config.monitor_config().checker_timeout_ms, Some(15_000));
        assert!(!config.log_handler_enabled);
    }

    #[test]
    fn slack_settings_override_defaults() {
        let config = from_vars(&[
            ("SLACK_TOKEN", "xoxb-1"),
            ("SLACK_CHANNEL", "#alerts"),
            ("SLACK_MAX_LOG_LINES", "10"),
            ("DEDUP_TTL_SECS", "3600"),
            ("DATAFLOW_JOB_PREFIX", "nightly-"),
        ]);

        assert!(config.validate().is_ok());
        assert_eq!(config.slack_channel.as_deref(), Some("#alerts"));
        assert_eq!(config.slack_max_log_lines, 10);
        assert_eq!(config.dedup_ttl(), Duration::from_secs(3600));
        assert_eq!(config.dataflow_job_prefix.as_deref(), Some("nightly-"));
        assert_eq!(config.schedule, "* * * * *");
    }

    #[test]
    fn half_configured_slack_is_rejected() {
        let err = from_vars(&[("SLACK_TOKEN", "xoxb-1")]).validate().unwrap_err();

        assert_eq!(err.error_code(), "CONFIGURATION_ERROR");
    }

    #[test]
    fn dataflow_without_token_uses_default_credentials() {
        let config = from_vars(&[
            ("DATAFLOW_PROJECT", "analytics"),
            ("DATAFLOW_LOCATION", "europe-west4"),
        ]);

        assert!(config.validate().is_ok());
        assert!(config.dataflow_access_token.is_none());
    }

    #[test]
    fn half_configured_dataflow_is_rejected() {
        let config = KeihoMonitorConfig {
            dataflow_project: Some("analytics".to_string()),
            ..Default::default()
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_ttl_is_rejected() {
        let config = KeihoMonitorConfig {
            dedup_ttl_secs: 0,
            ..Default::default()
        };

        assert!(config.validate().is_err());
    }
}
