//! # Keiho Monitor
//!
//! Polls the configured checkers on a cron schedule and delivers new
//! notifications to the configured handlers until interrupted.

use anyhow::{Context, Result};
use tracing::info;

use keiho_monitor::{KeihoApp, KeihoMonitorConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging with environment filter
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("keiho_monitor=info".parse()?)
                .add_directive("keiho_core=info".parse()?),
        )
        .init();

    info!("Starting Keiho monitor");

    let config = KeihoMonitorConfig::from_env()
        .context("Failed to load configuration from KEIHO_* environment variables")?;
    info!("Schedule: {}", config.schedule);

    let app = KeihoApp::build(&config).context("Failed to build monitor")?;

    tokio::select! {
        result = app.run() => {
            result.context("Monitor loop failed")?;
            info!("Schedule has no further ticks");
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for shutdown signal")?;
            info!("Shutdown signal received");
        }
    }

    info!("Keiho monitor stopped");
    Ok(())
}
