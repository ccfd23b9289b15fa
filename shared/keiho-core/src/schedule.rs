//! Cron-driven cycle loop

use crate::monitor::Monitor;
use crate::{KeihoError, Result};
use chrono::{DateTime, Utc};
use cron::Schedule;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, error, info};

/// Parse a cron expression.
///
/// Accepts the classic five-field form (`* * * * *`, minute resolution) as
/// well as the six or seven field form with a leading seconds column.
pub fn parse_schedule(expression: &str) -> Result<Schedule> {
    let expression = expression.trim();
    let normalized = if expression.split_whitespace().count() == 5 {
        format!("0 {}", expression)
    } else {
        expression.to_string()
    };

    Schedule::from_str(&normalized).map_err(|e| KeihoError::InvalidSchedule {
        expression: expression.to_string(),
        reason: e.to_string(),
    })
}

/// The first tick strictly after both the previous tick and `now`.
///
/// A cycle that overruns one or more ticks resumes at the next future tick
/// instead of firing the missed ones back to back.
fn next_tick(
    schedule: &Schedule,
    previous: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    let from = previous.map_or(now, |previous| previous.max(now));
    schedule.after(&from).next()
}

impl Monitor {
    /// Run [`Monitor::start`] on every tick of `schedule`.
    ///
    /// Cycles never overlap: the next tick is computed once the running
    /// cycle has finished. Cycle errors are logged and the loop continues.
    /// Returns only when the schedule has no upcoming ticks.
    pub async fn run_on_schedule(&self, schedule: &Schedule) -> Result<()> {
        let mut previous = None;

        loop {
            let now = Utc::now();
            let Some(tick) = next_tick(schedule, previous, now) else {
                info!("Schedule has no upcoming ticks, stopping");
                return Ok(());
            };

            let wait = (tick - now).to_std().unwrap_or(Duration::ZERO);
            debug!("Next monitor cycle at {} (in {:?})", tick, wait);
            tokio::time::sleep(wait).await;
            previous = Some(tick);

            if let Err(e) = self.start().await {
                error!("Monitor cycle scheduled for {} failed: {}", tick, e);
            }
        }
    }
}
