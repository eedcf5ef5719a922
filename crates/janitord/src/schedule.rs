//! Cron-driven pass loop.
//!
//! Passes run back to back on the loop task, so two passes never overlap:
//! the next tick is computed only after the previous pass returns, and any
//! ticks missed while a pass was running are skipped.

use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use cron::Schedule;
use tracing::{info, warn};

/// The cron fields the janitor exposes; seconds are pinned to 0 and every
/// month is included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronFields {
    pub minute: String,
    pub hour: String,
    pub day: String,
    pub day_of_week: String,
}

impl CronFields {
    /// `sec min hour day-of-month month day-of-week`
    pub fn expression(&self) -> String {
        format!(
            "0 {} {} {} * {}",
            self.minute, self.hour, self.day, self.day_of_week
        )
    }

    pub fn schedule(&self) -> Result<Schedule> {
        let expr = self.expression();
        Schedule::from_str(&expr).with_context(|| format!("invalid cron schedule {expr:?}"))
    }
}

/// Time until the first tick strictly after `now`.
pub fn next_delay(schedule: &Schedule, now: DateTime<Utc>) -> Option<(DateTime<Utc>, Duration)> {
    let next = schedule.after(&now).next()?;
    let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
    Some((next, wait))
}

/// Run `pass` on every tick of `schedule` until `shutdown` resolves.
///
/// Shutdown is only observed between passes; a pass in progress always
/// runs to completion.
pub async fn run_on_schedule<F, Fut, S>(schedule: &Schedule, shutdown: S, mut pass: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
    S: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    loop {
        let Some((next, wait)) = next_delay(schedule, Utc::now()) else {
            warn!("schedule has no upcoming ticks, stopping");
            return;
        };
        info!(next = %next, "next janitor pass scheduled");

        tokio::select! {
            _ = tokio::time::sleep(wait) => pass().await,
            _ = &mut shutdown => {
                info!("exiting on shutdown signal");
                return;
            }
        }
    }
}

/// Resolves on Ctrl-C or, on unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "unable to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "unable to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
