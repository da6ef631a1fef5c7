use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use crate::refresh::{RefreshLoop, TickOutcome};
use crate::render::Renderer;
use crate::source::ReadingSource;

/// Run the refresh loop forever: one cycle immediately, then one per `period`.
///
/// Each cycle is awaited before the next tick is taken. A cycle that runs
/// longer than `period` delays the schedule instead of causing catch-up
/// bursts. Failures are logged and left to the next tick.
pub async fn run_refresh_loop<S, R>(refresh: Arc<RefreshLoop<S, R>>, period: Duration)
where
    S: ReadingSource,
    R: Renderer,
{
    tracing::info!(
        interval_ms = u64::try_from(period.as_millis()).unwrap_or(u64::MAX),
        "Starting refresh scheduler"
    );

    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        // First tick completes immediately
        ticker.tick().await;

        match refresh.tick().await {
            TickOutcome::Applied { readings, sensors } => {
                tracing::debug!(readings, sensors, "Scheduled refresh completed");
            }
            TickOutcome::Failed { message } => {
                tracing::debug!(
                    error = %message,
                    "Scheduled refresh failed, waiting for next tick"
                );
            }
            TickOutcome::Skipped => {
                tracing::debug!("Scheduled refresh skipped, previous cycle still running");
            }
        }
    }
}

impl<S, R> RefreshLoop<S, R>
where
    S: ReadingSource + 'static,
    R: Renderer + 'static,
{
    /// Spawn the scheduler on the current runtime.
    pub fn start(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        tokio::spawn(run_refresh_loop(Arc::clone(self), period))
    }
}
