//! Background poll scheduler
//!
//! Runs a poll cycle on a fixed interval. Interval changes arrive through a
//! watch channel and reschedule the timer without restarting the task.

use super::poller::{PollEngine, PollOutcome, PollTrigger};
use crate::config::clamp_interval;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

pub struct PollScheduler;

fn timer(period: Duration, start: Instant) -> Interval {
    let mut interval = interval_at(start, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

impl PollScheduler {
    /// Spawn the scheduler task; the first cycle runs immediately
    pub fn spawn(
        engine: Arc<PollEngine>,
        interval_rx: watch::Receiver<u64>,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(run(engine, interval_rx, cancel))
    }
}

async fn run(engine: Arc<PollEngine>, mut interval_rx: watch::Receiver<u64>, cancel: CancellationToken) {
    let mut period = Duration::from_secs(clamp_interval(*interval_rx.borrow_and_update()));
    let mut interval = timer(period, Instant::now());
    let mut updates_open = true;

    tracing::info!(interval_secs = period.as_secs(), "Starting poll scheduler");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Poll scheduler shutting down");
                break;
            }
            changed = interval_rx.changed(), if updates_open => {
                if changed.is_err() {
                    updates_open = false;
                    continue;
                }
                let next = Duration::from_secs(clamp_interval(*interval_rx.borrow_and_update()));
                if next != period {
                    period = next;
                    interval = timer(period, Instant::now() + period);
                    tracing::info!(interval_secs = period.as_secs(), "Poll interval rescheduled");
                }
            }
            _ = interval.tick() => {
                match engine.poll(PollTrigger::Scheduled).await {
                    Ok(PollOutcome::Completed(_)) | Ok(PollOutcome::Abandoned(_)) => {}
                    Ok(PollOutcome::Skipped) => {
                        tracing::debug!("Scheduled poll skipped, cycle already running");
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Scheduled poll failed");
                    }
                }
            }
        }
    }
}
