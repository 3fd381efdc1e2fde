//! Periodic reconciliation.
//!
//! A single task consumes timer ticks one at a time and awaits each cycle
//! before asking for the next tick, so cycles never overlap. A cycle that
//! outlasts the interval pushes the following ticks back instead of
//! triggering a burst.

use crate::reconcile::Reconciler;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// Default time between reconciliation cycles.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);

/// Shortest interval accepted; `tokio::time::interval` rejects zero.
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Drives a [`Reconciler`] on a fixed interval.
pub struct Scheduler {
    reconciler: Arc<Reconciler>,
    interval: Duration,
}

impl Scheduler {
    pub fn new(reconciler: Arc<Reconciler>, interval: Duration) -> Self {
        Self { reconciler, interval: interval.max(MIN_INTERVAL) }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run the tick loop on a dedicated task.
    ///
    /// The loop has no stop condition; abort the handle to end it.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Run the tick loop on the current task, forever.
    ///
    /// The first cycle starts immediately.
    pub async fn run(self) {
        info!(interval = ?self.interval, "Starting reconciliation loop");

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut cycle: u64 = 0;
        loop {
            ticker.tick().await;
            cycle = cycle.wrapping_add(1);

            // Failures are logged by the reconciler and retried next tick.
            if let Ok(report) = self.reconciler.reconcile().await {
                debug!(cycle, inventory_size = report.inventory_size, "Cycle finished");
            }
        }
    }
}
