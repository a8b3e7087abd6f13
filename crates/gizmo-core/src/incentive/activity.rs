//! Browsing-time reporter.
//!
//! While a browsing session is active, calls `record_activity` once per
//! elapsed period. Missed ticks are skipped rather than replayed, so a stalled
//! runtime can never report more minutes than actually passed.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::debug;

use super::service::IncentiveService;

/// Handle to a running reporter. Dropping it stops the reporting.
pub struct ActivityReporter {
    handle: JoinHandle<()>,
}

impl ActivityReporter {
    /// Start reporting. The first report happens one full `period` from now.
    pub fn start(service: Arc<IncentiveService>, period: Duration) -> Self {
        let handle = tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                service.record_activity();
            }
        });
        debug!(?period, "activity reporter started");
        Self { handle }
    }

    pub fn stop(self) {
        // Drop does the work.
    }
}

impl Drop for ActivityReporter {
    fn drop(&mut self) {
        self.handle.abort();
        debug!("activity reporter stopped");
    }
}
