//! Periodic eviction of expired entries.

use std::sync::Arc;
use std::time::Duration;

use event_vault::MetricsVault;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Drives `remove_stale_metrics` on a fixed period.
#[derive(Debug, Clone)]
pub struct Sweeper {
    vault: Arc<MetricsVault>,
    period: Duration,
}

impl Sweeper {
    /// Creates a sweeper over `vault` ticking every `period`.
    #[must_use]
    pub const fn new(vault: Arc<MetricsVault>, period: Duration) -> Self {
        Self { vault, period }
    }

    /// Sweeps until `cancel` fires.
    ///
    /// # Panics
    ///
    /// Panics if the period is zero.
    pub async fn run(self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(period = ?self.period, "Sweeper started");
        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let evicted = self.vault.remove_stale_metrics();
                    if evicted > 0 {
                        debug!(evicted, "Removed stale metrics");
                    }
                }
            }
        }
        info!("Sweeper stopped");
    }
}
