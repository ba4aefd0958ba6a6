//! Periodic purge of expired cache entries
//!
//! Expired dedupe keys, quota counters and locks are invisible to readers
//! but still occupy the store. While a worker pool runs, the sweeper calls
//! [`ICacheStore::purge_expired`] on a fixed interval until its token is
//! cancelled.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use errsight_core::ports::ICacheStore;

/// Background task that purges a cache store
pub struct CacheSweeper {
    cache: Arc<dyn ICacheStore + Send + Sync>,
    interval: Duration,
}

impl CacheSweeper {
    pub fn new(cache: Arc<dyn ICacheStore + Send + Sync>, interval: Duration) -> Self {
        Self { cache, interval }
    }

    /// Runs one purge; failures are logged and counted as zero
    pub async fn sweep_once(&self) -> u64 {
        match self.cache.purge_expired().await {
            Ok(purged) => {
                if purged > 0 {
                    debug!(purged, "Expired cache entries purged");
                }
                purged
            }
            Err(e) => {
                warn!(error = %e, "Cache purge failed");
                0
            }
        }
    }

    /// Spawns the purge loop; the handle resolves with the total purged
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<u64> {
        tokio::spawn(async move { self.run(shutdown).await })
    }

    async fn run(self, shutdown: CancellationToken) -> u64 {
        let period = self.interval.max(Duration::from_millis(1));
        let mut timer = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut total = 0;

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = timer.tick() => {
                    total += self.sweep_once().await;
                }
            }
        }

        info!(purged = total, "Cache sweeper stopped");
        total
    }
}
