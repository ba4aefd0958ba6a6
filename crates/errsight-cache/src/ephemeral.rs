//! Ephemeral report store
//!
//! Reservation is an atomic add of a dedupe key on an [`ICacheStore`];
//! reports live only in the job that reserved them and `update` does
//! nothing. The key outlives the window by a fixed grace period to absorb
//! skew between bucket computation and cache expiry.
//!
//! The window bucket comes from the event's `occurred_at`, but the key's
//! TTL runs from reservation time, so a late-reserved event holds its key
//! for a full window measured from now.

use std::sync::Arc;
use std::time::Duration;

use errsight_core::domain::ErrorReport;
use errsight_core::ports::{ICacheStore, IReportStore, ReportField, Reservation};

/// Extra lifetime of a dedupe key beyond its window
pub const DEDUPE_GRACE: Duration = Duration::from_secs(60);

/// `IReportStore` whose reports are never persisted
pub struct CacheReportStore {
    cache: Arc<dyn ICacheStore + Send + Sync>,
    window_minutes: u32,
}

impl CacheReportStore {
    pub fn new(cache: Arc<dyn ICacheStore + Send + Sync>, window_minutes: u32) -> Self {
        Self {
            cache,
            window_minutes,
        }
    }

    /// `error_analyzer:dedupe:{fingerprint}:{window}`
    pub fn dedupe_key(report: &ErrorReport) -> String {
        format!(
            "error_analyzer:dedupe:{}:{}",
            report.fingerprint(),
            report.dedupe_window()
        )
    }

    /// Window size plus [`DEDUPE_GRACE`]
    pub fn key_ttl(&self) -> Duration {
        Duration::from_secs(u64::from(self.window_minutes) * 60) + DEDUPE_GRACE
    }
}

#[async_trait::async_trait]
impl IReportStore for CacheReportStore {
    async fn reserve(&self, report: ErrorReport) -> anyhow::Result<Reservation> {
        let key = Self::dedupe_key(&report);
        if self.cache.add(&key, 1, self.key_ttl()).await? {
            tracing::debug!(key = %key, "Dedupe key claimed");
            Ok(Reservation::Reserved(report))
        } else {
            Ok(Reservation::Duplicate)
        }
    }

    async fn update(&self, _report: &ErrorReport, _fields: &[ReportField]) -> anyhow::Result<()> {
        Ok(())
    }

    fn is_durable(&self) -> bool {
        false
    }
}
