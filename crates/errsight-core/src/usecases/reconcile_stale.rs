//! Reconciliation of abandoned reservations
//!
//! A job that crashes between reservation and completion leaves its
//! durable report at `processing` forever; retries only see the existing
//! reservation and skip. This sweep moves such reports to the failed state
//! once their reservation is older than a grace period comfortably above
//! the job timeout. Age is measured from the reservation, not from when
//! the error occurred, so events that waited in the queue are not swept.
//! It never re-runs the analysis, so no quota is spent twice.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};

use crate::domain::AnalysisFailure;
use crate::ports::{IReportRepository, IReportStore, ReportField};

/// Failure kind recorded on reconciled reports
pub const STALE_RESERVATION_KIND: &str = "stale_reservation";

/// Result of a reconciliation sweep
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub cutoff: DateTime<Utc>,
    /// Reports found at `processing` before the cutoff
    pub found: usize,
    /// Reports moved to failed (zero on a dry run)
    pub failed: usize,
    pub dry_run: bool,
}

/// Use case for failing reports stuck at `processing`
pub struct ReconcileStaleReportsUseCase {
    repository: Arc<dyn IReportRepository + Send + Sync>,
    store: Arc<dyn IReportStore + Send + Sync>,
}

impl ReconcileStaleReportsUseCase {
    pub fn new(
        repository: Arc<dyn IReportRepository + Send + Sync>,
        store: Arc<dyn IReportStore + Send + Sync>,
    ) -> Self {
        Self { repository, store }
    }

    pub async fn execute(&self, stale_after: Duration, dry_run: bool) -> Result<ReconcileSummary> {
        self.execute_at(stale_after, dry_run, Utc::now()).await
    }

    pub async fn execute_at(
        &self,
        stale_after: Duration,
        dry_run: bool,
        now: DateTime<Utc>,
    ) -> Result<ReconcileSummary> {
        let cutoff = now - stale_after;
        let stale = self
            .repository
            .stale_processing(cutoff)
            .await
            .context("Failed to query stale reports")?;

        let found = stale.len();
        let mut failed = 0;

        if !dry_run {
            let message = format!(
                "Enrichment did not complete within {} minutes",
                stale_after.num_minutes()
            );
            for mut report in stale {
                if let Err(e) =
                    report.mark_failed(AnalysisFailure::new(STALE_RESERVATION_KIND, &message, now))
                {
                    tracing::debug!(error = %e, report_id = ?report.id(), "Report no longer processing");
                    continue;
                }
                self.store
                    .update(&report, ReportField::ENRICHMENT)
                    .await
                    .with_context(|| format!("Failed to update report {:?}", report.id()))?;
                tracing::warn!(
                    report_id = ?report.id(),
                    fingerprint = %report.fingerprint(),
                    "Stale reservation marked as failed"
                );
                failed += 1;
            }
        }

        Ok(ReconcileSummary {
            cutoff,
            found,
            failed,
            dry_run,
        })
    }
}
