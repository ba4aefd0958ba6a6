//! Retention sweep for durable reports
//!
//! Deletes reports whose `occurred_at` is older than a number of days.
//! Ephemeral storage keeps nothing, so callers only build this use case
//! when a durable repository exists.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Duration, Utc};

use crate::ports::IReportRepository;

/// Result of a retention sweep
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupSummary {
    /// Reports older than this were targeted
    pub cutoff: DateTime<Utc>,
    /// Reports matching the cutoff
    pub matched: u64,
    /// Reports actually deleted (zero on a dry run)
    pub deleted: u64,
    pub dry_run: bool,
}

/// Use case for deleting old reports
pub struct CleanupReportsUseCase {
    repository: Arc<dyn IReportRepository + Send + Sync>,
}

impl CleanupReportsUseCase {
    pub fn new(repository: Arc<dyn IReportRepository + Send + Sync>) -> Self {
        Self { repository }
    }

    /// Deletes reports older than `days` days
    ///
    /// # Errors
    ///
    /// Fails when `days` is zero or the repository cannot be queried.
    pub async fn execute(&self, days: u32, dry_run: bool) -> Result<CleanupSummary> {
        self.execute_at(days, dry_run, Utc::now()).await
    }

    pub async fn execute_at(
        &self,
        days: u32,
        dry_run: bool,
        now: DateTime<Utc>,
    ) -> Result<CleanupSummary> {
        if days < 1 {
            bail!("Retention must be at least 1 day");
        }
        let cutoff = now - Duration::days(i64::from(days));

        let matched = self
            .repository
            .count_older_than(cutoff)
            .await
            .context("Failed to count old reports")?;

        let deleted = if dry_run || matched == 0 {
            0
        } else {
            self.repository
                .delete_older_than(cutoff)
                .await
                .context("Failed to delete old reports")?
        };

        tracing::info!(
            cutoff = %cutoff,
            matched,
            deleted,
            dry_run,
            "Report retention sweep finished"
        );

        Ok(CleanupSummary {
            cutoff,
            matched,
            deleted,
            dry_run,
        })
    }
}
