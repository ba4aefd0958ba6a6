//! Report lifecycle storage ports (driven/secondary ports)
//!
//! ## Design Notes
//!
//! - `reserve` is the single serialization point of the pipeline. A
//!   uniqueness conflict is a normal outcome reported as
//!   [`Reservation::Duplicate`]; only infrastructure failures are errors.
//! - `update` persists a subset of fields. Ephemeral backends accept the
//!   call and do nothing.
//! - Queries live on [`IReportRepository`], which only durable backends
//!   implement.

use chrono::{DateTime, Utc};

use crate::domain::{ErrorReport, ReportId, Severity};

/// Outcome of a reservation attempt
#[derive(Debug, Clone, PartialEq)]
pub enum Reservation {
    /// The caller owns the `(fingerprint, dedupe_window)` slot
    Reserved(ErrorReport),
    /// Another invocation already owns the slot
    Duplicate,
}

/// Report columns that can be updated after reservation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportField {
    Severity,
    Category,
    Analysis,
    ResolvedAt,
}

impl ReportField {
    /// Fields rewritten when enrichment succeeds or fails
    pub const ENRICHMENT: &'static [ReportField] = &[
        ReportField::Severity,
        ReportField::Category,
        ReportField::Analysis,
    ];

    /// Column name in the durable schema
    pub fn column(&self) -> &'static str {
        match self {
            ReportField::Severity => "severity",
            ReportField::Category => "category",
            ReportField::Analysis => "analysis",
            ReportField::ResolvedAt => "resolved_at",
        }
    }
}

/// Filter for listing reports
#[derive(Debug, Clone)]
pub struct ReportFilter {
    /// Only reports with exactly this severity
    pub severity: Option<Severity>,
    /// Skip reports with a `resolved_at` timestamp
    pub unresolved_only: bool,
    /// Maximum number of reports, newest first
    pub limit: u32,
}

impl Default for ReportFilter {
    fn default() -> Self {
        Self {
            severity: None,
            unresolved_only: false,
            limit: 20,
        }
    }
}

impl ReportFilter {
    /// Unresolved critical reports
    pub fn critical() -> Self {
        Self {
            severity: Some(Severity::Critical),
            unresolved_only: true,
            ..Self::default()
        }
    }
}

/// Reserve/update contract implemented by every storage backend
#[async_trait::async_trait]
pub trait IReportStore: Send + Sync {
    /// Atomically claims the report's `(fingerprint, dedupe_window)` slot
    ///
    /// Returns the stored report (with its identifier when durable) or
    /// [`Reservation::Duplicate`].
    async fn reserve(&self, report: ErrorReport) -> anyhow::Result<Reservation>;

    /// Persists the given fields of `report`
    async fn update(&self, report: &ErrorReport, fields: &[ReportField]) -> anyhow::Result<()>;

    /// Whether reports outlive the job that created them
    fn is_durable(&self) -> bool;
}

/// Queries and maintenance on durably stored reports
#[async_trait::async_trait]
pub trait IReportRepository: Send + Sync {
    /// Retrieves a report by its identifier
    async fn get(&self, id: ReportId) -> anyhow::Result<Option<ErrorReport>>;

    /// Lists reports newest first
    async fn recent(&self, filter: &ReportFilter) -> anyhow::Result<Vec<ErrorReport>>;

    /// Counts reports that occurred before `cutoff`
    async fn count_older_than(&self, cutoff: DateTime<Utc>) -> anyhow::Result<u64>;

    /// Deletes reports that occurred before `cutoff`, returning how many were removed
    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> anyhow::Result<u64>;

    /// Reports still at `processing` whose reservation was made before `cutoff`
    async fn stale_processing(&self, cutoff: DateTime<Utc>) -> anyhow::Result<Vec<ErrorReport>>;
}
