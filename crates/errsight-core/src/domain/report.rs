//! Error report entity and its lifecycle
//!
//! ## State Machine
//!
//! ```text
//! Reserved(processing) ──mark_analyzed──> Analyzed(completed) ──link_issue──> Issue-Linked
//!          │
//!          └──────────mark_failed──────> Failed (terminal)
//! ```
//!
//! A report is identified by `(fingerprint, dedupe_window)`; the storage
//! layer enforces uniqueness of that pair at reservation time.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::analysis::{Analysis, AnalysisFailure, AnalysisResult, IssueResult, DEFAULT_CATEGORY};
use super::errors::DomainError;
use super::event::{ErrorContext, ErrorEvent};
use super::fingerprint::{DedupeWindow, Fingerprint};
use super::severity::Severity;

/// Storage-assigned report identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReportId(i64);

impl ReportId {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for ReportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A deduplicated, sanitized record of an error occurrence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorReport {
    id: Option<ReportId>,
    exception_type: String,
    message: String,
    file: String,
    line: u32,
    fingerprint: Fingerprint,
    dedupe_window: DedupeWindow,
    trace: String,
    severity: Severity,
    category: String,
    analysis: Analysis,
    context: ErrorContext,
    occurred_at: DateTime<Utc>,
    resolved_at: Option<DateTime<Utc>>,
    /// When the slot was reserved; stale-reservation sweeps age from here
    created_at: DateTime<Utc>,
}

impl ErrorReport {
    /// Creates the placeholder written at reservation time
    ///
    /// `event` must already be sanitized; the report copies its trace and
    /// context verbatim.
    pub fn reserve(event: &ErrorEvent, fingerprint: Fingerprint, dedupe_window: DedupeWindow) -> Self {
        Self::reserve_at(event, fingerprint, dedupe_window, Utc::now())
    }

    /// Same as [`ErrorReport::reserve`] with an explicit reservation instant
    pub fn reserve_at(
        event: &ErrorEvent,
        fingerprint: Fingerprint,
        dedupe_window: DedupeWindow,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: None,
            exception_type: event.exception_type.clone(),
            message: event.message.clone(),
            file: event.file.clone(),
            line: event.line,
            fingerprint,
            dedupe_window,
            trace: event.trace.clone(),
            severity: Severity::Medium,
            category: DEFAULT_CATEGORY.to_string(),
            analysis: Analysis::Processing,
            context: event.context.clone(),
            occurred_at: event.occurred_at,
            resolved_at: None,
            created_at: now,
        }
    }

    // --- Getters ---

    pub fn id(&self) -> Option<ReportId> {
        self.id
    }

    pub fn exception_type(&self) -> &str {
        &self.exception_type
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    pub fn dedupe_window(&self) -> DedupeWindow {
        self.dedupe_window
    }

    pub fn trace(&self) -> &str {
        &self.trace
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn analysis(&self) -> &Analysis {
        &self.analysis
    }

    pub fn context(&self) -> &ErrorContext {
        &self.context
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn resolved_at(&self) -> Option<DateTime<Utc>> {
        self.resolved_at
    }

    /// Exception type without its namespace
    pub fn short_type(&self) -> &str {
        super::event::short_type_name(&self.exception_type)
    }

    /// `file:line` location string
    pub fn location(&self) -> String {
        format!("{}:{}", self.file, self.line)
    }

    // --- Lifecycle ---

    /// Attaches the storage identifier after a durable insert
    pub fn with_id(mut self, id: ReportId) -> Self {
        self.id = Some(id);
        self
    }

    /// Records a successful analysis, overwriting severity and category
    pub fn mark_analyzed(&mut self, result: AnalysisResult) -> Result<(), DomainError> {
        self.require_processing(Analysis::STATUS_COMPLETED)?;
        self.severity = result.severity;
        self.category = result.category.clone();
        self.analysis = Analysis::Completed {
            result,
            issue: None,
        };
        Ok(())
    }

    /// Merges the issue tracker outcome next to the analysis fields
    pub fn link_issue(&mut self, issue: IssueResult) -> Result<(), DomainError> {
        match &mut self.analysis {
            Analysis::Completed { issue: slot, .. } => {
                *slot = Some(issue);
                Ok(())
            }
            other => Err(DomainError::InvalidState {
                from: other.status().to_string(),
                to: "issue_linked".to_string(),
            }),
        }
    }

    /// Records an enrichment failure and falls back to medium/other
    pub fn mark_failed(&mut self, failure: AnalysisFailure) -> Result<(), DomainError> {
        self.require_processing(Analysis::STATUS_FAILED)?;
        self.severity = Severity::Medium;
        self.category = DEFAULT_CATEGORY.to_string();
        self.analysis = Analysis::Failed(failure);
        Ok(())
    }

    /// Marks the error as resolved by an operator
    pub fn resolve(&mut self, at: DateTime<Utc>) {
        self.resolved_at = Some(at);
    }

    fn require_processing(&self, to: &str) -> Result<(), DomainError> {
        if matches!(self.analysis, Analysis::Processing) {
            Ok(())
        } else {
            Err(DomainError::InvalidState {
                from: self.analysis.status().to_string(),
                to: to.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::domain::analysis::IssueStatus;
    use crate::domain::errors::EnrichmentError;

    fn reserved() -> ErrorReport {
        let event = ErrorEvent::new("App\\RuntimeException", "boom", "file.php", 42)
            .with_trace("#0 main")
            .with_context("environment", "production")
            .at(Utc.with_ymd_and_hms(2026, 1, 31, 12, 0, 0).unwrap());
        let fp = Fingerprint::compute(&event.exception_type, &event.file, event.line);
        let window = DedupeWindow::compute(event.occurred_at, 5).unwrap();
        ErrorReport::reserve(&event, fp, window)
    }

    #[test]
    fn reserve_creates_placeholder() {
        let report = reserved();
        assert!(report.id().is_none());
        assert_eq!(report.severity(), Severity::Medium);
        assert_eq!(report.category(), "other");
        assert_eq!(report.analysis().status(), "processing");
        assert_eq!(report.short_type(), "RuntimeException");
        assert_eq!(report.location(), "file.php:42");
    }

    #[test]
    fn reservation_time_is_independent_of_occurrence() {
        let event = ErrorEvent::new("RuntimeException", "boom", "file.php", 42)
            .at(Utc.with_ymd_and_hms(2026, 1, 31, 12, 0, 0).unwrap());
        let fp = Fingerprint::compute(&event.exception_type, &event.file, event.line);
        let window = DedupeWindow::compute(event.occurred_at, 5).unwrap();
        let reserved_at = Utc.with_ymd_and_hms(2026, 1, 31, 12, 20, 0).unwrap();

        let report = ErrorReport::reserve_at(&event, fp, window, reserved_at);
        assert_eq!(report.occurred_at(), event.occurred_at);
        assert_eq!(report.created_at(), reserved_at);
    }

    #[test]
    fn mark_analyzed_overwrites_classification() {
        let mut report = reserved();
        report
            .mark_analyzed(AnalysisResult {
                severity: Severity::Critical,
                category: "database".into(),
                ..AnalysisResult::default()
            })
            .unwrap();

        assert_eq!(report.severity(), Severity::Critical);
        assert_eq!(report.category(), "database");
        assert_eq!(report.analysis().status(), "completed");
    }

    #[test]
    fn link_issue_requires_completed_analysis() {
        let mut report = reserved();
        let err = report.link_issue(IssueResult::disabled()).unwrap_err();
        assert!(matches!(err, DomainError::InvalidState { .. }));

        report.mark_analyzed(AnalysisResult::default()).unwrap();
        report
            .link_issue(IssueResult::created("https://x.test/1", Some(1)))
            .unwrap();
        assert_eq!(
            report.analysis().issue().map(|i| i.status),
            Some(IssueStatus::Created)
        );
    }

    #[test]
    fn mark_failed_is_terminal() {
        let mut report = reserved();
        let failure = AnalysisFailure::from_error(&EnrichmentError::Timeout, Utc::now());
        report.mark_failed(failure.clone()).unwrap();

        assert_eq!(report.severity(), Severity::Medium);
        assert_eq!(report.category(), "other");
        assert!(report.mark_analyzed(AnalysisResult::default()).is_err());
        assert!(report.mark_failed(failure).is_err());
    }

    #[test]
    fn serde_roundtrip_preserves_private_fields() {
        let report = reserved().with_id(ReportId::new(9));
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["analysis"]["status"], "processing");
        let back: ErrorReport = serde_json::from_value(value).unwrap();
        assert_eq!(back, report);
    }
}
