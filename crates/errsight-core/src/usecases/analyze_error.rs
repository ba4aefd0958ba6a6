//! Error enrichment use case (the job)
//!
//! Runs once per error event:
//!
//! ```text
//! sanitize -> reserve -> {duplicate: skip}
//!                     -> quota -> analyze -> {ok: update, notify, create issue, merge issue}
//!                                         -> {err: update failed}
//! ```
//!
//! Enrichment failures (including quota exhaustion) end in a failed report
//! and are never returned. Storage failures are returned so the queue can
//! retry the job; a retried job hits the existing reservation and skips.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;

use crate::domain::{
    AnalysisFailure, AnalysisResult, DedupeWindow, EnrichmentError, ErrorEvent, ErrorReport,
    Fingerprint, IssueStatus,
};
use crate::ports::{
    AnalysisRequest, IAiAnalyzer, IIssueTracker, INotificationChannel, IReportStore, ReportField,
    Reservation,
};
use crate::sanitizer::PiiSanitizer;
use crate::usecases::quota::QuotaGate;

/// Terminal state of one job invocation
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    /// Another invocation owns this fingerprint and window
    Skipped,
    /// Enrichment succeeded
    Analyzed(ErrorReport),
    /// Enrichment failed; the report records why
    Failed(ErrorReport),
}

impl JobOutcome {
    pub fn report(&self) -> Option<&ErrorReport> {
        match self {
            JobOutcome::Skipped => None,
            JobOutcome::Analyzed(report) | JobOutcome::Failed(report) => Some(report),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            JobOutcome::Skipped => "skipped",
            JobOutcome::Analyzed(_) => "analyzed",
            JobOutcome::Failed(_) => "failed",
        }
    }
}

/// Use case that enriches a single error event
pub struct AnalyzeErrorUseCase {
    sanitizer: PiiSanitizer,
    store: Arc<dyn IReportStore + Send + Sync>,
    quota: Arc<QuotaGate>,
    analyzer: Arc<dyn IAiAnalyzer + Send + Sync>,
    notifier: Arc<dyn INotificationChannel + Send + Sync>,
    issue_tracker: Arc<dyn IIssueTracker + Send + Sync>,
    window_minutes: u32,
}

impl AnalyzeErrorUseCase {
    /// Creates the use case
    ///
    /// # Arguments
    ///
    /// * `store` - Durable or ephemeral reservation backend
    /// * `quota` - Gate shared with every other AI consumer
    /// * `analyzer` - AI analyzer (or its disabled variant)
    /// * `notifier` - Notification channel (or its disabled variant)
    /// * `issue_tracker` - Issue tracker (or its disabled variant)
    /// * `window_minutes` - Dedupe window size, at least 1
    pub fn new(
        store: Arc<dyn IReportStore + Send + Sync>,
        quota: Arc<QuotaGate>,
        analyzer: Arc<dyn IAiAnalyzer + Send + Sync>,
        notifier: Arc<dyn INotificationChannel + Send + Sync>,
        issue_tracker: Arc<dyn IIssueTracker + Send + Sync>,
        window_minutes: u32,
    ) -> Self {
        Self {
            sanitizer: PiiSanitizer::new(),
            store,
            quota,
            analyzer,
            notifier,
            issue_tracker,
            window_minutes,
        }
    }

    pub fn with_sanitizer(mut self, sanitizer: PiiSanitizer) -> Self {
        self.sanitizer = sanitizer;
        self
    }

    /// Processes one error event
    ///
    /// # Errors
    ///
    /// Returns an error only for infrastructure failures: a reservation or
    /// update the store could not perform, or an invalid window size.
    pub async fn execute(&self, event: &ErrorEvent) -> Result<JobOutcome> {
        let sanitized = ErrorEvent {
            trace: self.sanitizer.sanitize_trace(&event.trace),
            context: self.sanitizer.sanitize_context(&event.context),
            ..event.clone()
        };

        let fingerprint =
            Fingerprint::compute(&sanitized.exception_type, &sanitized.file, sanitized.line);
        let window = DedupeWindow::compute(sanitized.occurred_at, self.window_minutes)?;

        let reservation = self
            .store
            .reserve(ErrorReport::reserve(&sanitized, fingerprint.clone(), window))
            .await
            .context("Failed to reserve error report")?;

        let mut report = match reservation {
            Reservation::Reserved(report) => report,
            Reservation::Duplicate => {
                tracing::info!(
                    fingerprint = %fingerprint,
                    window = %window,
                    "Duplicate error in dedupe window, skipping analysis"
                );
                return Ok(JobOutcome::Skipped);
            }
        };

        match self.enrich(&report).await {
            Ok(result) => {
                self.complete(&mut report, result).await?;
                Ok(JobOutcome::Analyzed(report))
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    kind = e.kind(),
                    fingerprint = %fingerprint,
                    report_id = ?report.id(),
                    "Error analysis failed"
                );
                report.mark_failed(AnalysisFailure::from_error(&e, Utc::now()))?;
                self.store
                    .update(&report, ReportField::ENRICHMENT)
                    .await
                    .context("Failed to persist failed analysis")?;
                Ok(JobOutcome::Failed(report))
            }
        }
    }

    async fn enrich(&self, report: &ErrorReport) -> Result<AnalysisResult, EnrichmentError> {
        if !self.quota.try_consume().await {
            return Err(EnrichmentError::QuotaExhausted);
        }
        self.analyzer
            .analyze(AnalysisRequest::from_report(report))
            .await
    }

    async fn complete(&self, report: &mut ErrorReport, result: AnalysisResult) -> Result<()> {
        report.mark_analyzed(result.clone())?;
        self.store
            .update(report, ReportField::ENRICHMENT)
            .await
            .context("Failed to persist analysis")?;

        tracing::info!(
            report_id = ?report.id(),
            severity = %report.severity(),
            category = %report.category(),
            "Error analyzed"
        );

        self.notifier.notify(report).await;

        let issue = self
            .issue_tracker
            .create_issue(report, &result, report.trace(), report.context())
            .await;

        if issue.status != IssueStatus::Disabled {
            tracing::debug!(status = %issue.status, url = ?issue.url, "Issue tracker responded");
            report.link_issue(issue)?;
            self.store
                .update(report, &[ReportField::Analysis])
                .await
                .context("Failed to persist issue link")?;
        }

        Ok(())
    }
}
