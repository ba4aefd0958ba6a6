//! Issue tracker ports (driven/secondary ports)
//!
//! ## Design Notes
//!
//! - `create_issue` never fails: every failure mode is an [`IssueStatus`]
//!   so the orchestrator can always merge the outcome.
//! - Title generation is optional enrichment. `None` means the tracker
//!   falls back to the rule-based title.
//!
//! [`IssueStatus`]: crate::domain::IssueStatus

use crate::domain::{AnalysisResult, ErrorContext, ErrorReport, IssueResult};

/// Opens issues for analyzed reports
#[async_trait::async_trait]
pub trait IIssueTracker: Send + Sync {
    async fn create_issue(
        &self,
        report: &ErrorReport,
        analysis: &AnalysisResult,
        trace: &str,
        context: &ErrorContext,
    ) -> IssueResult;
}

/// Proposes the free-text part of an issue title
#[async_trait::async_trait]
pub trait IIssueTitleGenerator: Send + Sync {
    async fn generate_title_suffix(
        &self,
        report: &ErrorReport,
        analysis: &AnalysisResult,
        context: &ErrorContext,
    ) -> Option<String>;
}
