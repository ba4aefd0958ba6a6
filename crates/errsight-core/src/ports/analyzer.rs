//! AI analyzer port (driven/secondary port)

use crate::domain::{AnalysisResult, EnrichmentError, ErrorContext, ErrorReport};

/// Sanitized input handed to an analyzer
#[derive(Debug, Clone, Copy)]
pub struct AnalysisRequest<'a> {
    pub exception_type: &'a str,
    pub message: &'a str,
    pub file: &'a str,
    pub line: u32,
    pub trace: &'a str,
    pub context: &'a ErrorContext,
}

impl<'a> AnalysisRequest<'a> {
    /// Borrows the sanitized fields of a reserved report
    pub fn from_report(report: &'a ErrorReport) -> Self {
        Self {
            exception_type: report.exception_type(),
            message: report.message(),
            file: report.file(),
            line: report.line(),
            trace: report.trace(),
            context: report.context(),
        }
    }
}

/// Produces a structured diagnosis for an error
///
/// Implementations fail with an [`EnrichmentError`] on empty, unparseable
/// or non-object provider output.
#[async_trait::async_trait]
pub trait IAiAnalyzer: Send + Sync {
    async fn analyze(&self, request: AnalysisRequest<'_>) -> Result<AnalysisResult, EnrichmentError>;
}
