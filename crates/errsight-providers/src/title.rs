//! `IIssueTitleGenerator` implementations
//!
//! The Gemini generator spends one unit of the shared daily quota per
//! title. Any failure yields `None`, and the tracker falls back to the
//! rule-based title.

use std::sync::Arc;

use errsight_core::domain::{AnalysisResult, ErrorContext, ErrorReport, IssueTitle};
use errsight_core::ports::IIssueTitleGenerator;
use errsight_core::usecases::QuotaGate;

use crate::gemini::GeminiClient;

/// Title suffixes from a (usually lighter) Gemini model
pub struct GeminiIssueTitleGenerator {
    client: GeminiClient,
    quota: Arc<QuotaGate>,
}

impl GeminiIssueTitleGenerator {
    pub fn new(client: GeminiClient, quota: Arc<QuotaGate>) -> Self {
        Self { client, quota }
    }

    fn build_prompt(report: &ErrorReport, analysis: &AnalysisResult, context: &ErrorContext) -> String {
        let url = context.get("url").and_then(|v| v.as_str()).unwrap_or("N/A");
        format!(
            "Write the summary part of a GitHub issue title for this error.\n\
             Rules: one line, concise and specific, no markdown, no code blocks,\n\
             no quotes, no personal data. Output only the summary text.\n\n\
             Severity: {}\n\
             Category: {}\n\
             Exception: {}\n\
             Message: {}\n\
             Root cause: {}\n\
             Impact: {}\n\
             Location: {}\n\
             URL: {}\n",
            report.severity(),
            report.category(),
            report.short_type(),
            report.message(),
            analysis.root_cause,
            analysis.impact,
            report.location(),
            url,
        )
    }
}

#[async_trait::async_trait]
impl IIssueTitleGenerator for GeminiIssueTitleGenerator {
    async fn generate_title_suffix(
        &self,
        report: &ErrorReport,
        analysis: &AnalysisResult,
        context: &ErrorContext,
    ) -> Option<String> {
        if !self.quota.try_consume().await {
            tracing::info!(
                report_id = ?report.id(),
                "Daily quota reached, using rule-based issue title"
            );
            return None;
        }

        let prompt = Self::build_prompt(report, analysis, context);
        match self.client.generate(&prompt).await {
            Ok(text) => {
                let suffix = IssueTitle::normalize_suffix(&text.replace("```", " "));
                if suffix.is_none() {
                    tracing::warn!(report_id = ?report.id(), "Title generator returned no usable text");
                }
                suffix
            }
            Err(e) => {
                tracing::warn!(
                    report_id = ?report.id(),
                    error = %e,
                    "Title generation failed, using rule-based issue title"
                );
                None
            }
        }
    }
}

/// Always defers to the rule-based title
#[derive(Debug, Default, Clone, Copy)]
pub struct NullIssueTitleGenerator;

#[async_trait::async_trait]
impl IIssueTitleGenerator for NullIssueTitleGenerator {
    async fn generate_title_suffix(
        &self,
        _report: &ErrorReport,
        _analysis: &AnalysisResult,
        _context: &ErrorContext,
    ) -> Option<String> {
        None
    }
}
