//! `IAiAnalyzer` implementations
//!
//! - [`GeminiAnalyzer`] asks Gemini for a JSON diagnosis and parses it leniently.
//! - [`NullAnalyzer`] returns a placeholder diagnosis when AI analysis is off.

use errsight_core::domain::{AnalysisResult, EnrichmentError, Severity};
use errsight_core::ports::{AnalysisRequest, IAiAnalyzer};

use crate::gemini::GeminiClient;
use crate::json_extract::extract_json;
use crate::ProviderError;

/// Analyzer backed by the Gemini API
pub struct GeminiAnalyzer {
    client: GeminiClient,
}

impl GeminiAnalyzer {
    pub fn new(client: GeminiClient) -> Self {
        Self { client }
    }

    fn build_prompt(request: &AnalysisRequest<'_>) -> String {
        let context = serde_json::to_string_pretty(request.context).unwrap_or_else(|_| "{}".into());
        format!(
            "You are a senior engineer triaging a production error.\n\
             Respond with a single JSON object and nothing else, using these keys:\n\
             severity (one of low, medium, high, critical), category (short lowercase tag),\n\
             root_cause, impact, immediate_action, recommended_fix,\n\
             similar_issues (array of strings), prevention.\n\n\
             Exception: {}\n\
             Message: {}\n\
             Location: {}:{}\n\n\
             Stack trace:\n{}\n\n\
             Context:\n{}\n",
            request.exception_type,
            request.message,
            request.file,
            request.line,
            request.trace,
            context
        )
    }

    /// Turns raw model output into an [`AnalysisResult`]
    pub fn parse_response(text: &str) -> Result<AnalysisResult, EnrichmentError> {
        if text.trim().is_empty() {
            return Err(EnrichmentError::EmptyResponse);
        }
        let candidate = extract_json(text).unwrap_or_else(|| text.trim());
        let value: serde_json::Value = serde_json::from_str(candidate)
            .map_err(|e| EnrichmentError::Parse(e.to_string()))?;
        AnalysisResult::from_json(&value)
    }
}

impl From<ProviderError> for EnrichmentError {
    fn from(e: ProviderError) -> Self {
        match e {
            ProviderError::Status { status, message } => EnrichmentError::Provider { status, message },
            ProviderError::NetworkError(err) if err.is_timeout() => EnrichmentError::Timeout,
            ProviderError::NetworkError(err) => EnrichmentError::Network(err.to_string()),
            ProviderError::InvalidResponse(msg) => EnrichmentError::Parse(msg),
        }
    }
}

#[async_trait::async_trait]
impl IAiAnalyzer for GeminiAnalyzer {
    async fn analyze(&self, request: AnalysisRequest<'_>) -> Result<AnalysisResult, EnrichmentError> {
        let prompt = Self::build_prompt(&request);
        let text = self.client.generate(&prompt).await?;
        let result = Self::parse_response(&text)?;
        tracing::debug!(
            model = %self.client.model(),
            severity = %result.severity,
            category = %result.category,
            "Gemini analysis parsed"
        );
        Ok(result)
    }
}

/// Analyzer used when AI analysis is disabled
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAnalyzer;

#[async_trait::async_trait]
impl IAiAnalyzer for NullAnalyzer {
    async fn analyze(&self, _request: AnalysisRequest<'_>) -> Result<AnalysisResult, EnrichmentError> {
        Ok(AnalysisResult {
            severity: Severity::Medium,
            category: "other".into(),
            root_cause: "AI analysis is disabled".into(),
            impact: "Unknown".into(),
            immediate_action: "Review the stack trace manually".into(),
            recommended_fix: "Enable an AI analyzer for automated diagnosis".into(),
            similar_issues: Vec::new(),
            prevention: String::new(),
        })
    }
}
