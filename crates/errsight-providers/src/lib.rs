//! errsight Providers - HTTP collaborators of the enrichment pipeline
//!
//! Provides adapters for:
//! - AI analysis and issue-title suggestions through the Gemini API
//! - GitHub issue creation
//! - Slack incoming-webhook notifications
//!
//! Each collaborator also has a disabled (`Null*`) variant that returns
//! inert results, selected by configuration at startup.
//!
//! ## Modules
//!
//! - [`gemini`] - Gemini `generateContent` HTTP client
//! - [`analyzer`] - `IAiAnalyzer` implementations
//! - [`json_extract`] - Pulls a JSON object out of free-form model output
//! - [`github`] - `IIssueTracker` implementations
//! - [`title`] - `IIssueTitleGenerator` implementations
//! - [`slack`] - `INotificationChannel` implementations

pub mod analyzer;
pub mod gemini;
pub mod github;
pub mod json_extract;
pub mod slack;
pub mod title;

use std::time::Duration;

use thiserror::Error;

pub use analyzer::{GeminiAnalyzer, NullAnalyzer};
pub use gemini::GeminiClient;
pub use github::{GithubIssueTracker, NullIssueTracker};
pub use slack::{NullNotificationChannel, SlackNotificationChannel};
pub use title::{GeminiIssueTitleGenerator, NullIssueTitleGenerator};

/// Request timeout for issue tracker and notification calls
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors that can occur when calling an external provider
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider answered with a non-success status
    #[error("HTTP {status}: {message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Message extracted from the response body
        message: String,
    },

    /// A network-level error occurred
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// The response could not be parsed or was malformed
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Best-effort error message from a JSON error body
///
/// Understands `{"message": ...}` (GitHub) and `{"error": {"message": ...}}`
/// (Google APIs); falls back to the raw body.
pub(crate) fn error_message(body: &str) -> String {
    let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
    parsed
        .as_ref()
        .and_then(|v| {
            v.get("message")
                .or_else(|| v.get("error").and_then(|e| e.get("message")))
                .and_then(|m| m.as_str())
        })
        .map(str::to_string)
        .unwrap_or_else(|| body.trim().chars().take(200).collect())
}
