//! Domain error types
//!
//! This module defines error types specific to domain operations,
//! including invalid state transitions and the enrichment failure taxonomy.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid state transition attempt
    #[error("Invalid state transition from {from} to {to}")]
    InvalidState {
        /// The current state
        from: String,
        /// The attempted target state
        to: String,
    },

    /// Dedupe window size must be at least one minute
    #[error("Invalid dedupe window: {0} minutes")]
    InvalidWindow(u32),

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}

/// Failure of the AI enrichment step
///
/// Every variant is recovered by the orchestrator into a failed report;
/// none of them is ever propagated to the code that raised the original error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EnrichmentError {
    /// The shared daily quota refused the analysis call
    #[error("Daily AI analysis quota exhausted")]
    QuotaExhausted,

    /// The provider answered with no usable text
    #[error("Empty response from AI provider")]
    EmptyResponse,

    /// The provider output could not be parsed as JSON
    #[error("Failed to parse AI response: {0}")]
    Parse(String),

    /// The provider output parsed but was not a JSON object
    #[error("AI response is not a JSON object: {0}")]
    InvalidShape(String),

    /// The provider rejected the request
    #[error("AI provider error (status {status}): {message}")]
    Provider {
        /// HTTP status code returned by the provider
        status: u16,
        /// Error message returned by the provider
        message: String,
    },

    /// Transport-level failure
    #[error("Network error: {0}")]
    Network(String),

    /// The provider did not answer in time
    #[error("AI provider request timed out")]
    Timeout,
}

impl EnrichmentError {
    /// Short machine-readable kind stored in the failed analysis note
    pub fn kind(&self) -> &'static str {
        match self {
            EnrichmentError::QuotaExhausted => "quota_exhausted",
            EnrichmentError::EmptyResponse => "empty_response",
            EnrichmentError::Parse(_) => "parse_error",
            EnrichmentError::InvalidShape(_) => "invalid_shape",
            EnrichmentError::Provider { .. } => "provider_error",
            EnrichmentError::Network(_) => "network_error",
            EnrichmentError::Timeout => "timeout",
        }
    }
}
