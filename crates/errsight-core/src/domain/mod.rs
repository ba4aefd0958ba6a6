//! Domain entities and business logic
//!
//! This module contains the core domain types for errsight:
//! - The transient error event and its free-form context
//! - Fingerprint and dedupe window identity
//! - Severity ordering
//! - Analysis results and the report lifecycle
//! - Rule-based issue titles
//! - Domain-specific error types

pub mod analysis;
pub mod errors;
pub mod event;
pub mod fingerprint;
pub mod issue_title;
pub mod report;
pub mod severity;

// Re-export commonly used types
pub use analysis::{Analysis, AnalysisFailure, AnalysisResult, IssueResult, IssueStatus};
pub use errors::{DomainError, EnrichmentError};
pub use event::{short_type_name, ErrorContext, ErrorEvent};
pub use fingerprint::{DedupeWindow, Fingerprint};
pub use issue_title::{IssueTitle, MAX_TITLE_LENGTH};
pub use report::{ErrorReport, ReportId};
pub use severity::Severity;
