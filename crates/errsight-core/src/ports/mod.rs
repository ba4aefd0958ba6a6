//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. Ports are interfaces that the domain core
//! depends on, but whose implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IReportStore`] - Reserve/update contract shared by the durable and ephemeral backends
//! - [`IReportRepository`] - Queries and maintenance on durably stored reports
//! - [`ICacheStore`] - Atomic key-value store with expiring entries and named locks
//! - [`IAiAnalyzer`] - AI diagnosis of a sanitized error
//! - [`IIssueTracker`] / [`IIssueTitleGenerator`] - Issue creation and optional title enrichment
//! - [`INotificationChannel`] - Severity-gated notifications

pub mod analyzer;
pub mod cache_store;
pub mod issue_tracker;
pub mod notification;
pub mod report_store;

pub use analyzer::{AnalysisRequest, IAiAnalyzer};
pub use cache_store::ICacheStore;
pub use issue_tracker::{IIssueTitleGenerator, IIssueTracker};
pub use notification::INotificationChannel;
pub use report_store::{IReportRepository, IReportStore, ReportField, ReportFilter, Reservation};
