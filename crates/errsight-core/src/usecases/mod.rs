//! Use cases (interactors) for errsight
//!
//! This module contains the application use cases that orchestrate
//! domain entities and port interfaces. Use cases are thin coordinators
//! that delegate business rules to domain methods and I/O to ports.
//!
//! ## Use Cases
//!
//! - [`AnalyzeErrorUseCase`] - The enrichment job: sanitize, reserve, analyze, notify, link issue
//! - [`QuotaGate`] - Daily AI call budget shared by every worker and process
//! - [`CleanupReportsUseCase`] - Retention sweep keyed on report age
//! - [`ReconcileStaleReportsUseCase`] - Fails reservations abandoned at `processing`

pub mod analyze_error;
pub mod cleanup_reports;
pub mod quota;
pub mod reconcile_stale;

pub use analyze_error::{AnalyzeErrorUseCase, JobOutcome};
pub use cleanup_reports::{CleanupReportsUseCase, CleanupSummary};
pub use quota::QuotaGate;
pub use reconcile_stale::{ReconcileStaleReportsUseCase, ReconcileSummary, STALE_RESERVATION_KIND};
