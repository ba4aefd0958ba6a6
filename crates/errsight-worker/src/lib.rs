//! errsight Worker - Inbound side of the enrichment pipeline
//!
//! Provides:
//! - An ingestion filter that drops events from disabled environments or
//!   excluded exception types
//! - A bounded job queue drained by a pool of async workers with
//!   per-attempt timeout and retry backoff
//! - Configuration-driven wiring of storage backends and collaborators
//! - A periodic purge of expired cache entries while the pool runs
//!
//! ## Modules
//!
//! - [`ingest`] - `ErrorIngestor`, the entry point for host applications
//! - [`queue`] - `Dispatcher` and `WorkerPool`
//! - [`services`] - `Services::from_config`
//! - [`sweeper`] - `CacheSweeper`

pub mod ingest;
pub mod queue;
pub mod services;
pub mod sweeper;

use thiserror::Error;

pub use ingest::{ErrorIngestor, FilterReason, IngestFilter, IngestOutcome};
pub use queue::{Dispatcher, PoolSummary, WorkerPool, WorkerSettings};
pub use services::Services;
pub use sweeper::CacheSweeper;

/// Errors that can occur when handing a job to the worker pool
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// The bounded queue has no free slot
    #[error("Job queue is full")]
    QueueFull,

    /// The worker pool has shut down
    #[error("Job queue is closed")]
    Closed,
}
