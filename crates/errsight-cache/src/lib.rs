//! errsight Cache - Report storage and shared key-value state
//!
//! SQLite-based and in-process adapters for:
//! - Durable error reports with a `(fingerprint, dedupe_window)` uniqueness constraint
//! - Expiring key-value entries and named locks (quota counter, ephemeral dedupe keys)
//!
//! ## Architecture
//!
//! This crate implements the storage ports from `errsight-core`. It is a
//! driven (secondary) adapter in the hexagonal architecture.
//!
//! ## Key Components
//!
//! - [`DatabasePool`] - Connection pool with migration support
//! - [`SqliteReportRepository`] - Durable `IReportStore` + `IReportRepository`
//! - [`SqliteCacheStore`] - `ICacheStore` shared across processes through one database file
//! - [`InMemoryCacheStore`] - `ICacheStore` for a single process
//! - [`CacheReportStore`] - Ephemeral `IReportStore` on top of any `ICacheStore`
//! - [`CacheError`] - Error types for storage operations
//!
//! ## Usage
//!
//! ```no_run
//! use std::path::Path;
//! use errsight_cache::{DatabasePool, SqliteReportRepository};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let pool = DatabasePool::new(Path::new("/var/lib/errsight/reports.db")).await?;
//! let repo = SqliteReportRepository::new(pool.pool().clone());
//! // Use repo as IReportStore / IReportRepository...
//! # Ok(())
//! # }
//! ```

pub mod ephemeral;
pub mod memory;
pub mod pool;
pub mod reports;
pub mod sqlite_cache;

pub use ephemeral::CacheReportStore;
pub use memory::InMemoryCacheStore;
pub use pool::DatabasePool;
pub use reports::SqliteReportRepository;
pub use sqlite_cache::SqliteCacheStore;

/// Errors that can occur during storage operations
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Failed to establish a database connection
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// A database query failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Schema migration failed
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Serialization or deserialization of domain types failed
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// An update targeted a report that was never stored
    #[error("Report has no identifier")]
    MissingId,
}

impl From<sqlx::Error> for CacheError {
    fn from(e: sqlx::Error) -> Self {
        CacheError::QueryFailed(e.to_string())
    }
}
