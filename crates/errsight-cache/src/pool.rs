//! SQLite connection pool
//!
//! One pool type serves both the report database and the shared cache
//! database. File-backed pools use WAL mode and a busy timeout so several
//! worker processes can share the same file; in-memory pools exist for tests.

use std::path::Path;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

use crate::CacheError;

/// Time a writer waits on a locked database before failing
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Connections per file-backed pool
const MAX_CONNECTIONS: u32 = 5;

/// Pool of SQLite connections with the errsight schema applied
#[derive(Clone)]
pub struct DatabasePool {
    pool: SqlitePool,
}

impl DatabasePool {
    /// Opens (creating if needed) the database at `db_path` and migrates it
    ///
    /// # Errors
    ///
    /// Returns `CacheError::ConnectionFailed` if the directory or connection
    /// cannot be created, or `CacheError::MigrationFailed` if the schema
    /// cannot be applied.
    pub async fn new(db_path: &Path) -> Result<Self, CacheError> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                CacheError::ConnectionFailed(format!(
                    "Cannot create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(options)
            .await
            .map_err(|e| {
                CacheError::ConnectionFailed(format!("{}: {}", db_path.display(), e))
            })?;

        migrate(&pool).await?;
        tracing::info!(path = %db_path.display(), "Database opened");

        Ok(Self { pool })
    }

    /// In-memory database on a single connection
    ///
    /// SQLite keeps an in-memory database per connection, so the pool is
    /// capped at one connection to keep every query on the same data.
    pub async fn in_memory() -> Result<Self, CacheError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| CacheError::ConnectionFailed(format!("in-memory database: {}", e)))?;

        migrate(&pool).await?;
        tracing::debug!("In-memory database opened");

        Ok(Self { pool })
    }

    /// Returns a reference to the underlying SQLite connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

async fn migrate(pool: &SqlitePool) -> Result<(), CacheError> {
    sqlx::raw_sql(include_str!("migrations/20260131_initial.sql"))
        .execute(pool)
        .await
        .map_err(|e| CacheError::MigrationFailed(e.to_string()))?;
    Ok(())
}
