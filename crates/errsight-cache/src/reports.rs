//! SQLite implementation of the report storage ports
//!
//! ## Type Mapping
//!
//! | Domain Type     | SQL Type | Strategy                                         |
//! |-----------------|----------|--------------------------------------------------|
//! | ReportId        | INTEGER  | rowid assigned on insert                         |
//! | Fingerprint     | TEXT     | hex digest                                       |
//! | DedupeWindow    | INTEGER  | bucket number                                    |
//! | Severity        | TEXT     | lowercase name                                   |
//! | Analysis        | TEXT     | JSON object with a `status` key                  |
//! | ErrorContext    | TEXT     | JSON object                                      |
//! | DateTime<Utc>   | TEXT     | RFC 3339, microseconds, `Z` suffix (sortable)    |
//!
//! Reservation relies on the `UNIQUE (fingerprint, dedupe_window)`
//! constraint: a unique violation on insert is a duplicate, every other
//! failure is an infrastructure error. `created_at` records the reservation
//! instant and is what the stale-reservation sweep ages reports by.

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use errsight_core::domain::{ErrorReport, ReportId};
use errsight_core::ports::{IReportRepository, IReportStore, ReportField, ReportFilter, Reservation};

use crate::CacheError;

/// Durable report storage backed by SQLite
pub struct SqliteReportRepository {
    pool: SqlitePool,
}

impl SqliteReportRepository {
    /// Creates a new repository instance with the given connection pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

// ============================================================================
// Helper functions for type conversion
// ============================================================================

/// Fixed-width timestamp so string comparison matches time order
fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn to_json_text<T: serde::Serialize>(value: &T, what: &str) -> Result<String, CacheError> {
    serde_json::to_string(value)
        .map_err(|e| CacheError::SerializationError(format!("Failed to serialize {}: {}", what, e)))
}

fn parse_json_text(text: &str, what: &str) -> Result<serde_json::Value, CacheError> {
    serde_json::from_str(text)
        .map_err(|e| CacheError::SerializationError(format!("Failed to parse {}: {}", what, e)))
}

/// Value bound for a single updatable column
fn field_value(report: &ErrorReport, field: ReportField) -> Result<Option<String>, CacheError> {
    Ok(match field {
        ReportField::Severity => Some(report.severity().to_string()),
        ReportField::Category => Some(report.category().to_string()),
        ReportField::Analysis => Some(to_json_text(report.analysis(), "analysis")?),
        ReportField::ResolvedAt => report.resolved_at().as_ref().map(format_datetime),
    })
}

// ============================================================================
// Row mapping
// ============================================================================

/// Reconstruct an ErrorReport from a database row
///
/// Goes through serde because the entity only exposes its fields through
/// constructors and lifecycle methods.
fn report_from_row(row: &SqliteRow) -> Result<ErrorReport, CacheError> {
    let id: i64 = row.try_get("id")?;
    let line: i64 = row.try_get("line")?;
    let analysis: String = row.try_get("analysis")?;
    let context: String = row.try_get("context")?;

    let value = serde_json::json!({
        "id": id,
        "exception_type": row.try_get::<String, _>("exception_type")?,
        "message": row.try_get::<String, _>("message")?,
        "file": row.try_get::<String, _>("file")?,
        "line": line,
        "fingerprint": row.try_get::<String, _>("fingerprint")?,
        "dedupe_window": row.try_get::<i64, _>("dedupe_window")?,
        "trace": row.try_get::<String, _>("trace")?,
        "severity": row.try_get::<String, _>("severity")?,
        "category": row.try_get::<String, _>("category")?,
        "analysis": parse_json_text(&analysis, "analysis")?,
        "context": parse_json_text(&context, "context")?,
        "occurred_at": row.try_get::<String, _>("occurred_at")?,
        "resolved_at": row.try_get::<Option<String>, _>("resolved_at")?,
        "created_at": row.try_get::<String, _>("created_at")?,
    });

    serde_json::from_value(value).map_err(|e| {
        CacheError::SerializationError(format!("Failed to rebuild report {}: {}", id, e))
    })
}

fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Database(db) if db.is_unique_violation())
}

// ============================================================================
// IReportStore implementation
// ============================================================================

#[async_trait::async_trait]
impl IReportStore for SqliteReportRepository {
    async fn reserve(&self, report: ErrorReport) -> anyhow::Result<Reservation> {
        let analysis = to_json_text(report.analysis(), "analysis")?;
        let context = to_json_text(report.context(), "context")?;

        let inserted = sqlx::query(
            "INSERT INTO error_reports \
             (exception_type, message, file, line, fingerprint, dedupe_window, trace, \
              severity, category, analysis, context, occurred_at, resolved_at, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(report.exception_type())
        .bind(report.message())
        .bind(report.file())
        .bind(i64::from(report.line()))
        .bind(report.fingerprint().as_str())
        .bind(report.dedupe_window().value())
        .bind(report.trace())
        .bind(report.severity().as_str())
        .bind(report.category())
        .bind(&analysis)
        .bind(&context)
        .bind(format_datetime(&report.occurred_at()))
        .bind(report.resolved_at().as_ref().map(format_datetime))
        .bind(format_datetime(&report.created_at()))
        .execute(&self.pool)
        .await;

        match inserted {
            Ok(result) => {
                let id = ReportId::new(result.last_insert_rowid());
                tracing::debug!(
                    report_id = %id,
                    fingerprint = %report.fingerprint(),
                    "Report reserved"
                );
                Ok(Reservation::Reserved(report.with_id(id)))
            }
            Err(e) if is_unique_violation(&e) => Ok(Reservation::Duplicate),
            Err(e) => Err(CacheError::from(e).into()),
        }
    }

    async fn update(&self, report: &ErrorReport, fields: &[ReportField]) -> anyhow::Result<()> {
        if fields.is_empty() {
            return Ok(());
        }
        let id = report.id().ok_or(CacheError::MissingId)?;

        let assignments: Vec<String> = fields
            .iter()
            .map(|f| format!("{} = ?", f.column()))
            .collect();
        let sql = format!(
            "UPDATE error_reports SET {} WHERE id = ?",
            assignments.join(", ")
        );

        let mut query = sqlx::query(&sql);
        for field in fields {
            query = query.bind(field_value(report, *field)?);
        }
        let result = query.bind(id.value()).execute(&self.pool).await?;

        if result.rows_affected() == 0 {
            tracing::warn!(report_id = %id, "Update matched no report");
        }
        tracing::trace!(report_id = %id, ?fields, "Report updated");
        Ok(())
    }

    fn is_durable(&self) -> bool {
        true
    }
}

// ============================================================================
// IReportRepository implementation
// ============================================================================

#[async_trait::async_trait]
impl IReportRepository for SqliteReportRepository {
    async fn get(&self, id: ReportId) -> anyhow::Result<Option<ErrorReport>> {
        let row = sqlx::query("SELECT * FROM error_reports WHERE id = ?")
            .bind(id.value())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(report_from_row(r)?)),
            None => Ok(None),
        }
    }

    async fn recent(&self, filter: &ReportFilter) -> anyhow::Result<Vec<ErrorReport>> {
        let mut sql = String::from("SELECT * FROM error_reports WHERE 1=1");
        if filter.severity.is_some() {
            sql.push_str(" AND severity = ?");
        }
        if filter.unresolved_only {
            sql.push_str(" AND resolved_at IS NULL");
        }
        sql.push_str(" ORDER BY occurred_at DESC, id DESC LIMIT ?");

        let mut query = sqlx::query(&sql);
        if let Some(severity) = filter.severity {
            query = query.bind(severity.as_str());
        }
        let rows = query
            .bind(i64::from(filter.limit))
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|r| report_from_row(r).map_err(anyhow::Error::from))
            .collect()
    }

    async fn count_older_than(&self, cutoff: DateTime<Utc>) -> anyhow::Result<u64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM error_reports WHERE occurred_at < ?")
                .bind(format_datetime(&cutoff))
                .fetch_one(&self.pool)
                .await?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> anyhow::Result<u64> {
        let result = sqlx::query("DELETE FROM error_reports WHERE occurred_at < ?")
            .bind(format_datetime(&cutoff))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn stale_processing(&self, cutoff: DateTime<Utc>) -> anyhow::Result<Vec<ErrorReport>> {
        let rows = sqlx::query(
            "SELECT * FROM error_reports \
             WHERE json_extract(analysis, '$.status') = 'processing' AND created_at < ? \
             ORDER BY created_at ASC",
        )
        .bind(format_datetime(&cutoff))
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|r| report_from_row(r).map_err(anyhow::Error::from))
            .collect()
    }
}
