//! Fakes shared by the worker integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use errsight_cache::{DatabasePool, InMemoryCacheStore, SqliteReportRepository};
use errsight_core::domain::{AnalysisResult, EnrichmentError, ErrorEvent, ErrorReport, Severity};
use errsight_core::ports::{AnalysisRequest, IAiAnalyzer, IReportStore, ReportField, Reservation};
use errsight_core::usecases::{AnalyzeErrorUseCase, QuotaGate};
use errsight_providers::{NullIssueTracker, NullNotificationChannel};
use errsight_worker::WorkerSettings;

/// Analyzer that counts calls and optionally sleeps first
pub struct CountingAnalyzer {
    pub calls: AtomicU32,
    delay: Duration,
}

impl CountingAnalyzer {
    pub fn new() -> Arc<Self> {
        Self::slow(Duration::ZERO)
    }

    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicU32::new(0),
            delay,
        })
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl IAiAnalyzer for CountingAnalyzer {
    async fn analyze(&self, _request: AnalysisRequest<'_>) -> Result<AnalysisResult, EnrichmentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(AnalysisResult {
            severity: Severity::High,
            category: "database".into(),
            root_cause: "connection pool exhausted".into(),
            ..AnalysisResult::default()
        })
    }
}

/// Durable store whose first `failures` reservations fail
pub struct FlakyStore {
    inner: Arc<SqliteReportRepository>,
    failures_left: AtomicU32,
    pub reserve_calls: AtomicU32,
}

impl FlakyStore {
    pub fn new(inner: Arc<SqliteReportRepository>, failures: u32) -> Arc<Self> {
        Arc::new(Self {
            inner,
            failures_left: AtomicU32::new(failures),
            reserve_calls: AtomicU32::new(0),
        })
    }

    pub fn reserve_calls(&self) -> u32 {
        self.reserve_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl IReportStore for FlakyStore {
    async fn reserve(&self, report: ErrorReport) -> anyhow::Result<Reservation> {
        self.reserve_calls.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            anyhow::bail!("database is locked");
        }
        self.inner.reserve(report).await
    }

    async fn update(&self, report: &ErrorReport, fields: &[ReportField]) -> anyhow::Result<()> {
        self.inner.update(report, fields).await
    }

    fn is_durable(&self) -> bool {
        true
    }
}

pub async fn repository() -> Arc<SqliteReportRepository> {
    let pool = DatabasePool::in_memory().await.expect("in-memory database");
    Arc::new(SqliteReportRepository::new(pool.pool().clone()))
}

pub fn quota(limit: u32) -> Arc<QuotaGate> {
    Arc::new(QuotaGate::new(Arc::new(InMemoryCacheStore::new()), limit))
}

pub fn use_case(
    store: Arc<dyn IReportStore + Send + Sync>,
    analyzer: Arc<dyn IAiAnalyzer + Send + Sync>,
    quota: Arc<QuotaGate>,
) -> Arc<AnalyzeErrorUseCase> {
    Arc::new(AnalyzeErrorUseCase::new(
        store,
        quota,
        analyzer,
        Arc::new(NullNotificationChannel),
        Arc::new(NullIssueTracker),
        5,
    ))
}

/// Fast settings for tests: millisecond backoff, short timeout
pub fn settings(max_attempts: u32, timeout: Duration) -> WorkerSettings {
    WorkerSettings {
        concurrency: 4,
        queue_capacity: 64,
        max_attempts,
        backoff: vec![Duration::from_millis(10), Duration::from_millis(20)],
        timeout,
    }
}

pub fn event(line: u32) -> ErrorEvent {
    ErrorEvent::new(
        "App\\Exceptions\\PoolExhaustedException",
        "too many connections",
        "app/Db.php",
        line,
    )
    .with_trace("#0 app/Db.php(12): connect()")
    .with_context("environment", "production")
    .with_context("user_email", "jane@example.com")
}
