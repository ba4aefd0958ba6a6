//! Worker pool behavior: dedupe under concurrency, retry policy, timeouts,
//! quota exhaustion and shutdown

mod common;

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use errsight_core::domain::Severity;
use errsight_core::ports::{IReportRepository, IReportStore, ReportFilter};
use errsight_core::usecases::{ReconcileStaleReportsUseCase, STALE_RESERVATION_KIND};
use errsight_worker::WorkerPool;

use common::{CountingAnalyzer, FlakyStore};

#[tokio::test]
async fn test_duplicate_jobs_analyze_once() {
    let repo = common::repository().await;
    let analyzer = CountingAnalyzer::new();
    let use_case = common::use_case(repo.clone(), analyzer.clone(), common::quota(100));

    let (dispatcher, handle) = WorkerPool::start(
        use_case,
        common::settings(3, Duration::from_secs(5)),
        CancellationToken::new(),
    );

    let event = common::event(10);
    for _ in 0..8 {
        dispatcher.dispatch(event.clone()).await.unwrap();
    }
    drop(dispatcher);
    let summary = handle.await.unwrap();

    assert_eq!(summary.analyzed, 1);
    assert_eq!(summary.skipped, 7);
    assert_eq!(analyzer.calls(), 1);

    let reports = repo.recent(&ReportFilter::default()).await.unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].severity(), Severity::High);
    assert_eq!(reports[0].context().get("user_email"), None);
}

#[tokio::test]
async fn test_distinct_jobs_all_analyzed() {
    let repo = common::repository().await;
    let analyzer = CountingAnalyzer::new();
    let use_case = common::use_case(repo.clone(), analyzer.clone(), common::quota(100));

    let (dispatcher, handle) = WorkerPool::start(
        use_case,
        common::settings(3, Duration::from_secs(5)),
        CancellationToken::new(),
    );
    for line in 1..=12 {
        dispatcher.dispatch(common::event(line)).await.unwrap();
    }
    drop(dispatcher);
    let summary = handle.await.unwrap();

    assert_eq!(summary.analyzed, 12);
    assert_eq!(summary.processed(), 12);
    assert_eq!(analyzer.calls(), 12);
}

#[tokio::test]
async fn test_infrastructure_failure_is_retried() {
    let store = FlakyStore::new(common::repository().await, 2);
    let analyzer = CountingAnalyzer::new();
    let use_case = common::use_case(store.clone(), analyzer.clone(), common::quota(100));

    let (dispatcher, handle) = WorkerPool::start(
        use_case,
        common::settings(3, Duration::from_secs(5)),
        CancellationToken::new(),
    );
    dispatcher.dispatch(common::event(1)).await.unwrap();
    drop(dispatcher);
    let summary = handle.await.unwrap();

    assert_eq!(summary.analyzed, 1);
    assert_eq!(summary.retries, 2);
    assert_eq!(store.reserve_calls(), 3);
    assert_eq!(analyzer.calls(), 1);
}

#[tokio::test]
async fn test_gives_up_after_max_attempts() {
    let store = FlakyStore::new(common::repository().await, u32::MAX);
    let analyzer = CountingAnalyzer::new();
    let use_case = common::use_case(store.clone(), analyzer.clone(), common::quota(100));

    let (dispatcher, handle) = WorkerPool::start(
        use_case,
        common::settings(3, Duration::from_secs(5)),
        CancellationToken::new(),
    );
    dispatcher.dispatch(common::event(1)).await.unwrap();
    drop(dispatcher);
    let summary = handle.await.unwrap();

    assert_eq!(summary.abandoned, 1);
    assert_eq!(summary.retries, 2);
    assert_eq!(store.reserve_calls(), 3);
    assert_eq!(analyzer.calls(), 0);
}

#[tokio::test]
async fn test_timed_out_job_is_not_analyzed_twice() {
    let repo = common::repository().await;
    let analyzer = CountingAnalyzer::slow(Duration::from_millis(500));
    let use_case = common::use_case(repo.clone(), analyzer.clone(), common::quota(100));

    let (dispatcher, handle) = WorkerPool::start(
        use_case,
        common::settings(2, Duration::from_millis(100)),
        CancellationToken::new(),
    );
    dispatcher.dispatch(common::event(1)).await.unwrap();
    drop(dispatcher);
    let summary = handle.await.unwrap();

    // The retry meets the first attempt's reservation.
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.retries, 1);
    assert_eq!(analyzer.calls(), 1);

    let reports = repo.recent(&ReportFilter::default()).await.unwrap();
    assert_eq!(reports[0].analysis().status(), "processing");

    let reconcile = ReconcileStaleReportsUseCase::new(
        repo.clone() as Arc<dyn IReportRepository + Send + Sync>,
        repo.clone() as Arc<dyn IReportStore + Send + Sync>,
    );
    let swept = reconcile
        .execute_at(
            chrono::Duration::minutes(10),
            false,
            chrono::Utc::now() + chrono::Duration::minutes(11),
        )
        .await
        .unwrap();
    assert_eq!(swept.failed, 1);

    let report = repo.get(reports[0].id().unwrap()).await.unwrap().unwrap();
    assert_eq!(report.analysis().failure().unwrap().kind, STALE_RESERVATION_KIND);
}

#[tokio::test]
async fn test_quota_exhaustion_fails_without_analysis() {
    let repo = common::repository().await;
    let analyzer = CountingAnalyzer::new();
    let use_case = common::use_case(repo.clone(), analyzer.clone(), common::quota(2));

    let (dispatcher, handle) = WorkerPool::start(
        use_case,
        common::settings(3, Duration::from_secs(5)),
        CancellationToken::new(),
    );
    for line in 1..=5 {
        dispatcher.dispatch(common::event(line)).await.unwrap();
    }
    drop(dispatcher);
    let summary = handle.await.unwrap();

    assert_eq!(summary.analyzed, 2);
    assert_eq!(summary.failed, 3);
    assert_eq!(analyzer.calls(), 2);

    let reports = repo.recent(&ReportFilter::default()).await.unwrap();
    let exhausted = reports
        .iter()
        .filter_map(|r| r.analysis().failure())
        .filter(|f| f.kind == "quota_exhausted")
        .count();
    assert_eq!(exhausted, 3);
    assert!(reports
        .iter()
        .filter(|r| r.analysis().failure().is_some())
        .all(|r| r.severity() == Severity::Medium && r.category() == "other"));
}

#[tokio::test]
async fn test_cancellation_stops_idle_workers() {
    let repo = common::repository().await;
    let use_case = common::use_case(repo, CountingAnalyzer::new(), common::quota(100));
    let shutdown = CancellationToken::new();

    let (dispatcher, handle) = WorkerPool::start(
        use_case,
        common::settings(3, Duration::from_secs(5)),
        shutdown.clone(),
    );

    shutdown.cancel();
    let summary = tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("pool should stop on cancellation")
        .unwrap();

    assert_eq!(summary.processed(), 0);
    assert!(dispatcher.is_closed());
}
