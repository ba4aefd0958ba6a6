//! Job queue and worker pool
//!
//! ```text
//! Dispatcher ──→ mpsc (bounded) ──→ worker 1..N ──→ AnalyzeErrorUseCase
//!                                       │
//!                               timeout + backoff retry
//! ```
//!
//! Workers share one receiver. A job is retried only when the use case
//! returns an error or exceeds the attempt timeout; enrichment failures
//! are terminal outcomes and never retried. Retries are safe because a
//! repeated job meets its own reservation and is skipped.
//!
//! Dropping every [`Dispatcher`] closes the queue: workers finish what is
//! queued and the pool handle resolves with a [`PoolSummary`]. Cancelling
//! the token stops workers from taking further jobs.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use errsight_core::config::WorkerConfig;
use errsight_core::domain::ErrorEvent;
use errsight_core::usecases::{AnalyzeErrorUseCase, JobOutcome};

use crate::DispatchError;

// ============================================================================
// Settings
// ============================================================================

/// Runtime settings for the worker pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerSettings {
    /// Number of concurrent workers
    pub concurrency: usize,
    /// Jobs the queue holds before dispatch blocks or fails
    pub queue_capacity: usize,
    /// Attempts per job, including the first
    pub max_attempts: u32,
    /// Delay before each retry; the last value repeats
    pub backoff: Vec<Duration>,
    /// Upper bound on a single attempt
    pub timeout: Duration,
}

impl WorkerSettings {
    pub fn from_config(config: &WorkerConfig) -> Self {
        Self {
            concurrency: config.concurrency.max(1),
            queue_capacity: config.queue_capacity.max(1),
            max_attempts: config.max_attempts.max(1),
            backoff: config
                .backoff_seconds
                .iter()
                .map(|s| Duration::from_secs(*s))
                .collect(),
            timeout: Duration::from_secs(config.timeout_seconds),
        }
    }

    /// Delay after failed attempt number `attempt` (1-based)
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let index = attempt.saturating_sub(1) as usize;
        self.backoff
            .get(index)
            .or_else(|| self.backoff.last())
            .copied()
            .unwrap_or(Duration::ZERO)
    }
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self::from_config(&WorkerConfig::default())
    }
}

// ============================================================================
// Dispatcher
// ============================================================================

/// Sending side of the job queue
#[derive(Debug, Clone)]
pub struct Dispatcher {
    tx: mpsc::Sender<ErrorEvent>,
}

impl Dispatcher {
    /// Enqueues `event`, waiting for a free slot
    pub async fn dispatch(&self, event: ErrorEvent) -> Result<(), DispatchError> {
        self.tx.send(event).await.map_err(|_| DispatchError::Closed)
    }

    /// Enqueues `event` without waiting
    pub fn try_dispatch(&self, event: ErrorEvent) -> Result<(), DispatchError> {
        self.tx.try_send(event).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => DispatchError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => DispatchError::Closed,
        })
    }

    /// Free slots in the queue
    pub fn capacity(&self) -> usize {
        self.tx.capacity()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

// ============================================================================
// Pool
// ============================================================================

/// Job counts reported when the pool stops
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PoolSummary {
    pub analyzed: u64,
    pub failed: u64,
    pub skipped: u64,
    /// Jobs that exhausted their attempts or were interrupted by shutdown
    pub abandoned: u64,
    /// Attempts beyond the first, across all jobs
    pub retries: u64,
}

impl PoolSummary {
    pub fn processed(&self) -> u64 {
        self.analyzed + self.failed + self.skipped + self.abandoned
    }

    fn merge(&mut self, other: PoolSummary) {
        self.analyzed += other.analyzed;
        self.failed += other.failed;
        self.skipped += other.skipped;
        self.abandoned += other.abandoned;
        self.retries += other.retries;
    }
}

enum JobResult {
    Finished(JobOutcome),
    Abandoned,
}

/// Pool of workers running [`AnalyzeErrorUseCase`] jobs
pub struct WorkerPool;

impl WorkerPool {
    /// Spawns the workers and returns the dispatcher plus a handle that
    /// resolves once every worker has stopped
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(
        use_case: Arc<AnalyzeErrorUseCase>,
        settings: WorkerSettings,
        shutdown: CancellationToken,
    ) -> (Dispatcher, JoinHandle<PoolSummary>) {
        let (tx, rx) = mpsc::channel(settings.queue_capacity.max(1));
        let rx = Arc::new(Mutex::new(rx));
        let settings = Arc::new(settings);

        info!(
            concurrency = settings.concurrency,
            queue_capacity = settings.queue_capacity,
            max_attempts = settings.max_attempts,
            timeout_secs = settings.timeout.as_secs(),
            "Starting worker pool"
        );

        let mut workers = JoinSet::new();
        for worker in 0..settings.concurrency.max(1) {
            workers.spawn(run_worker(
                worker,
                Arc::clone(&rx),
                Arc::clone(&use_case),
                Arc::clone(&settings),
                shutdown.clone(),
            ));
        }

        let handle = tokio::spawn(async move {
            let mut summary = PoolSummary::default();
            while let Some(joined) = workers.join_next().await {
                match joined {
                    Ok(worker_summary) => summary.merge(worker_summary),
                    Err(e) => error!(error = %e, "Worker task panicked"),
                }
            }
            info!(
                analyzed = summary.analyzed,
                failed = summary.failed,
                skipped = summary.skipped,
                abandoned = summary.abandoned,
                retries = summary.retries,
                "Worker pool stopped"
            );
            summary
        });

        (Dispatcher { tx }, handle)
    }
}

async fn run_worker(
    worker: usize,
    rx: Arc<Mutex<mpsc::Receiver<ErrorEvent>>>,
    use_case: Arc<AnalyzeErrorUseCase>,
    settings: Arc<WorkerSettings>,
    shutdown: CancellationToken,
) -> PoolSummary {
    let mut summary = PoolSummary::default();
    debug!(worker, "Worker started");

    loop {
        let next = tokio::select! {
            biased;
            _ = shutdown.cancelled() => {
                debug!(worker, "Shutdown requested, worker stopping");
                break;
            }
            event = async { rx.lock().await.recv().await } => event,
        };

        let Some(event) = next else {
            debug!(worker, "Queue closed, worker stopping");
            break;
        };

        let (result, attempts) = process(worker, &event, &use_case, &settings, &shutdown).await;
        summary.retries += u64::from(attempts.saturating_sub(1));
        match result {
            JobResult::Finished(JobOutcome::Analyzed(_)) => summary.analyzed += 1,
            JobResult::Finished(JobOutcome::Failed(_)) => summary.failed += 1,
            JobResult::Finished(JobOutcome::Skipped) => summary.skipped += 1,
            JobResult::Abandoned => summary.abandoned += 1,
        }
    }

    summary
}

/// Runs one job to a terminal result, returning it with the attempts used
async fn process(
    worker: usize,
    event: &ErrorEvent,
    use_case: &AnalyzeErrorUseCase,
    settings: &WorkerSettings,
    shutdown: &CancellationToken,
) -> (JobResult, u32) {
    let max_attempts = settings.max_attempts.max(1);

    for attempt in 1..=max_attempts {
        match tokio::time::timeout(settings.timeout, use_case.execute(event)).await {
            Ok(Ok(outcome)) => {
                debug!(
                    worker,
                    attempt,
                    outcome = outcome.label(),
                    exception_type = %event.exception_type,
                    "Job finished"
                );
                return (JobResult::Finished(outcome), attempt);
            }
            Ok(Err(e)) => warn!(
                worker,
                attempt,
                max_attempts,
                error = %format!("{e:#}"),
                exception_type = %event.exception_type,
                "Job attempt failed"
            ),
            Err(_) => warn!(
                worker,
                attempt,
                max_attempts,
                timeout_secs = settings.timeout.as_secs_f64(),
                exception_type = %event.exception_type,
                "Job attempt timed out"
            ),
        }

        if attempt < max_attempts {
            let delay = settings.backoff_for(attempt);
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.cancelled() => {
                    warn!(worker, attempt, "Shutdown during retry backoff, job abandoned");
                    return (JobResult::Abandoned, attempt);
                }
            }
        }
    }

    error!(
        worker,
        attempts = max_attempts,
        exception_type = %event.exception_type,
        location = %format!("{}:{}", event.file, event.line),
        "Job permanently failed"
    );
    (JobResult::Abandoned, max_attempts)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(backoff: &[u64]) -> WorkerSettings {
        WorkerSettings {
            backoff: backoff.iter().map(|s| Duration::from_secs(*s)).collect(),
            ..WorkerSettings::default()
        }
    }

    #[test]
    fn test_backoff_repeats_last_value() {
        let s = settings(&[5, 10, 20]);
        assert_eq!(s.backoff_for(1), Duration::from_secs(5));
        assert_eq!(s.backoff_for(2), Duration::from_secs(10));
        assert_eq!(s.backoff_for(3), Duration::from_secs(20));
        assert_eq!(s.backoff_for(7), Duration::from_secs(20));
    }

    #[test]
    fn test_empty_backoff_retries_immediately() {
        assert_eq!(settings(&[]).backoff_for(1), Duration::ZERO);
    }

    #[test]
    fn test_from_config_defaults() {
        let s = WorkerSettings::default();
        assert_eq!(s.concurrency, 4);
        assert_eq!(s.queue_capacity, 1024);
        assert_eq!(s.max_attempts, 3);
        assert_eq!(s.timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_from_config_clamps_zero_values() {
        let config = WorkerConfig {
            concurrency: 0,
            queue_capacity: 0,
            max_attempts: 0,
            ..WorkerConfig::default()
        };
        let s = WorkerSettings::from_config(&config);
        assert_eq!((s.concurrency, s.queue_capacity, s.max_attempts), (1, 1, 1));
    }

    #[tokio::test]
    async fn test_try_dispatch_reports_full_and_closed() {
        let (tx, rx) = mpsc::channel(1);
        let dispatcher = Dispatcher { tx };
        let event = || ErrorEvent::new("E", "m", "f.rs", 1);

        dispatcher.try_dispatch(event()).unwrap();
        assert_eq!(dispatcher.try_dispatch(event()), Err(DispatchError::QueueFull));

        drop(rx);
        assert_eq!(dispatcher.try_dispatch(event()), Err(DispatchError::Closed));
        assert!(dispatcher.is_closed());
    }
}
