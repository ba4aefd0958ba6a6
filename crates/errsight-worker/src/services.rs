//! Service wiring
//!
//! Builds every port implementation from a validated [`Config`]: the report
//! store (durable SQLite or ephemeral cache), the shared cache that backs
//! the quota gate, and the collaborator adapters selected by driver name.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use errsight_cache::{
    CacheReportStore, DatabasePool, InMemoryCacheStore, SqliteCacheStore, SqliteReportRepository,
};
use errsight_core::config::Config;
use errsight_core::ports::{
    IAiAnalyzer, ICacheStore, IIssueTitleGenerator, IIssueTracker, INotificationChannel,
    IReportRepository, IReportStore,
};
use errsight_core::usecases::{
    AnalyzeErrorUseCase, CleanupReportsUseCase, QuotaGate, ReconcileStaleReportsUseCase,
};
use errsight_providers::{
    GeminiAnalyzer, GeminiClient, GeminiIssueTitleGenerator, GithubIssueTracker, NullAnalyzer,
    NullIssueTitleGenerator, NullIssueTracker, NullNotificationChannel, SlackNotificationChannel,
};

use crate::ingest::{ErrorIngestor, IngestFilter};
use crate::queue::{PoolSummary, WorkerPool, WorkerSettings};
use crate::sweeper::CacheSweeper;

/// Fully wired pipeline
pub struct Services {
    pub config: Config,
    pub store: Arc<dyn IReportStore + Send + Sync>,
    /// Present only when reports are stored durably
    pub repository: Option<Arc<dyn IReportRepository + Send + Sync>>,
    pub cache: Arc<dyn ICacheStore + Send + Sync>,
    pub quota: Arc<QuotaGate>,
    pub use_case: Arc<AnalyzeErrorUseCase>,
}

impl Services {
    /// Validates `config` and builds every adapter it selects
    pub async fn from_config(config: Config) -> Result<Self> {
        let errors = config.validate();
        if !errors.is_empty() {
            let joined = errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; ");
            anyhow::bail!("Invalid configuration: {}", joined);
        }

        let report_pool = if config.storage.driver == "database" {
            Some(
                DatabasePool::new(&config.storage.database_path)
                    .await
                    .context("Failed to open report database")?,
            )
        } else {
            None
        };

        let cache: Arc<dyn ICacheStore + Send + Sync> = match config.cache.driver.as_str() {
            "memory" => Arc::new(InMemoryCacheStore::new()),
            _ => {
                let pool = match &report_pool {
                    Some(pool) if config.cache.path == config.storage.database_path => pool.clone(),
                    _ => DatabasePool::new(&config.cache.path)
                        .await
                        .context("Failed to open cache database")?,
                };
                Arc::new(SqliteCacheStore::new(pool.pool().clone()))
            }
        };

        let (store, repository) = match report_pool {
            Some(pool) => {
                let repo = Arc::new(SqliteReportRepository::new(pool.pool().clone()));
                (
                    repo.clone() as Arc<dyn IReportStore + Send + Sync>,
                    Some(repo as Arc<dyn IReportRepository + Send + Sync>),
                )
            }
            None => (
                Arc::new(CacheReportStore::new(
                    Arc::clone(&cache),
                    config.analysis.dedupe_window_minutes,
                )) as Arc<dyn IReportStore + Send + Sync>,
                None,
            ),
        };

        let quota = Arc::new(
            QuotaGate::new(Arc::clone(&cache), config.analysis.daily_limit).with_lock_timing(
                Duration::from_secs(config.quota.lock_ttl_seconds),
                Duration::from_secs(config.quota.lock_wait_seconds),
            ),
        );

        let use_case = Arc::new(AnalyzeErrorUseCase::new(
            Arc::clone(&store),
            Arc::clone(&quota),
            analyzer(&config),
            notifier(&config),
            issue_tracker(&config, &quota),
            config.analysis.dedupe_window_minutes,
        ));

        info!(
            storage = %config.storage.driver,
            cache = %config.cache.driver,
            analyzer = %config.analyzer.driver,
            issue_tracker = %config.issue_tracker.driver,
            notification = %config.notification.driver,
            daily_limit = config.analysis.daily_limit,
            "Services initialized"
        );

        Ok(Self {
            config,
            store,
            repository,
            cache,
            quota,
            use_case,
        })
    }

    pub fn is_durable(&self) -> bool {
        self.store.is_durable()
    }

    pub fn ingest_filter(&self) -> IngestFilter {
        IngestFilter::from_config(&self.config.analysis)
    }

    pub fn worker_settings(&self) -> WorkerSettings {
        WorkerSettings::from_config(&self.config.worker)
    }

    /// Retention sweep; `None` in ephemeral storage mode
    pub fn cleanup(&self) -> Option<CleanupReportsUseCase> {
        self.repository
            .as_ref()
            .map(|repo| CleanupReportsUseCase::new(Arc::clone(repo)))
    }

    /// Stale-reservation sweep; `None` in ephemeral storage mode
    pub fn reconcile(&self) -> Option<ReconcileStaleReportsUseCase> {
        self.repository.as_ref().map(|repo| {
            ReconcileStaleReportsUseCase::new(Arc::clone(repo), Arc::clone(&self.store))
        })
    }

    /// Sweeper over the shared cache at `cache.purge_interval_seconds`
    pub fn cache_sweeper(&self) -> CacheSweeper {
        CacheSweeper::new(
            Arc::clone(&self.cache),
            Duration::from_secs(self.config.cache.purge_interval_seconds),
        )
    }

    /// Starts the worker pool and returns an ingestor feeding it
    ///
    /// A cache sweeper runs alongside the pool and stops when the pool
    /// does, whether the queue closed or `shutdown` was cancelled.
    pub fn start_workers(
        &self,
        shutdown: CancellationToken,
    ) -> (ErrorIngestor, JoinHandle<PoolSummary>) {
        let stop_sweeper = shutdown.child_token();
        let sweeper = self.cache_sweeper().spawn(stop_sweeper.clone());
        let (dispatcher, pool) =
            WorkerPool::start(Arc::clone(&self.use_case), self.worker_settings(), shutdown);

        let handle = tokio::spawn(async move {
            let summary = match pool.await {
                Ok(summary) => summary,
                Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
                Err(e) => {
                    warn!(error = %e, "Worker pool task cancelled");
                    PoolSummary::default()
                }
            };
            stop_sweeper.cancel();
            if let Err(e) = sweeper.await {
                warn!(error = %e, "Cache sweeper task failed");
            }
            summary
        });
        (ErrorIngestor::new(self.ingest_filter(), dispatcher), handle)
    }
}

fn gemini_client(config: &Config, model: &str) -> Option<GeminiClient> {
    let gemini = &config.analyzer.gemini;
    let api_key = gemini.api_key.as_deref().filter(|k| !k.trim().is_empty())?;
    Some(
        GeminiClient::with_base_url(api_key, model, &gemini.base_url)
            .with_generation(gemini.temperature, gemini.max_output_tokens)
            .with_timeout(Duration::from_secs(gemini.timeout_seconds)),
    )
}

fn analyzer(config: &Config) -> Arc<dyn IAiAnalyzer + Send + Sync> {
    if config.analyzer.driver == "gemini" {
        if let Some(client) = gemini_client(config, &config.analyzer.gemini.model) {
            return Arc::new(GeminiAnalyzer::new(client));
        }
    }
    Arc::new(NullAnalyzer)
}

fn notifier(config: &Config) -> Arc<dyn INotificationChannel + Send + Sync> {
    match config.notification.driver.as_str() {
        "slack" => Arc::new(SlackNotificationChannel::from_config(&config.notification.slack)),
        _ => Arc::new(NullNotificationChannel),
    }
}

fn issue_tracker(config: &Config, quota: &Arc<QuotaGate>) -> Arc<dyn IIssueTracker + Send + Sync> {
    if config.issue_tracker.driver != "github" {
        return Arc::new(NullIssueTracker);
    }

    let github = &config.issue_tracker.github;
    let title_generator: Arc<dyn IIssueTitleGenerator + Send + Sync> = if github.ai_title.enabled {
        match gemini_client(config, &github.ai_title.model) {
            Some(client) => Arc::new(GeminiIssueTitleGenerator::new(client, Arc::clone(quota))),
            None => {
                tracing::warn!("AI issue titles enabled without a Gemini API key, using rule-based titles");
                Arc::new(NullIssueTitleGenerator)
            }
        }
    } else {
        Arc::new(NullIssueTitleGenerator)
    };

    Arc::new(GithubIssueTracker::from_config(github, title_generator))
}
