//! Configuration module for errsight.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.
//! Every section is optional in the file; missing keys take their defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::Severity;

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for errsight.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub analyzer: AnalyzerConfig,
    pub issue_tracker: IssueTrackerConfig,
    pub notification: NotificationConfig,
    pub analysis: AnalysisConfig,
    pub storage: StorageConfig,
    pub cache: CacheConfig,
    pub quota: QuotaConfig,
    pub worker: WorkerConfig,
    pub logging: LoggingConfig,
}

/// AI analyzer selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// `null` or `gemini`.
    pub driver: String,
    pub gemini: GeminiConfig,
}

/// Gemini API settings shared by the analyzer and the title generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub base_url: String,
    /// Request timeout for analysis calls, in seconds.
    pub timeout_seconds: u64,
}

/// Issue tracker selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IssueTrackerConfig {
    /// `null` or `github`.
    pub driver: String,
    pub github: GithubConfig,
}

/// GitHub issue settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GithubConfig {
    pub token: Option<String>,
    /// `owner/name`.
    pub repository: Option<String>,
    pub labels: Vec<String>,
    pub assignees: Vec<String>,
    pub api_base: String,
    pub ai_title: AiTitleConfig,
}

/// AI-generated issue titles.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiTitleConfig {
    pub enabled: bool,
    pub model: String,
}

/// Notification channel selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// `null` or `slack`.
    pub driver: String,
    pub slack: SlackConfig,
}

/// Slack incoming-webhook settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SlackConfig {
    pub webhook: Option<String>,
    /// Minimum severity that triggers a message: `low`, `medium`, `high`, or `critical`.
    pub min_severity: String,
    pub channel: Option<String>,
    pub username: String,
    pub icon: String,
}

/// Pipeline behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Maximum AI calls per UTC day, shared by analysis and title generation.
    pub daily_limit: u32,
    /// Events whose `environment` context is not listed here are dropped.
    pub enabled_environments: Vec<String>,
    /// Exception types that are never analyzed (full or short name).
    pub excluded_exceptions: Vec<String>,
    pub dedupe_window_minutes: u32,
}

/// Report storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// `database` (durable, queryable) or `cache` (ephemeral).
    pub driver: String,
    pub database_path: PathBuf,
    /// Default retention for `errsight cleanup`.
    pub cleanup_days: u32,
    /// Reports at `processing` for longer than this are reconciled as failed.
    pub stale_after_minutes: u32,
}

/// Shared key-value store used for quota and ephemeral dedupe keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// `sqlite` (shared across processes) or `memory` (single process).
    pub driver: String,
    pub path: PathBuf,
    /// How often a running worker pool purges expired entries and locks.
    pub purge_interval_seconds: u64,
}

/// Quota lock timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuotaConfig {
    pub lock_ttl_seconds: u64,
    pub lock_wait_seconds: u64,
}

/// Job queue and retry policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub concurrency: usize,
    pub queue_capacity: usize,
    pub max_attempts: u32,
    /// Delay before each retry; the last value repeats.
    pub backoff_seconds: Vec<u64>,
    /// Hard limit for one attempt.
    pub timeout_seconds: u64,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

// ---------------------------------------------------------------------------
// Config::load()
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/errsight/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("errsight")
            .join("config.yaml")
    }
}

fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("~/.local/share"))
        .join("errsight")
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            driver: "null".into(),
            gemini: GeminiConfig::default(),
        }
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-2.5-flash".into(),
            temperature: 0.3,
            max_output_tokens: 8000,
            base_url: "https://generativelanguage.googleapis.com/v1beta".into(),
            timeout_seconds: 30,
        }
    }
}

impl Default for IssueTrackerConfig {
    fn default() -> Self {
        Self {
            driver: "null".into(),
            github: GithubConfig::default(),
        }
    }
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            token: None,
            repository: None,
            labels: vec!["bug".into(), "error-analysis".into()],
            assignees: Vec::new(),
            api_base: "https://api.github.com".into(),
            ai_title: AiTitleConfig::default(),
        }
    }
}

impl Default for AiTitleConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            model: "gemini-2.5-flash-lite".into(),
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            driver: "null".into(),
            slack: SlackConfig::default(),
        }
    }
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            webhook: None,
            min_severity: "high".into(),
            channel: None,
            username: "Error Analyzer".into(),
            icon: ":warning:".into(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            daily_limit: 100,
            enabled_environments: vec!["production".into()],
            excluded_exceptions: vec![
                "ValidationException".into(),
                "AuthenticationException".into(),
                "AuthorizationException".into(),
                "NotFoundHttpException".into(),
                "ModelNotFoundException".into(),
                "TokenMismatchException".into(),
            ],
            dedupe_window_minutes: 5,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            driver: "database".into(),
            database_path: data_dir().join("reports.db"),
            cleanup_days: 90,
            stale_after_minutes: 10,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            driver: "sqlite".into(),
            path: data_dir().join("cache.db"),
            purge_interval_seconds: 300,
        }
    }
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            lock_ttl_seconds: 5,
            lock_wait_seconds: 5,
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            queue_capacity: 1024,
            max_attempts: 3,
            backoff_seconds: vec![5, 10, 20],
            timeout_seconds: 60,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"analysis.daily_limit"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
const VALID_ANALYZER_DRIVERS: &[&str] = &["null", "gemini"];
const VALID_TRACKER_DRIVERS: &[&str] = &["null", "github"];
const VALID_NOTIFICATION_DRIVERS: &[&str] = &["null", "slack"];
const VALID_STORAGE_DRIVERS: &[&str] = &["database", "cache"];
const VALID_CACHE_DRIVERS: &[&str] = &["sqlite", "memory"];

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        let mut check = |ok: bool, field: &str, message: String| {
            if !ok {
                errors.push(ValidationError {
                    field: field.into(),
                    message,
                });
            }
        };

        // --- drivers ---
        check(
            VALID_ANALYZER_DRIVERS.contains(&self.analyzer.driver.as_str()),
            "analyzer.driver",
            format!("must be one of {:?}", VALID_ANALYZER_DRIVERS),
        );
        check(
            VALID_TRACKER_DRIVERS.contains(&self.issue_tracker.driver.as_str()),
            "issue_tracker.driver",
            format!("must be one of {:?}", VALID_TRACKER_DRIVERS),
        );
        check(
            VALID_NOTIFICATION_DRIVERS.contains(&self.notification.driver.as_str()),
            "notification.driver",
            format!("must be one of {:?}", VALID_NOTIFICATION_DRIVERS),
        );
        check(
            VALID_STORAGE_DRIVERS.contains(&self.storage.driver.as_str()),
            "storage.driver",
            format!("must be one of {:?}", VALID_STORAGE_DRIVERS),
        );
        check(
            VALID_CACHE_DRIVERS.contains(&self.cache.driver.as_str()),
            "cache.driver",
            format!("must be one of {:?}", VALID_CACHE_DRIVERS),
        );

        // --- analyzer ---
        if self.analyzer.driver == "gemini" {
            check(
                self.analyzer
                    .gemini
                    .api_key
                    .as_deref()
                    .is_some_and(|k| !k.trim().is_empty()),
                "analyzer.gemini.api_key",
                "is required when analyzer.driver is gemini".into(),
            );
        }
        check(
            (0.0..=2.0).contains(&self.analyzer.gemini.temperature),
            "analyzer.gemini.temperature",
            "must be between 0.0 and 2.0".into(),
        );
        check(
            self.analyzer.gemini.timeout_seconds > 0,
            "analyzer.gemini.timeout_seconds",
            "must be greater than 0".into(),
        );

        // --- notification ---
        check(
            self.notification.slack.min_severity.parse::<Severity>().is_ok(),
            "notification.slack.min_severity",
            "must be one of low, medium, high, critical".into(),
        );

        // --- analysis ---
        check(
            self.analysis.daily_limit > 0,
            "analysis.daily_limit",
            "must be greater than 0".into(),
        );
        check(
            self.analysis.dedupe_window_minutes > 0,
            "analysis.dedupe_window_minutes",
            "must be greater than 0".into(),
        );

        // --- cache ---
        check(
            self.cache.purge_interval_seconds > 0,
            "cache.purge_interval_seconds",
            "must be greater than 0".into(),
        );

        // --- storage ---
        check(
            self.storage.cleanup_days > 0,
            "storage.cleanup_days",
            "must be greater than 0".into(),
        );
        check(
            self.storage.stale_after_minutes > 0,
            "storage.stale_after_minutes",
            "must be greater than 0".into(),
        );

        // --- quota ---
        check(
            self.quota.lock_ttl_seconds > 0,
            "quota.lock_ttl_seconds",
            "must be greater than 0".into(),
        );

        // --- worker ---
        check(
            self.worker.concurrency > 0,
            "worker.concurrency",
            "must be greater than 0".into(),
        );
        check(
            self.worker.queue_capacity > 0,
            "worker.queue_capacity",
            "must be greater than 0".into(),
        );
        check(
            self.worker.max_attempts > 0,
            "worker.max_attempts",
            "must be greater than 0".into(),
        );
        check(
            !self.worker.backoff_seconds.is_empty(),
            "worker.backoff_seconds",
            "must contain at least one delay".into(),
        );
        check(
            self.worker.timeout_seconds > 0,
            "worker.timeout_seconds",
            "must be greater than 0".into(),
        );

        // --- logging ---
        check(
            VALID_LOG_LEVELS.contains(&self.logging.level.as_str()),
            "logging.level",
            format!("must be one of {:?}", VALID_LOG_LEVELS),
        );

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Start from the default configuration.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- analyzer ---

    pub fn analyzer_driver(mut self, driver: impl Into<String>) -> Self {
        self.config.analyzer.driver = driver.into();
        self
    }

    pub fn gemini_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.analyzer.gemini.api_key = Some(key.into());
        self
    }

    pub fn gemini_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.analyzer.gemini.base_url = url.into();
        self
    }

    // --- issue_tracker ---

    pub fn issue_tracker_driver(mut self, driver: impl Into<String>) -> Self {
        self.config.issue_tracker.driver = driver.into();
        self
    }

    pub fn github_repository(mut self, repository: impl Into<String>) -> Self {
        self.config.issue_tracker.github.repository = Some(repository.into());
        self
    }

    pub fn github_token(mut self, token: impl Into<String>) -> Self {
        self.config.issue_tracker.github.token = Some(token.into());
        self
    }

    pub fn github_ai_title(mut self, enabled: bool) -> Self {
        self.config.issue_tracker.github.ai_title.enabled = enabled;
        self
    }

    // --- notification ---

    pub fn notification_driver(mut self, driver: impl Into<String>) -> Self {
        self.config.notification.driver = driver.into();
        self
    }

    pub fn slack_webhook(mut self, webhook: impl Into<String>) -> Self {
        self.config.notification.slack.webhook = Some(webhook.into());
        self
    }

    pub fn slack_min_severity(mut self, severity: impl Into<String>) -> Self {
        self.config.notification.slack.min_severity = severity.into();
        self
    }

    // --- analysis ---

    pub fn daily_limit(mut self, limit: u32) -> Self {
        self.config.analysis.daily_limit = limit;
        self
    }

    pub fn enabled_environments(mut self, environments: Vec<String>) -> Self {
        self.config.analysis.enabled_environments = environments;
        self
    }

    pub fn excluded_exceptions(mut self, exceptions: Vec<String>) -> Self {
        self.config.analysis.excluded_exceptions = exceptions;
        self
    }

    pub fn dedupe_window_minutes(mut self, minutes: u32) -> Self {
        self.config.analysis.dedupe_window_minutes = minutes;
        self
    }

    // --- storage / cache ---

    pub fn storage_driver(mut self, driver: impl Into<String>) -> Self {
        self.config.storage.driver = driver.into();
        self
    }

    pub fn database_path(mut self, path: PathBuf) -> Self {
        self.config.storage.database_path = path;
        self
    }

    pub fn cache_driver(mut self, driver: impl Into<String>) -> Self {
        self.config.cache.driver = driver.into();
        self
    }

    pub fn cache_path(mut self, path: PathBuf) -> Self {
        self.config.cache.path = path;
        self
    }

    pub fn cache_purge_interval_seconds(mut self, seconds: u64) -> Self {
        self.config.cache.purge_interval_seconds = seconds;
        self
    }

    // --- worker ---

    pub fn worker_concurrency(mut self, n: usize) -> Self {
        self.config.worker.concurrency = n;
        self
    }

    pub fn worker_backoff_seconds(mut self, backoff: Vec<u64>) -> Self {
        self.config.worker.backoff_seconds = backoff;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    // -- Defaults --

    #[test]
    fn default_config_has_sensible_values() {
        let cfg = Config::default();
        assert_eq!(cfg.analyzer.driver, "null");
        assert_eq!(cfg.analyzer.gemini.model, "gemini-2.5-flash");
        assert_eq!(cfg.analyzer.gemini.max_output_tokens, 8000);
        assert_eq!(cfg.issue_tracker.github.labels, vec!["bug", "error-analysis"]);
        assert_eq!(cfg.issue_tracker.github.ai_title.model, "gemini-2.5-flash-lite");
        assert_eq!(cfg.notification.slack.min_severity, "high");
        assert_eq!(cfg.notification.slack.username, "Error Analyzer");
        assert_eq!(cfg.analysis.daily_limit, 100);
        assert_eq!(cfg.analysis.enabled_environments, vec!["production"]);
        assert_eq!(cfg.analysis.dedupe_window_minutes, 5);
        assert_eq!(cfg.storage.driver, "database");
        assert_eq!(cfg.storage.cleanup_days, 90);
        assert_eq!(cfg.cache.driver, "sqlite");
        assert_eq!(cfg.cache.purge_interval_seconds, 300);
        assert_eq!(cfg.worker.max_attempts, 3);
        assert_eq!(cfg.worker.backoff_seconds, vec![5, 10, 20]);
        assert_eq!(cfg.worker.timeout_seconds, 60);
        assert_eq!(cfg.quota.lock_ttl_seconds, 5);
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn default_config_passes_validation() {
        let errors = Config::default().validate();
        assert!(errors.is_empty(), "unexpected validation errors: {errors:?}");
    }

    // -- Loading --

    #[test]
    fn load_partial_yaml_fills_defaults() {
        let yaml = r#"
analyzer:
  driver: gemini
  gemini:
    api_key: "test-key"
analysis:
  daily_limit: 20
  enabled_environments: [production, staging]
notification:
  driver: slack
  slack:
    webhook: https://hooks.slack.test/T000
    min_severity: critical
storage:
  driver: cache
"#;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();

        let cfg = Config::load(file.path()).unwrap();
        assert_eq!(cfg.analyzer.driver, "gemini");
        assert_eq!(cfg.analyzer.gemini.api_key.as_deref(), Some("test-key"));
        assert_eq!(cfg.analyzer.gemini.model, "gemini-2.5-flash");
        assert_eq!(cfg.analysis.daily_limit, 20);
        assert_eq!(cfg.analysis.enabled_environments, vec!["production", "staging"]);
        assert_eq!(cfg.analysis.dedupe_window_minutes, 5);
        assert_eq!(cfg.notification.slack.min_severity, "critical");
        assert_eq!(cfg.storage.driver, "cache");
        assert_eq!(cfg.worker.concurrency, 4);
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn load_missing_file_errors() {
        assert!(Config::load(Path::new("/nonexistent/errsight.yaml")).is_err());
    }

    #[test]
    fn load_or_default_falls_back() {
        let cfg = Config::load_or_default(Path::new("/nonexistent/errsight.yaml"));
        assert_eq!(cfg.analysis.daily_limit, 100);
    }

    #[test]
    fn default_path_ends_with_config_yaml() {
        let path = Config::default_path();
        assert!(path.ends_with("errsight/config.yaml"));
    }

    // -- Validation --

    #[test]
    fn zero_window_is_rejected() {
        let errors = ConfigBuilder::new()
            .dedupe_window_minutes(0)
            .build_validated()
            .unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.field == "analysis.dedupe_window_minutes"));
    }

    #[test]
    fn zero_purge_interval_is_rejected() {
        let errors = ConfigBuilder::new()
            .cache_purge_interval_seconds(0)
            .build_validated()
            .unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "cache.purge_interval_seconds");
    }

    #[test]
    fn unknown_drivers_are_rejected() {
        let errors = ConfigBuilder::new()
            .storage_driver("redis")
            .cache_driver("memcached")
            .analyzer_driver("openai")
            .build()
            .validate();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"storage.driver"));
        assert!(fields.contains(&"cache.driver"));
        assert!(fields.contains(&"analyzer.driver"));
    }

    #[test]
    fn gemini_requires_api_key() {
        let errors = ConfigBuilder::new()
            .analyzer_driver("gemini")
            .build()
            .validate();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "analyzer.gemini.api_key");

        assert!(ConfigBuilder::new()
            .analyzer_driver("gemini")
            .gemini_api_key("k")
            .build_validated()
            .is_ok());
    }

    #[test]
    fn bad_min_severity_is_rejected() {
        let errors = ConfigBuilder::new()
            .slack_min_severity("urgent")
            .build()
            .validate();
        assert_eq!(errors[0].field, "notification.slack.min_severity");
    }

    #[test]
    fn empty_backoff_is_rejected() {
        let errors = ConfigBuilder::new()
            .worker_backoff_seconds(vec![])
            .worker_concurrency(0)
            .build()
            .validate();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn validation_error_display() {
        let err = ValidationError {
            field: "analysis.daily_limit".into(),
            message: "must be greater than 0".into(),
        };
        assert_eq!(err.to_string(), "analysis.daily_limit: must be greater than 0");
    }
}
