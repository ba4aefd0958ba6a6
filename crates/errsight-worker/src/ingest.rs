//! Ingestion filter
//!
//! [`ErrorIngestor::report`] is what a host application calls from its error
//! handler. It decides whether an event is worth analyzing and hands
//! accepted events to the worker pool. Nothing that happens after dispatch
//! is visible to the caller.

use errsight_core::config::AnalysisConfig;
use errsight_core::domain::{short_type_name, ErrorEvent};

use crate::queue::Dispatcher;
use crate::DispatchError;

/// Why an event was not dispatched
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterReason {
    /// `context.environment` is not one of the enabled environments
    Environment(String),
    /// The exception type is on the exclusion list
    ExcludedException(String),
}

impl std::fmt::Display for FilterReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilterReason::Environment(env) => write!(f, "environment '{}' is not enabled", env),
            FilterReason::ExcludedException(ty) => write!(f, "exception '{}' is excluded", ty),
        }
    }
}

/// What happened to a reported event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    Accepted,
    Filtered(FilterReason),
    /// The queue could not take the job
    Rejected(DispatchError),
}

/// Environment and exception-type rules applied before dispatch
#[derive(Debug, Clone, Default)]
pub struct IngestFilter {
    enabled_environments: Vec<String>,
    excluded_exceptions: Vec<String>,
}

impl IngestFilter {
    pub fn new(enabled_environments: Vec<String>, excluded_exceptions: Vec<String>) -> Self {
        Self {
            enabled_environments,
            excluded_exceptions,
        }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(
            config.enabled_environments.clone(),
            config.excluded_exceptions.clone(),
        )
    }

    /// Checks `event` against both rules
    ///
    /// Events without an `environment` context entry pass the environment
    /// rule. An exclusion matches the full type name or its short name.
    pub fn check(&self, event: &ErrorEvent) -> Result<(), FilterReason> {
        if let Some(env) = event.environment() {
            if !self.enabled_environments.iter().any(|e| e == env) {
                return Err(FilterReason::Environment(env.to_string()));
            }
        }

        let short = event.short_type();
        let excluded = self.excluded_exceptions.iter().any(|excluded| {
            excluded == &event.exception_type || short_type_name(excluded) == short
        });
        if excluded {
            return Err(FilterReason::ExcludedException(event.exception_type.clone()));
        }

        Ok(())
    }
}

/// Entry point that filters events and queues them for analysis
#[derive(Debug, Clone)]
pub struct ErrorIngestor {
    filter: IngestFilter,
    dispatcher: Dispatcher,
}

impl ErrorIngestor {
    pub fn new(filter: IngestFilter, dispatcher: Dispatcher) -> Self {
        Self { filter, dispatcher }
    }

    /// Filters `event` and queues it without waiting for a free slot
    pub fn report(&self, event: ErrorEvent) -> IngestOutcome {
        if let Err(reason) = self.filter.check(&event) {
            tracing::debug!(
                exception_type = %event.exception_type,
                reason = %reason,
                "Error event filtered"
            );
            return IngestOutcome::Filtered(reason);
        }

        match self.dispatcher.try_dispatch(event) {
            Ok(()) => IngestOutcome::Accepted,
            Err(e) => {
                tracing::warn!(error = %e, "Error event dropped");
                IngestOutcome::Rejected(e)
            }
        }
    }

    /// Like [`ErrorIngestor::report`] but waits for queue capacity
    pub async fn report_wait(&self, event: ErrorEvent) -> IngestOutcome {
        if let Err(reason) = self.filter.check(&event) {
            tracing::debug!(
                exception_type = %event.exception_type,
                reason = %reason,
                "Error event filtered"
            );
            return IngestOutcome::Filtered(reason);
        }

        match self.dispatcher.dispatch(event).await {
            Ok(()) => IngestOutcome::Accepted,
            Err(e) => {
                tracing::warn!(error = %e, "Error event dropped");
                IngestOutcome::Rejected(e)
            }
        }
    }
}
