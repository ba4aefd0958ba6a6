//! Subcommand implementations

pub mod cleanup;
pub mod list;
pub mod quota;
pub mod reconcile;
pub mod show;

use std::sync::Arc;

use anyhow::Result;
use errsight_core::ports::IReportRepository;
use errsight_worker::Services;

/// The durable repository, or an error explaining that storage is ephemeral
pub fn require_repository(services: &Services) -> Result<Arc<dyn IReportRepository + Send + Sync>> {
    services.repository.clone().ok_or_else(|| {
        anyhow::anyhow!(
            "Reports are not persisted (storage.driver = {}). \
             Set storage.driver to \"database\" to query reports.",
            services.config.storage.driver
        )
    })
}

/// Report as JSON, as stored
pub fn report_json(report: &errsight_core::domain::ErrorReport) -> serde_json::Value {
    serde_json::to_value(report).unwrap_or(serde_json::Value::Null)
}
