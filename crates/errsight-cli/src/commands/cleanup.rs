//! Cleanup command - Retention sweep over stored reports
//!
//! Also purges expired cache entries, which applies in every storage mode.

use anyhow::Result;
use clap::Args;

use errsight_core::config::Config;
use errsight_worker::Services;

use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Args)]
pub struct CleanupCommand {
    /// Delete reports older than this many days (default: storage.cleanup_days)
    #[arg(long)]
    pub days: Option<u32>,

    /// Count matching reports without deleting them
    #[arg(long)]
    pub dry_run: bool,
}

impl CleanupCommand {
    pub async fn execute(&self, config: Config, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);
        let days = self.days.unwrap_or(config.storage.cleanup_days);
        let services = Services::from_config(config).await?;

        let cache_purged = if self.dry_run {
            0
        } else {
            services.cache_sweeper().sweep_once().await
        };

        let Some(cleanup) = services.cleanup() else {
            if format.is_json() {
                formatter.print_json(&serde_json::json!({
                    "durable": false,
                    "matched": 0,
                    "deleted": 0,
                    "cache_purged": cache_purged,
                    "dry_run": self.dry_run,
                }));
            } else {
                formatter.info("Reports are not persisted in cache storage mode; nothing to clean up.");
                if cache_purged > 0 {
                    formatter.success(&format!("Purged {} expired cache entries.", cache_purged));
                }
            }
            return Ok(());
        };

        let summary = cleanup.execute(days, self.dry_run).await?;

        if format.is_json() {
            formatter.print_json(&serde_json::json!({
                "durable": true,
                "cutoff": summary.cutoff.to_rfc3339(),
                "matched": summary.matched,
                "deleted": summary.deleted,
                "cache_purged": cache_purged,
                "dry_run": summary.dry_run,
            }));
        } else if summary.dry_run {
            formatter.info(&format!(
                "{} report(s) older than {} day(s) would be deleted.",
                summary.matched, days
            ));
        } else {
            formatter.success(&format!(
                "Deleted {} report(s) older than {} day(s); purged {} expired cache entries.",
                summary.deleted, days, cache_purged
            ));
        }
        Ok(())
    }
}
