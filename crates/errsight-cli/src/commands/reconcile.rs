//! Reconcile command - Fail reservations abandoned at `processing`

use anyhow::Result;
use chrono::Duration;
use clap::Args;

use errsight_core::config::Config;
use errsight_worker::Services;

use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Args)]
pub struct ReconcileCommand {
    /// Grace period in minutes (default: storage.stale_after_minutes)
    #[arg(long)]
    pub minutes: Option<u32>,

    /// List stale reports without changing them
    #[arg(long)]
    pub dry_run: bool,
}

impl ReconcileCommand {
    pub async fn execute(&self, config: Config, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);
        let minutes = self.minutes.unwrap_or(config.storage.stale_after_minutes);
        if minutes == 0 {
            anyhow::bail!("--minutes must be at least 1");
        }
        let services = Services::from_config(config).await?;

        let Some(reconcile) = services.reconcile() else {
            formatter.info("Reports are not persisted in cache storage mode; nothing to reconcile.");
            return Ok(());
        };

        let summary = reconcile
            .execute(Duration::minutes(i64::from(minutes)), self.dry_run)
            .await?;

        if format.is_json() {
            formatter.print_json(&serde_json::json!({
                "cutoff": summary.cutoff.to_rfc3339(),
                "found": summary.found,
                "failed": summary.failed,
                "dry_run": summary.dry_run,
            }));
        } else if summary.found == 0 {
            formatter.success("No stale reservations.");
        } else if summary.dry_run {
            formatter.info(&format!(
                "{} report(s) stuck in processing for more than {} minute(s).",
                summary.found, minutes
            ));
        } else {
            formatter.success(&format!(
                "Marked {} of {} stale report(s) as failed.",
                summary.failed, summary.found
            ));
        }
        Ok(())
    }
}
