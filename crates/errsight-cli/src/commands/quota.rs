//! Quota command - Show or reset today's AI analysis budget

use anyhow::Result;
use clap::Args;

use errsight_core::config::Config;
use errsight_worker::Services;

use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Args)]
pub struct QuotaCommand {
    /// Clear today's counter
    #[arg(long)]
    pub reset: bool,
}

impl QuotaCommand {
    pub async fn execute(&self, config: Config, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);
        let services = Services::from_config(config).await?;

        if self.reset {
            services.quota.reset().await?;
            formatter.success("Today's quota counter was reset.");
        }

        let remaining = services.quota.remaining_quota().await?;
        let limit = services.quota.daily_limit();

        if format.is_json() {
            formatter.print_json(&serde_json::json!({
                "daily_limit": limit,
                "remaining": remaining,
                "used": limit.saturating_sub(remaining),
            }));
        } else {
            formatter.info(&format!("Remaining quota: {} / {}", remaining, limit));
        }
        Ok(())
    }
}
