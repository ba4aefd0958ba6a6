//! Show command - Display a single error report

use anyhow::Result;
use clap::Args;

use errsight_core::config::Config;
use errsight_core::domain::ReportId;
use errsight_worker::Services;

use super::{report_json, require_repository};
use crate::output::{get_formatter, print_report, OutputFormat};

#[derive(Debug, Args)]
pub struct ShowCommand {
    /// Report identifier
    pub id: i64,
}

impl ShowCommand {
    pub async fn execute(&self, config: Config, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);
        let services = Services::from_config(config).await?;
        let repository = require_repository(&services)?;

        let Some(report) = repository.get(ReportId::new(self.id)).await? else {
            anyhow::bail!("Report {} not found", self.id);
        };

        if format.is_json() {
            formatter.print_json(&report_json(&report));
        } else {
            print_report(&report, &*formatter);
            if !report.trace().is_empty() {
                formatter.info("");
                formatter.info("[Stack trace]");
                for line in report.trace().lines() {
                    formatter.info(line);
                }
            }
        }
        Ok(())
    }
}
