//! List command - Show recent error reports

use anyhow::Result;
use clap::Args;

use errsight_core::config::Config;
use errsight_core::domain::Severity;
use errsight_core::ports::ReportFilter;
use errsight_worker::Services;

use super::{report_json, require_repository};
use crate::output::{get_formatter, report_header, report_row, OutputFormat};

#[derive(Debug, Args)]
pub struct ListCommand {
    /// Maximum number of reports to show
    #[arg(long, default_value_t = 20)]
    pub limit: u32,

    /// Only reports with this severity (low, medium, high, critical)
    #[arg(long)]
    pub severity: Option<Severity>,

    /// Hide resolved reports
    #[arg(long)]
    pub unresolved: bool,
}

impl ListCommand {
    fn filter(&self) -> ReportFilter {
        ReportFilter {
            severity: self.severity,
            unresolved_only: self.unresolved,
            limit: self.limit.max(1),
        }
    }

    pub async fn execute(&self, config: Config, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);
        let services = Services::from_config(config).await?;
        let repository = require_repository(&services)?;

        let reports = repository.recent(&self.filter()).await?;

        if format.is_json() {
            let items: Vec<_> = reports.iter().map(report_json).collect();
            formatter.print_json(&serde_json::json!({
                "count": items.len(),
                "reports": items,
            }));
            return Ok(());
        }

        if reports.is_empty() {
            formatter.info("No error reports found.");
            return Ok(());
        }

        println!("{}", report_header());
        for report in &reports {
            println!("{}", report_row(report));
        }
        formatter.info("");
        formatter.info(&format!("{} report(s)", reports.len()));
        Ok(())
    }
}
