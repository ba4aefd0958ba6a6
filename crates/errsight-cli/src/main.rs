//! errsight CLI - Command-line interface for the error analysis pipeline
//!
//! Provides commands for:
//! - Sending a synthetic error through the pipeline
//! - Listing and inspecting stored reports
//! - Retention cleanup and stale-reservation reconciliation
//! - Inspecting and resetting the daily AI quota

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use errsight_core::config::Config;

mod commands;
mod output;

use commands::{
    cleanup::CleanupCommand, list::ListCommand, quota::QuotaCommand,
    reconcile::ReconcileCommand, show::ShowCommand, test::TestCommand,
};
use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(name = "errsight", version, about = "AI-assisted error analysis pipeline")]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Send a synthetic error through the analysis pipeline
    Test(TestCommand),
    /// List recent error reports
    List(ListCommand),
    /// Show a single error report
    Show(ShowCommand),
    /// Delete reports older than the retention period
    Cleanup(CleanupCommand),
    /// Mark reports stuck in processing as failed
    Reconcile(ReconcileCommand),
    /// Show or reset today's AI analysis quota
    Quota(QuotaCommand),
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Ok(Config::load_or_default(&Config::default_path())),
    }
}

fn init_tracing(verbose: u8, config: &Config) {
    let level = match verbose {
        0 => config.logging.level.as_str(),
        1 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if config.logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_ref())?;
    init_tracing(cli.verbose, &config);
    tracing::debug!(
        storage = %config.storage.driver,
        analyzer = %config.analyzer.driver,
        "Configuration loaded"
    );

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };

    match cli.command {
        Commands::Test(cmd) => cmd.execute(config, format).await,
        Commands::List(cmd) => cmd.execute(config, format).await,
        Commands::Show(cmd) => cmd.execute(config, format).await,
        Commands::Cleanup(cmd) => cmd.execute(config, format).await,
        Commands::Reconcile(cmd) => cmd.execute(config, format).await,
        Commands::Quota(cmd) => cmd.execute(config, format).await,
    }
}
