//! # fps-check CLI
//!
//! Command-line entry point.
//!
//! Provides:
//! - Configuration loading and validation
//! - Campaign execution against the simulated device
//! - Exit status reflecting the verdict

mod cli;
mod commands;
mod error;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use observability::ObservabilityConfig;
use tracing::info;

use cli::{Cli, Commands};
use commands::{run_campaign, run_info, run_validate};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    init_logging(&cli)?;

    info!(version = env!("CARGO_PKG_VERSION"), "fps-check starting");

    let result = match &cli.command {
        Commands::Run(args) => run_campaign(args).await,
        Commands::Validate(args) => run_validate(args).map(|()| ExitCode::SUCCESS),
        Commands::Info(args) => run_info(args).map(|()| ExitCode::SUCCESS),
    };

    if let Err(ref e) = result {
        tracing::error!(error = %e, "Command failed");
    }

    result
}

/// Initialize logging (and the metrics exporter for `run`) from CLI options
fn init_logging(cli: &Cli) -> Result<()> {
    let default_log_level = if cli.quiet {
        "warn"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let metrics_port = match &cli.command {
        Commands::Run(args) if args.metrics_port != 0 => Some(args.metrics_port),
        _ => None,
    };

    observability::init_with_config(ObservabilityConfig {
        log_format: cli.log_format.into(),
        metrics_port,
        default_log_level: default_log_level.to_string(),
    })
}
