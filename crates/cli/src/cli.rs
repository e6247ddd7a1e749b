//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// fps-check - frame-rate validation for streaming depth/color sensors
#[derive(Parser, Debug)]
#[command(
    name = "fps-check",
    author,
    version,
    about = "Streaming sensor frame-rate validation harness",
    long_about = "Measures the steady-state frame rate a streaming sensor delivers for each\n\
                  requested rate, checks it against a tolerance policy, and reports\n\
                  frame drops and first-frame latency."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "FPS_CHECK_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "FPS_CHECK_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the frame-rate campaign
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display the campaign plan
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON); built-in campaign if omitted
    #[arg(short, long, env = "FPS_CHECK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the warm-up window (seconds)
    #[arg(long, env = "FPS_CHECK_WARMUP_SECS")]
    pub warmup_secs: Option<f64>,

    /// Multiply every measurement window by this factor
    #[arg(long, default_value = "1.0", env = "FPS_CHECK_DURATION_SCALE")]
    pub duration_scale: f64,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,

    /// Validate configuration and print the plan without measuring
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "FPS_CHECK_METRICS_PORT")]
    pub metrics_port: u16,

    #[command(flatten)]
    pub mock: MockArgs,
}

/// Simulated device settings
#[derive(clap::Args, Debug, Clone)]
pub struct MockArgs {
    /// Simulated device model
    #[arg(long = "mock-model", value_enum, default_value = "d435", env = "FPS_CHECK_MOCK_MODEL")]
    pub model: MockModel,

    /// Delay between start and the first frame (milliseconds)
    #[arg(long = "mock-start-delay-ms", default_value = "0")]
    pub start_delay_ms: u64,

    /// Delivered rate as a multiple of the requested rate
    #[arg(long = "mock-rate-scale", default_value = "1.0")]
    pub rate_scale: f64,

    /// Drop every Nth frame
    #[arg(long = "mock-drop-every")]
    pub drop_every: Option<u64>,
}

/// Simulated device models
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MockModel {
    /// Depth and color sensors
    #[default]
    D435,
    /// Depth only
    D405,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "fps.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file; built-in campaign if omitted
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => observability::LogFormat::Json,
            LogFormat::Pretty => observability::LogFormat::Pretty,
            LogFormat::Compact => observability::LogFormat::Compact,
        }
    }
}
