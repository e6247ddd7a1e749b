//! `run` command implementation.

use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use campaign::{CampaignReport, CampaignRunner, CheckStatus};
use config_loader::ConfigLoader;
use contracts::CampaignConfig;
use mock_device::{MockDevice, MockSensorConfig};
use observability::CampaignMetricsAggregator;
use tracing::{error, info, warn};

use crate::cli::{MockArgs, MockModel, RunArgs};
use crate::error::CliError;

/// Exit status after Ctrl+C / SIGTERM
const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Execute the `run` command
pub async fn run_campaign(args: &RunArgs) -> Result<ExitCode> {
    let mut config = super::load_config(args.config.as_deref())?;
    apply_overrides(&mut config, args)?;
    ConfigLoader::validate(&config).context("Invalid configuration after CLI overrides")?;

    info!(
        targets = config.targets.len(),
        rates = config.rates.len(),
        warmup_secs = config.warmup_secs,
        total_measurement_secs = config.rates.total_measurement().as_secs_f64(),
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        super::info::print_plan(&config);
        return Ok(ExitCode::SUCCESS);
    }

    let mock_config = mock_sensor_config(&args.mock)?;
    let model = args.mock.model;
    let runner = CampaignRunner::new(config);

    // measurements block on real sleeps; keep them off the runtime workers
    let campaign = tokio::task::spawn_blocking(move || {
        let device = build_device(model, mock_config);
        let mut aggregator = CampaignMetricsAggregator::new();
        let report = runner.run_with_metrics(&device, &mut aggregator);
        (report, aggregator)
    });

    info!("Starting campaign...");

    tokio::select! {
        joined = campaign => {
            let (report, aggregator) = joined
                .map_err(|e| CliError::campaign_execution(e.to_string()))?;

            if args.json {
                let json = serde_json::to_string_pretty(&report)
                    .context("Failed to serialize campaign report")?;
                println!("{}", json);
            } else {
                print_report(&report);
                println!("{}", aggregator.summary());
            }

            let code = report.exit_code();
            info!(exit_code = code, "fps-check finished");
            Ok(ExitCode::from(code as u8))
        }
        _ = shutdown_signal() => {
            // a measurement in progress cannot be interrupted, and the runtime
            // would wait for the blocking task on shutdown
            warn!("Received shutdown signal, abandoning campaign");
            std::process::exit(INTERRUPTED_EXIT_CODE);
        }
    }
}

/// Apply warm-up and duration scale overrides
fn apply_overrides(config: &mut CampaignConfig, args: &RunArgs) -> std::result::Result<(), CliError> {
    if let Some(warmup) = args.warmup_secs {
        if !warmup.is_finite() || warmup < 0.0 {
            return Err(CliError::invalid_override(
                "--warmup-secs",
                format!("must be >= 0, got {warmup}"),
            ));
        }
        info!(warmup_secs = warmup, "Overriding warm-up from CLI");
        config.warmup_secs = warmup;
    }

    if args.duration_scale != 1.0 {
        if !args.duration_scale.is_finite() || args.duration_scale <= 0.0 {
            return Err(CliError::invalid_override(
                "--duration-scale",
                format!("must be > 0, got {}", args.duration_scale),
            ));
        }
        info!(scale = args.duration_scale, "Scaling measurement windows from CLI");
        config.rates = config.rates.scaled(args.duration_scale)?;
    }

    Ok(())
}

fn mock_sensor_config(args: &MockArgs) -> std::result::Result<MockSensorConfig, CliError> {
    if !args.rate_scale.is_finite() || args.rate_scale <= 0.0 {
        return Err(CliError::invalid_override(
            "--mock-rate-scale",
            format!("must be > 0, got {}", args.rate_scale),
        ));
    }
    if args.drop_every == Some(0) {
        return Err(CliError::invalid_override("--mock-drop-every", "must be > 0"));
    }

    Ok(MockSensorConfig {
        start_delay: Duration::from_millis(args.start_delay_ms),
        rate_scale: args.rate_scale,
        drop_every: args.drop_every,
        ..MockSensorConfig::default()
    })
}

fn build_device(model: MockModel, config: MockSensorConfig) -> MockDevice {
    match model {
        MockModel::D435 => MockDevice::d435(config),
        MockModel::D405 => MockDevice::d405(config),
    }
}

/// Wait for Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print the per-target check table
fn print_report(report: &CampaignReport) {
    println!("\n=== fps-check report: {} ({}) ===", report.device.name, report.device.serial);

    for section in &report.sections {
        println!("\n{}", section.name);
        if let Some(reason) = &section.skipped {
            println!("   └─ skipped: {}", reason);
            continue;
        }
        for (i, check) in section.checks.iter().enumerate() {
            let prefix = if i == section.checks.len() - 1 { "└─" } else { "├─" };
            let mark = match check.status {
                CheckStatus::Passed => "✓",
                CheckStatus::Failed | CheckStatus::Error => "✗",
                CheckStatus::Unsupported => "-",
            };
            match (&check.tolerance, &check.message) {
                (Some(t), _) => println!(
                    "   {} {} {:<28} {:>7.2} fps (allowed {:.2}..{:.2}), latency {}, drops {}",
                    prefix,
                    mark,
                    check.name,
                    t.achieved_fps,
                    t.lower_bound(),
                    t.upper_bound(),
                    check
                        .first_frame_latency_ms
                        .map_or_else(|| "n/a".to_string(), |l| format!("{l:.0} ms")),
                    check.frame_drops
                ),
                (None, Some(message)) => {
                    println!("   {} {} {:<28} {}: {}", prefix, mark, check.name, check.status, message)
                }
                (None, None) => println!("   {} {} {:<28} {}", prefix, mark, check.name, check.status),
            }
        }
    }

    println!(
        "\n{} in {:.1}s -> {}\n",
        report.summary,
        report.duration_secs,
        if report.passed { "PASSED" } else { "FAILED" }
    );
}
