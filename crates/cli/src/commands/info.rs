//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::CampaignConfig;
use serde::Serialize;

use crate::cli::InfoArgs;

/// Campaign plan for JSON output
#[derive(Serialize)]
struct PlanInfo {
    version: String,
    warmup_secs: f64,
    total_measurement_secs: f64,
    rates: Vec<RateInfo>,
    targets: Vec<TargetInfo>,
}

#[derive(Serialize)]
struct RateInfo {
    requested_fps: u32,
    measurement_secs: f64,
}

#[derive(Serialize)]
struct TargetInfo {
    kind: String,
    format: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    optional_on: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    options: Vec<String>,
    /// Tolerance fraction per rate, in rate table order
    tolerance: Vec<f64>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    let config = super::load_config(args.config.as_deref())?;

    if args.json {
        let json = serde_json::to_string_pretty(&build_plan_info(&config))
            .context("Failed to serialize campaign plan")?;
        println!("{}", json);
    } else {
        print_plan(&config);
    }

    Ok(())
}

fn build_plan_info(config: &CampaignConfig) -> PlanInfo {
    let rates = config
        .rates
        .entries()
        .iter()
        .map(|e| RateInfo {
            requested_fps: e.requested_fps,
            measurement_secs: e.measurement.as_secs_f64(),
        })
        .collect();

    let targets = config
        .targets
        .iter()
        .map(|t| TargetInfo {
            kind: t.kind.to_string(),
            format: format!("{:?}", t.format),
            optional_on: t.optional_on.clone(),
            options: t.options.iter().map(describe_option).collect(),
            tolerance: config
                .rates
                .entries()
                .iter()
                .map(|e| config.tolerance.fraction_for(t.kind, e.requested_fps))
                .collect(),
        })
        .collect();

    PlanInfo {
        version: format!("{:?}", config.version),
        warmup_secs: config.warmup_secs,
        total_measurement_secs: config.rates.total_measurement().as_secs_f64(),
        rates,
        targets,
    }
}

fn describe_option(setting: &contracts::OptionSetting) -> String {
    match &setting.product_line {
        Some(line) => format!("{}={} on {}", setting.option, setting.value, line),
        None => format!("{}={}", setting.option, setting.value),
    }
}

/// Print the rate table, targets and tolerance policy
pub(crate) fn print_plan(config: &CampaignConfig) {
    println!("\n=== Campaign Plan ===\n");
    println!("Version: {:?}", config.version);
    println!("Warm-up: {:.1}s per measurement", config.warmup_secs);

    let measurements = config.rates.len() * config.targets.len();
    let worst_case = config.rates.total_measurement().as_secs_f64() * config.targets.len() as f64
        + config.warmup_secs * measurements as f64;
    println!("Worst-case duration: {:.0}s ({} measurements)", worst_case, measurements);

    println!("\nRates ({}):", config.rates.len());
    for entry in config.rates.entries() {
        println!(
            "  - {:>3} Hz for {:.1}s",
            entry.requested_fps,
            entry.measurement.as_secs_f64()
        );
    }

    println!("\nTargets ({}):", config.targets.len());
    for (i, target) in config.targets.iter().enumerate() {
        let is_last = i == config.targets.len() - 1;
        let prefix = if is_last { "└─" } else { "├─" };
        let child = if is_last { "   " } else { "│  " };
        println!("  {} {} {:?}", prefix, target.kind, target.format);
        if !target.optional_on.is_empty() {
            println!("  {}  optional on: {}", child, target.optional_on.join(", "));
        }
        for setting in &target.options {
            println!("  {}  option: {}", child, describe_option(setting));
        }
    }

    println!("\nTolerance:");
    println!("  default: ±{:.1}%", config.tolerance.default_fraction * 100.0);
    for o in &config.tolerance.overrides {
        println!("  {} @ {} Hz: ±{:.1}%", o.kind, o.requested_fps, o.fraction * 100.0);
    }
    println!();
}
