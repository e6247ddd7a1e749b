//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::CampaignConfig;
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    rate_count: usize,
    target_count: usize,
    warmup_secs: f64,
    total_measurement_secs: f64,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    match super::load_config(Some(&args.config)) {
        Ok(config) => {
            let warnings = collect_warnings(&config);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", config.version),
                    rate_count: config.rates.len(),
                    target_count: config.targets.len(),
                    warmup_secs: config.warmup_secs,
                    total_measurement_secs: config.rates.total_measurement().as_secs_f64(),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(config: &CampaignConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.warmup_secs < 1.0 {
        warnings.push(format!(
            "warmup_secs = {} - startup transients may be counted",
            config.warmup_secs
        ));
    }

    for entry in config.rates.entries() {
        // fewer than ~20 frames makes a one-frame boundary error exceed 5%
        let expected_frames = f64::from(entry.requested_fps) * entry.measurement.as_secs_f64();
        if expected_frames < 20.0 {
            warnings.push(format!(
                "{} Hz for {:.1}s yields only ~{:.0} frames",
                entry.requested_fps,
                entry.measurement.as_secs_f64(),
                expected_frames
            ));
        }
    }

    for target in &config.targets {
        for o in &config.tolerance.overrides {
            if o.kind == target.kind
                && !config
                    .rates
                    .entries()
                    .iter()
                    .any(|e| e.requested_fps == o.requested_fps)
            {
                warnings.push(format!(
                    "tolerance override for {} @ {} Hz matches no rate",
                    o.kind, o.requested_fps
                ));
            }
        }
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Rates: {}", summary.rate_count);
            println!("  Targets: {}", summary.target_count);
            println!("  Warm-up: {:.1}s", summary.warmup_secs);
            println!("  Measurement total: {:.1}s", summary.total_measurement_secs);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::RateTable;

    #[test]
    fn test_default_campaign_has_no_warnings() {
        assert!(collect_warnings(&CampaignConfig::default()).is_empty());
    }

    #[test]
    fn test_short_windows_warn() {
        let config = CampaignConfig {
            warmup_secs: 0.5,
            rates: RateTable::new(vec![5, 30], vec![1.0, 1.0]).unwrap(),
            ..CampaignConfig::default()
        };
        let warnings = collect_warnings(&config);
        assert!(warnings.iter().any(|w| w.contains("warmup_secs")));
        assert!(warnings.iter().any(|w| w.starts_with("5 Hz")));
        assert!(!warnings.iter().any(|w| w.starts_with("30 Hz")));
    }

    #[test]
    fn test_missing_file_is_invalid() {
        let result = validate_config(&ValidateArgs {
            config: "/nonexistent/fps.toml".into(),
            json: true,
        });
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("not found"));
    }
}
