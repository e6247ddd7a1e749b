//! Configuration validation
//!
//! Rules:
//! - warm-up >= 0 and representable as a `Duration`
//! - at least one rate and one target
//! - target kinds unique
//! - tolerance fractions in [0, 1)
//! - tolerance overrides unique per (kind, fps)
//!
//! Rate table column lengths, rates > 0 and windows > 0 are already
//! enforced when the table is constructed.

use std::collections::HashSet;
use std::time::Duration;

use contracts::{CampaignConfig, ContractError};

/// Validate a CampaignConfig
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(config: &CampaignConfig) -> Result<(), ContractError> {
    validate_warmup(config)?;
    validate_rates(config)?;
    validate_targets(config)?;
    validate_tolerance(config)?;
    Ok(())
}

fn validate_warmup(config: &CampaignConfig) -> Result<(), ContractError> {
    if !config.warmup_secs.is_finite() || config.warmup_secs < 0.0 {
        return Err(ContractError::config_validation(
            "warmup_secs",
            format!("warmup_secs must be >= 0, got {}", config.warmup_secs),
        ));
    }
    if let Err(e) = Duration::try_from_secs_f64(config.warmup_secs) {
        return Err(ContractError::config_validation(
            "warmup_secs",
            format!("warmup_secs {} is not representable: {e}", config.warmup_secs),
        ));
    }
    Ok(())
}

fn validate_rates(config: &CampaignConfig) -> Result<(), ContractError> {
    if config.rates.is_empty() {
        return Err(ContractError::config_validation(
            "rates",
            "rate table cannot be empty",
        ));
    }
    Ok(())
}

fn validate_targets(config: &CampaignConfig) -> Result<(), ContractError> {
    if config.targets.is_empty() {
        return Err(ContractError::config_validation(
            "targets",
            "at least one target is required",
        ));
    }

    let mut seen = HashSet::new();
    for (idx, target) in config.targets.iter().enumerate() {
        if !seen.insert(target.kind) {
            return Err(ContractError::config_validation(
                format!("targets[{idx}].kind"),
                format!("duplicate target kind '{}'", target.kind),
            ));
        }
    }
    Ok(())
}

fn validate_tolerance(config: &CampaignConfig) -> Result<(), ContractError> {
    let policy = &config.tolerance;

    check_fraction("tolerance.default_fraction", policy.default_fraction)?;

    let mut seen = HashSet::new();
    for (idx, o) in policy.overrides.iter().enumerate() {
        check_fraction(&format!("tolerance.overrides[{idx}].fraction"), o.fraction)?;

        if !seen.insert((o.kind, o.requested_fps)) {
            return Err(ContractError::config_validation(
                format!("tolerance.overrides[{idx}]"),
                format!(
                    "duplicate override for {} at {} fps",
                    o.kind, o.requested_fps
                ),
            ));
        }
    }
    Ok(())
}

fn check_fraction(field: &str, fraction: f64) -> Result<(), ContractError> {
    if !(0.0..1.0).contains(&fraction) {
        return Err(ContractError::config_validation(
            field,
            format!("tolerance fraction must be in [0, 1), got {fraction}"),
        ));
    }
    Ok(())
}
