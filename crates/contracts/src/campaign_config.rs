//! CampaignConfig - Config Loader output
//!
//! Describes a complete fps campaign: rate table, warm-up, measured targets
//! and tolerance policy.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{ContractError, PixelFormat, SensorOption, StreamKind};

/// Default warm-up window before frames are counted (seconds)
pub const DEFAULT_WARMUP_SECS: f64 = 4.0;

/// Default tolerance: 5% of the requested rate
pub const DEFAULT_TOLERANCE_FRACTION: f64 = 0.05;

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete campaign configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignConfig {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Warm-up window excluded from counting (seconds)
    #[serde(default = "default_warmup_secs")]
    pub warmup_secs: f64,

    /// Requested rates and their measurement windows
    pub rates: RateTable,

    /// Measured targets, in execution order
    pub targets: Vec<TargetSpec>,

    /// Tolerance policy
    #[serde(default)]
    pub tolerance: TolerancePolicy,
}

fn default_warmup_secs() -> f64 {
    DEFAULT_WARMUP_SECS
}

impl CampaignConfig {
    /// Warm-up window as a duration
    ///
    /// Saturates at `Duration::MAX` for values a `Duration` cannot hold.
    pub fn warmup(&self) -> Duration {
        Duration::try_from_secs_f64(self.warmup_secs.max(0.0)).unwrap_or(Duration::MAX)
    }
}

impl Default for CampaignConfig {
    /// Depth Z16 then color RGB8 over the standard rate table.
    fn default() -> Self {
        Self {
            version: ConfigVersion::V1,
            warmup_secs: DEFAULT_WARMUP_SECS,
            rates: RateTable::default(),
            targets: vec![TargetSpec::default_depth(), TargetSpec::default_color()],
            tolerance: TolerancePolicy::default(),
        }
    }
}

/// One row of the rate table
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateEntry {
    /// Requested frame rate (Hz)
    pub requested_fps: u32,

    /// Length of the counting window
    pub measurement: Duration,
}

/// Ordered table of requested rates with an explicit measurement window each.
///
/// Higher rates get shorter windows to bound total campaign time while still
/// collecting enough frames. Both columns always have the same length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RateTableRepr", into = "RateTableRepr")]
pub struct RateTable {
    entries: Vec<RateEntry>,
}

/// Serialized form of [`RateTable`]: two parallel columns
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateTableRepr {
    pub requested_fps: Vec<u32>,
    pub measurement_secs: Vec<f64>,
}

impl RateTable {
    /// Build a table from parallel columns
    ///
    /// # Errors
    /// - columns of different length
    /// - a zero rate or a non-positive window
    pub fn new(requested_fps: Vec<u32>, measurement_secs: Vec<f64>) -> Result<Self, ContractError> {
        if requested_fps.len() != measurement_secs.len() {
            return Err(ContractError::config_validation(
                "rates",
                format!(
                    "requested_fps has {} entries but measurement_secs has {}",
                    requested_fps.len(),
                    measurement_secs.len()
                ),
            ));
        }

        let mut entries = Vec::with_capacity(requested_fps.len());
        let mut total = Duration::ZERO;
        for (idx, (fps, secs)) in requested_fps.into_iter().zip(measurement_secs).enumerate() {
            if fps == 0 {
                return Err(ContractError::config_validation(
                    format!("rates.requested_fps[{idx}]"),
                    "requested fps must be > 0",
                ));
            }
            if !secs.is_finite() || secs <= 0.0 {
                return Err(ContractError::config_validation(
                    format!("rates.measurement_secs[{idx}]"),
                    format!("measurement window must be > 0, got {secs}"),
                ));
            }
            let measurement = Duration::try_from_secs_f64(secs).map_err(|e| {
                ContractError::config_validation(
                    format!("rates.measurement_secs[{idx}]"),
                    format!("measurement window {secs} is not representable: {e}"),
                )
            })?;
            total = total.checked_add(measurement).ok_or_else(|| {
                ContractError::config_validation(
                    "rates.measurement_secs",
                    "total measurement time overflows",
                )
            })?;
            entries.push(RateEntry {
                requested_fps: fps,
                measurement,
            });
        }

        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[RateEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Same table with every window multiplied by `factor`
    pub fn scaled(&self, factor: f64) -> Result<Self, ContractError> {
        let repr = RateTableRepr::from(self.clone());
        let secs = repr.measurement_secs.iter().map(|s| s * factor).collect();
        Self::new(repr.requested_fps, secs)
    }

    /// Sum of all measurement windows
    pub fn total_measurement(&self) -> Duration {
        self.entries
            .iter()
            .fold(Duration::ZERO, |acc, e| acc.saturating_add(e.measurement))
    }
}

impl Default for RateTable {
    fn default() -> Self {
        Self {
            entries: [(5, 25), (6, 20), (15, 13), (30, 10), (60, 5), (90, 4)]
                .into_iter()
                .map(|(fps, secs)| RateEntry {
                    requested_fps: fps,
                    measurement: Duration::from_secs(secs),
                })
                .collect(),
        }
    }
}

impl TryFrom<RateTableRepr> for RateTable {
    type Error = ContractError;

    fn try_from(repr: RateTableRepr) -> Result<Self, Self::Error> {
        Self::new(repr.requested_fps, repr.measurement_secs)
    }
}

impl From<RateTable> for RateTableRepr {
    fn from(table: RateTable) -> Self {
        Self {
            requested_fps: table.entries.iter().map(|e| e.requested_fps).collect(),
            measurement_secs: table
                .entries
                .iter()
                .map(|e| e.measurement.as_secs_f64())
                .collect(),
        }
    }
}

/// A measured target: which sensor and which stream of it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetSpec {
    /// Stream kind, also selects the sensor
    pub kind: StreamKind,

    /// Fixed pixel format; only the rate varies across the campaign
    pub format: PixelFormat,

    /// Device name markers of variants known to lack this sensor
    #[serde(default)]
    pub optional_on: Vec<String>,

    /// Options applied before measuring
    #[serde(default)]
    pub options: Vec<OptionSetting>,
}

impl TargetSpec {
    /// Depth Z16 with auto exposure enabled on D400
    pub fn default_depth() -> Self {
        Self {
            kind: StreamKind::Depth,
            format: PixelFormat::Z16,
            optional_on: Vec::new(),
            options: vec![OptionSetting::for_product_line(
                SensorOption::EnableAutoExposure,
                1.0,
                "D400",
            )],
        }
    }

    /// Color RGB8, absent on D421/D405; auto exposure on and AE priority off on D400
    pub fn default_color() -> Self {
        Self {
            kind: StreamKind::Color,
            format: PixelFormat::Rgb8,
            optional_on: vec!["D421".to_string(), "D405".to_string()],
            options: vec![
                OptionSetting::for_product_line(SensorOption::EnableAutoExposure, 1.0, "D400"),
                OptionSetting::for_product_line(SensorOption::AutoExposurePriority, 0.0, "D400"),
            ],
        }
    }

    /// Whether a device with this name may legitimately lack the sensor
    pub fn is_optional_on(&self, device_name: &str) -> bool {
        self.optional_on
            .iter()
            .any(|marker| device_name.contains(marker.as_str()))
    }
}

/// An option value to set before measuring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionSetting {
    pub option: SensorOption,

    pub value: f32,

    /// Only apply on this product line (None = any device)
    #[serde(default)]
    pub product_line: Option<String>,
}

impl OptionSetting {
    pub fn for_product_line(option: SensorOption, value: f32, line: impl Into<String>) -> Self {
        Self {
            option,
            value,
            product_line: Some(line.into()),
        }
    }

    /// Whether the setting applies to the given product line
    pub fn applies_to(&self, product_line: &str) -> bool {
        self.product_line
            .as_deref()
            .is_none_or(|line| line == product_line)
    }
}

/// Tolerance lookup keyed by (stream kind, requested rate)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TolerancePolicy {
    /// Fraction used when no override matches
    #[serde(default = "default_tolerance_fraction")]
    pub default_fraction: f64,

    /// Exceptions to the default
    #[serde(default)]
    pub overrides: Vec<ToleranceOverride>,
}

fn default_tolerance_fraction() -> f64 {
    DEFAULT_TOLERANCE_FRACTION
}

/// Tolerance exception for one stream kind at one rate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToleranceOverride {
    pub kind: StreamKind,
    pub requested_fps: u32,
    pub fraction: f64,
}

impl TolerancePolicy {
    /// Flat policy without exceptions
    pub fn flat(fraction: f64) -> Self {
        Self {
            default_fraction: fraction,
            overrides: Vec::new(),
        }
    }

    /// Allowed relative deviation for a stream kind at a requested rate
    pub fn fraction_for(&self, kind: StreamKind, requested_fps: u32) -> f64 {
        self.overrides
            .iter()
            .find(|o| o.kind == kind && o.requested_fps == requested_fps)
            .map_or(self.default_fraction, |o| o.fraction)
    }
}

impl Default for TolerancePolicy {
    /// 5% everywhere, 10% for color at 5 Hz.
    fn default() -> Self {
        Self {
            default_fraction: DEFAULT_TOLERANCE_FRACTION,
            overrides: vec![ToleranceOverride {
                kind: StreamKind::Color,
                requested_fps: 5,
                fraction: 0.10,
            }],
        }
    }
}
