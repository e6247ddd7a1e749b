//! MeasurementTarget and Device traits - streaming endpoint abstraction
//!
//! Defines the collaborator interfaces the harness consumes. Real device
//! bindings and simulated devices both implement these traits.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{ContractError, FrameEvent, StreamKind, StreamProfile};

/// Frame delivery callback type
///
/// Invoked by the target once per delivered frame, from a delivery context
/// owned by the target (typically a dedicated thread).
pub type FrameCallback = Arc<dyn Fn(&FrameEvent) + Send + Sync>;

/// Auxiliary sensor options the harness may set to stabilise the frame rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorOption {
    /// Auto exposure on/off
    EnableAutoExposure,
    /// When set, exposure may take precedence over the requested frame rate
    AutoExposurePriority,
}

impl fmt::Display for SensorOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorOption::EnableAutoExposure => f.write_str("enable_auto_exposure"),
            SensorOption::AutoExposurePriority => f.write_str("auto_exposure_priority"),
        }
    }
}

/// Streaming endpoint trait
///
/// Lifecycle: Idle -> Opened -> Started -> Stopped -> Closed. A target must be
/// closed before it can be opened again.
///
/// # Example
///
/// ```ignore
/// target.open(&profile)?;
/// target.start(Arc::new(|frame| println!("frame {}", frame.frame_number)))?;
/// // ... frames arrive on the target's delivery thread ...
/// target.stop()?;
/// target.close()?;
/// ```
pub trait MeasurementTarget: Send + Sync {
    /// Human readable sensor name
    fn name(&self) -> &str;

    /// All stream profiles this sensor can be opened with
    fn profiles(&self) -> Vec<StreamProfile>;

    /// Whether the sensor exposes the option
    fn supports_option(&self, option: SensorOption) -> bool;

    /// Set an option value
    fn set_option(&self, option: SensorOption, value: f32) -> Result<(), ContractError>;

    /// Open the sensor against exactly one profile
    fn open(&self, profile: &StreamProfile) -> Result<(), ContractError>;

    /// Start frame delivery
    ///
    /// After this returns, `callback` is invoked for each frame until `stop`
    /// returns.
    fn start(&self, callback: FrameCallback) -> Result<(), ContractError>;

    /// Stop frame delivery
    ///
    /// No callback invocation may happen after this returns.
    fn stop(&self) -> Result<(), ContractError>;

    /// Close the sensor, returning it to the idle state
    fn close(&self) -> Result<(), ContractError>;
}

/// Static device identification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Product name (e.g. "Intel RealSense D435")
    pub name: String,

    /// Serial number
    pub serial: String,

    /// Product line (e.g. "D400")
    pub product_line: String,
}

/// A device exposing one sensor per stream kind
pub trait Device: Send + Sync {
    /// Device identification
    fn info(&self) -> &DeviceInfo;

    /// First sensor producing the given stream kind
    ///
    /// # Errors
    /// `ContractError::TargetUnavailable` if the device has no such sensor.
    fn sensor(&self, kind: StreamKind) -> Result<Arc<dyn MeasurementTarget>, ContractError>;
}
