//! # Contracts
//!
//! Frozen interface contracts shared by every crate of the harness.
//! Business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Elapsed times are measured on the orchestrating host with a monotonic clock
//! - `frame_number` is assigned by the device and is expected to increase by one per frame

mod campaign_config;
mod error;
mod stream;
mod target;

pub use campaign_config::*;
pub use error::*;
pub use stream::*;
pub use target::{Device, DeviceInfo, FrameCallback, MeasurementTarget, SensorOption};
