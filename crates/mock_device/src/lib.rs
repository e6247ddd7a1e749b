//! # Mock Device
//!
//! Simulated devices for running the harness without hardware.
//!
//! - `MockSensor`: implements `MeasurementTarget`, delivers frames on a
//!   background thread at the opened profile's rate; delay, drops, rate
//!   error and lifecycle failures are injectable, and every lifecycle call
//!   is counted so tests can spy on it
//! - `MockDevice`: implements `Device` over a set of mock sensors

mod device;
mod sensor;

pub use device::MockDevice;
pub use sensor::{FailurePoint, MockSensor, MockSensorConfig, MockSensorStats};
