//! Mock device
//!
//! A `Device` over a fixed set of mock sensors, keyed by stream kind.

use std::collections::HashMap;
use std::sync::Arc;

use contracts::{
    ContractError, Device, DeviceInfo, MeasurementTarget, PixelFormat, SensorOption, StreamKind,
    StreamProfile,
};
use tracing::debug;

use crate::sensor::{MockSensor, MockSensorConfig};

const DEPTH_RATES: [u32; 5] = [6, 15, 30, 60, 90];
const COLOR_RATES: [u32; 4] = [6, 15, 30, 60];

/// Mock device
pub struct MockDevice {
    info: DeviceInfo,
    sensors: HashMap<StreamKind, Arc<MockSensor>>,
}

impl MockDevice {
    /// Device without sensors
    pub fn new(name: impl Into<String>, serial: impl Into<String>, product_line: impl Into<String>) -> Self {
        Self {
            info: DeviceInfo {
                name: name.into(),
                serial: serial.into(),
                product_line: product_line.into(),
            },
            sensors: HashMap::new(),
        }
    }

    /// Attach a sensor producing `kind`, replacing any previous one
    pub fn with_sensor(mut self, kind: StreamKind, sensor: MockSensor) -> Self {
        self.sensors.insert(kind, Arc::new(sensor));
        self
    }

    /// Concrete handle to a sensor, for inspecting its counters
    pub fn sensor_handle(&self, kind: StreamKind) -> Option<Arc<MockSensor>> {
        self.sensors.get(&kind).cloned()
    }

    /// Depth + color device, D400 line
    pub fn d435(config: MockSensorConfig) -> Self {
        Self::new("Intel RealSense D435", "000000000001", "D400")
            .with_sensor(StreamKind::Depth, depth_sensor(config.clone()))
            .with_sensor(StreamKind::Color, color_sensor(config))
    }

    /// Depth only device, D400 line
    pub fn d405(config: MockSensorConfig) -> Self {
        Self::new("Intel RealSense D405", "000000000002", "D400")
            .with_sensor(StreamKind::Depth, depth_sensor(config))
    }
}

fn depth_sensor(config: MockSensorConfig) -> MockSensor {
    let profiles = DEPTH_RATES
        .iter()
        .map(|&fps| StreamProfile {
            kind: StreamKind::Depth,
            format: PixelFormat::Z16,
            fps,
            width: 848,
            height: 480,
        })
        .collect();

    MockSensor::new("Stereo Module", profiles, config)
        .with_options([SensorOption::EnableAutoExposure])
}

fn color_sensor(config: MockSensorConfig) -> MockSensor {
    let mut profiles = Vec::new();
    for &fps in &COLOR_RATES {
        for format in [PixelFormat::Rgb8, PixelFormat::Yuyv] {
            profiles.push(StreamProfile {
                kind: StreamKind::Color,
                format,
                fps,
                width: 640,
                height: 480,
            });
        }
    }

    MockSensor::new("RGB Camera", profiles, config).with_options([
        SensorOption::EnableAutoExposure,
        SensorOption::AutoExposurePriority,
    ])
}

impl Device for MockDevice {
    fn info(&self) -> &DeviceInfo {
        &self.info
    }

    fn sensor(&self, kind: StreamKind) -> Result<Arc<dyn MeasurementTarget>, ContractError> {
        match self.sensors.get(&kind) {
            Some(sensor) => {
                debug!(device = %self.info.name, sensor = sensor.name(), %kind, "sensor acquired");
                Ok(sensor.clone() as Arc<dyn MeasurementTarget>)
            }
            None => Err(ContractError::target_unavailable(
                kind,
                format!("{} has no {kind} sensor", self.info.name),
            )),
        }
    }
}
