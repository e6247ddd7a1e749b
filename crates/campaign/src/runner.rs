//! Campaign runner
//!
//! Walks targets and rates in configuration order, one measurement at a time.

use std::sync::Arc;
use std::time::Instant;

use contracts::{
    CampaignConfig, Device, MeasurementTarget, RateEntry, StreamProfile, TargetSpec,
};
use observability::{CampaignMetricsAggregator, MeasurementSample};
use rate_meter::{RateMeasurementSession, ToleranceEvaluator};
use tracing::{error, info, instrument, warn};

use crate::report::{CampaignReport, CheckRecord, CheckRecorder};

/// Runs a campaign against a device
#[derive(Debug, Clone)]
pub struct CampaignRunner {
    config: CampaignConfig,
    session: RateMeasurementSession,
    evaluator: ToleranceEvaluator,
}

impl CampaignRunner {
    pub fn new(config: CampaignConfig) -> Self {
        let session = RateMeasurementSession::new(config.warmup());
        let evaluator = ToleranceEvaluator::new(config.tolerance.clone());
        Self {
            config,
            session,
            evaluator,
        }
    }

    pub fn config(&self) -> &CampaignConfig {
        &self.config
    }

    /// Run every target at every rate
    ///
    /// Never fails as a whole: per-rate problems become checks in the report.
    #[instrument(name = "campaign_run", skip_all, fields(device = %device.info().name))]
    pub fn run(&self, device: &dyn Device) -> CampaignReport {
        self.run_with_metrics(device, &mut CampaignMetricsAggregator::new())
    }

    /// Like [`run`](Self::run), feeding every measurement into `aggregator`
    pub fn run_with_metrics(
        &self,
        device: &dyn Device,
        aggregator: &mut CampaignMetricsAggregator,
    ) -> CampaignReport {
        let started = Instant::now();
        let info = device.info();
        let mut recorder = CheckRecorder::new();

        info!(
            device = %info.name,
            serial = %info.serial,
            product_line = %info.product_line,
            targets = self.config.targets.len(),
            rates = self.config.rates.len(),
            warmup_secs = self.config.warmup_secs,
            "campaign started"
        );

        for spec in &self.config.targets {
            self.run_target(device, spec, &mut recorder, aggregator);
        }

        let report = recorder.into_report(info.clone(), started.elapsed().as_secs_f64());
        info!(
            summary = %report.summary,
            passed = report.passed,
            duration_secs = format!("{:.1}", report.duration_secs),
            "campaign finished"
        );
        report
    }

    fn run_target(
        &self,
        device: &dyn Device,
        spec: &TargetSpec,
        recorder: &mut CheckRecorder,
        aggregator: &mut CampaignMetricsAggregator,
    ) {
        let info = device.info();
        recorder.start(spec.kind.as_str());

        let target = match device.sensor(spec.kind) {
            Ok(target) => target,
            Err(e) if spec.is_optional_on(&info.name) => {
                recorder.skip(format!("{} has no {} sensor", info.name, spec.kind));
                info!(device = %info.name, kind = %spec.kind, error = %e, "optional target absent");
                return;
            }
            Err(e) => {
                recorder.check(CheckRecord::failed(
                    format!("{} sensor present", spec.kind),
                    e.to_string(),
                ));
                return;
            }
        };

        apply_options(target.as_ref(), spec, &info.product_line);

        for entry in self.config.rates.entries() {
            self.run_rate(&target, spec, entry, recorder, aggregator);
        }
    }

    fn run_rate(
        &self,
        target: &Arc<dyn MeasurementTarget>,
        spec: &TargetSpec,
        entry: &RateEntry,
        recorder: &mut CheckRecorder,
        aggregator: &mut CampaignMetricsAggregator,
    ) {
        let fps = entry.requested_fps;
        let name = format!("{} {:?} @ {} Hz", spec.kind, spec.format, fps);

        let Some(profile) = select_profile(target.as_ref(), spec, fps) else {
            info!(sensor = target.name(), requested_fps = fps, "no matching profile, skipping rate");
            recorder.check(CheckRecord::unsupported(name, fps));
            return;
        };

        match self.session.measure(target.as_ref(), &profile, entry.measurement) {
            Ok(measurement) => {
                let verdict = self
                    .evaluator
                    .check(spec.kind, fps, measurement.achieved_fps);

                let sample = MeasurementSample {
                    target: target.name().to_string(),
                    requested_fps: fps,
                    achieved_fps: measurement.achieved_fps,
                    first_frame_latency_ms: measurement
                        .first_frame_latency
                        .map(|l| l.as_secs_f64() * 1000.0),
                    frame_drops: measurement.frame_gaps.len() as u64,
                };
                observability::record_measurement(&sample);
                aggregator.update(&sample);

                if !verdict.passed {
                    warn!(
                        sensor = target.name(),
                        requested_fps = fps,
                        achieved_fps = format!("{:.2}", verdict.achieved_fps),
                        lower = format!("{:.2}", verdict.lower_bound()),
                        upper = format!("{:.2}", verdict.upper_bound()),
                        "achieved rate out of tolerance"
                    );
                }
                recorder.check(CheckRecord::measured(name, &measurement, verdict));
            }
            Err(e) => {
                error!(sensor = target.name(), requested_fps = fps, error = %e, "measurement failed");
                recorder.check(CheckRecord::error(name, fps, e.to_string()));
            }
        }
    }
}

/// First profile of the target matching kind, format and rate
pub fn select_profile(
    target: &dyn MeasurementTarget,
    spec: &TargetSpec,
    requested_fps: u32,
) -> Option<StreamProfile> {
    target
        .profiles()
        .into_iter()
        .find(|p| p.matches(spec.kind, spec.format, requested_fps))
}

/// Set the target options that apply to this product line
///
/// Unsupported options and rejected values are logged, not fatal.
fn apply_options(target: &dyn MeasurementTarget, spec: &TargetSpec, product_line: &str) {
    for setting in spec.options.iter().filter(|s| s.applies_to(product_line)) {
        if !target.supports_option(setting.option) {
            info!(sensor = target.name(), option = %setting.option, "option not supported");
            continue;
        }
        match target.set_option(setting.option, setting.value) {
            Ok(()) => info!(
                sensor = target.name(),
                option = %setting.option,
                value = setting.value,
                "option set"
            ),
            Err(e) => warn!(sensor = target.name(), option = %setting.option, error = %e, "failed to set option"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use contracts::{
        ContractError, DeviceInfo, FrameCallback, PixelFormat, RateTable, SensorOption,
        StreamKind, TolerancePolicy,
    };
    use mock_device::{FailurePoint, MockDevice, MockSensor, MockSensorConfig};

    use crate::report::CheckStatus;

    fn config(fps: Vec<u32>, secs: Vec<f64>, targets: Vec<TargetSpec>) -> CampaignConfig {
        CampaignConfig {
            warmup_secs: 0.2,
            rates: RateTable::new(fps, secs).unwrap(),
            targets,
            ..CampaignConfig::default()
        }
    }

    fn depth_only() -> Vec<TargetSpec> {
        vec![TargetSpec::default_depth()]
    }

    fn statuses(report: &CampaignReport) -> Vec<CheckStatus> {
        report.checks().map(|c| c.status).collect()
    }

    #[test]
    fn test_unsupported_rate_never_opens_target() {
        // D435 mock depth has no 5 Hz profile
        let device = MockDevice::d435(MockSensorConfig::default());
        let runner = CampaignRunner::new(config(vec![5], vec![0.5], depth_only()));

        let report = runner.run(&device);

        assert_eq!(statuses(&report), vec![CheckStatus::Unsupported]);
        let stats = device.sensor_handle(StreamKind::Depth).unwrap().stats();
        assert_eq!(stats.opens, 0);
        assert_eq!(stats.starts, 0);
        assert!(report.passed);
    }

    #[test]
    fn test_unsupported_then_measured() {
        let device = MockDevice::d435(MockSensorConfig::default());
        let runner = CampaignRunner::new(config(vec![5, 60], vec![0.5, 1.0], depth_only()));

        let report = runner.run(&device);

        assert_eq!(
            statuses(&report),
            vec![CheckStatus::Unsupported, CheckStatus::Passed]
        );
        let stats = device.sensor_handle(StreamKind::Depth).unwrap().stats();
        assert_eq!(stats.opens, 1);
        assert_eq!(stats.closes, 1);
        assert_eq!(report.exit_code(), 0);
    }

    #[test]
    fn test_slow_device_fails_tolerance() {
        let device = MockDevice::d435(MockSensorConfig {
            rate_scale: 0.5,
            ..Default::default()
        });
        let runner = CampaignRunner::new(config(vec![60], vec![1.0], depth_only()));

        let report = runner.run(&device);

        let check = report.checks().next().unwrap();
        assert_eq!(check.status, CheckStatus::Failed);
        let verdict = check.tolerance.unwrap();
        assert!(verdict.achieved_fps < 40.0, "achieved {}", verdict.achieved_fps);
        assert_eq!(verdict.tolerance_fraction, 0.05);
        assert!(!report.passed);
        assert_eq!(report.exit_code(), 1);
    }

    #[test]
    fn test_measurement_error_does_not_stop_campaign() {
        let device = MockDevice::d435(MockSensorConfig {
            fail_at: Some(FailurePoint::Start),
            ..Default::default()
        });
        let runner = CampaignRunner::new(config(
            vec![30, 60],
            vec![0.3, 0.3],
            vec![TargetSpec::default_depth(), TargetSpec::default_color()],
        ));

        let report = runner.run(&device);

        assert_eq!(report.summary.errors, 4);
        assert!(report
            .checks()
            .all(|c| c.message.as_deref().is_some_and(|m| m.contains("start"))));
        let depth = device.sensor_handle(StreamKind::Depth).unwrap();
        assert_eq!(depth.stats().opens, 2);
        assert!(depth.is_closed());
    }

    #[test]
    fn test_optional_color_absent_is_tolerated() {
        let device = MockDevice::d405(MockSensorConfig::default());
        let runner = CampaignRunner::new(config(
            vec![5],
            vec![0.5],
            vec![TargetSpec::default_depth(), TargetSpec::default_color()],
        ));

        let report = runner.run(&device);

        let color = report.section("color").unwrap();
        assert!(color.skipped.is_some());
        assert!(color.checks.is_empty());
        assert!(report.passed);
    }

    #[test]
    fn test_missing_required_target_fails() {
        let device = MockDevice::new("Intel RealSense D435", "3", "D400").with_sensor(
            StreamKind::Depth,
            MockSensor::new("Stereo Module", Vec::new(), MockSensorConfig::default()),
        );
        let runner = CampaignRunner::new(config(
            vec![5],
            vec![0.5],
            vec![TargetSpec::default_depth(), TargetSpec::default_color()],
        ));

        let report = runner.run(&device);

        let color = report.section("color").unwrap();
        assert_eq!(color.checks.len(), 1);
        assert_eq!(color.checks[0].status, CheckStatus::Failed);
        assert!(!report.passed);
    }

    #[test]
    fn test_options_applied_per_product_line() {
        let device = MockDevice::d435(MockSensorConfig::default());
        let runner = CampaignRunner::new(config(
            vec![5],
            vec![0.5],
            vec![TargetSpec::default_depth(), TargetSpec::default_color()],
        ));
        runner.run(&device);

        let depth = device.sensor_handle(StreamKind::Depth).unwrap();
        let color = device.sensor_handle(StreamKind::Color).unwrap();
        assert_eq!(depth.option(SensorOption::EnableAutoExposure), Some(1.0));
        assert_eq!(color.option(SensorOption::EnableAutoExposure), Some(1.0));
        assert_eq!(color.option(SensorOption::AutoExposurePriority), Some(0.0));

        // another product line gets nothing
        let other = MockDevice::new("Other Camera", "9", "L500").with_sensor(
            StreamKind::Depth,
            MockSensor::new("Depth", Vec::new(), MockSensorConfig::default())
                .with_options([SensorOption::EnableAutoExposure]),
        );
        let runner = CampaignRunner::new(config(vec![5], vec![0.5], depth_only()));
        runner.run(&other);
        let depth = other.sensor_handle(StreamKind::Depth).unwrap();
        assert_eq!(depth.option(SensorOption::EnableAutoExposure), None);
    }

    #[test]
    fn test_color_override_tolerance_is_used() {
        let device = MockDevice::d435(MockSensorConfig::default());
        let mut cfg = config(vec![6], vec![1.0], vec![TargetSpec::default_color()]);
        cfg.tolerance = TolerancePolicy {
            default_fraction: 0.05,
            overrides: vec![contracts::ToleranceOverride {
                kind: StreamKind::Color,
                requested_fps: 6,
                fraction: 0.5,
            }],
        };

        let report = CampaignRunner::new(cfg).run(&device);

        let check = report.checks().next().unwrap();
        assert_eq!(check.tolerance.unwrap().tolerance_fraction, 0.5);
        assert_eq!(check.status, CheckStatus::Passed);
    }

    /// Target that records every call without delivering frames
    #[derive(Default)]
    struct SpyTarget {
        calls: std::sync::Mutex<Vec<&'static str>>,
    }

    impl SpyTarget {
        fn record(&self, call: &'static str) {
            self.calls.lock().unwrap().push(call);
        }
    }

    impl MeasurementTarget for SpyTarget {
        fn name(&self) -> &str {
            "spy"
        }
        fn profiles(&self) -> Vec<StreamProfile> {
            vec![StreamProfile {
                kind: StreamKind::Depth,
                format: PixelFormat::Z16,
                fps: 30,
                width: 640,
                height: 480,
            }]
        }
        fn supports_option(&self, _: SensorOption) -> bool {
            false
        }
        fn set_option(&self, _: SensorOption, _: f32) -> Result<(), ContractError> {
            self.record("set_option");
            Ok(())
        }
        fn open(&self, _: &StreamProfile) -> Result<(), ContractError> {
            self.record("open");
            Ok(())
        }
        fn start(&self, _: FrameCallback) -> Result<(), ContractError> {
            self.record("start");
            Ok(())
        }
        fn stop(&self) -> Result<(), ContractError> {
            self.record("stop");
            Ok(())
        }
        fn close(&self) -> Result<(), ContractError> {
            self.record("close");
            Ok(())
        }
    }

    struct SpyDevice {
        info: DeviceInfo,
        target: Arc<SpyTarget>,
    }

    impl Device for SpyDevice {
        fn info(&self) -> &DeviceInfo {
            &self.info
        }
        fn sensor(&self, kind: StreamKind) -> Result<Arc<dyn MeasurementTarget>, ContractError> {
            match kind {
                StreamKind::Depth => Ok(self.target.clone() as Arc<dyn MeasurementTarget>),
                other => Err(ContractError::target_unavailable(other, "spy")),
            }
        }
    }

    #[test]
    fn test_spy_sees_lifecycle_only_for_supported_rates() {
        let device = SpyDevice {
            info: DeviceInfo {
                name: "Spy".into(),
                serial: "0".into(),
                product_line: "D400".into(),
            },
            target: Arc::new(SpyTarget::default()),
        };
        let mut cfg = config(vec![5, 30, 90], vec![0.1, 0.1, 0.1], depth_only());
        cfg.warmup_secs = 0.0;

        let report = CampaignRunner::new(cfg).run(&device);

        // options are never set when unsupported
        assert_eq!(
            *device.target.calls.lock().unwrap(),
            vec!["open", "start", "stop", "close"]
        );
        // no frames at 30 Hz is a tolerance failure, not an error
        assert_eq!(
            statuses(&report),
            vec![
                CheckStatus::Unsupported,
                CheckStatus::Failed,
                CheckStatus::Unsupported
            ]
        );
        let measured = &report.checks().nth(1).unwrap();
        assert_eq!(measured.first_frame_latency_ms, None);
        assert_eq!(measured.tolerance.unwrap().achieved_fps, 0.0);
    }

    #[test]
    fn test_aggregator_sees_every_measurement() {
        let device = MockDevice::d435(MockSensorConfig::default());
        let runner = CampaignRunner::new(config(vec![5, 30, 60], vec![0.2, 0.3, 0.3], depth_only()));
        let mut aggregator = CampaignMetricsAggregator::new();

        let report = runner.run_with_metrics(&device, &mut aggregator);

        assert_eq!(aggregator.total_measurements, 2);
        assert_eq!(report.summary.total(), 3);
        assert!(report.duration_secs >= 2.0 * 0.2 + 0.6);
    }

    #[test]
    fn test_session_uses_configured_warmup() {
        let cfg = CampaignConfig {
            warmup_secs: 1.5,
            ..CampaignConfig::default()
        };
        let runner = CampaignRunner::new(cfg);
        assert_eq!(runner.session.warmup(), Duration::from_millis(1500));
    }
}
