//! # Integration Tests
//!
//! Cross-crate and end-to-end tests.
//!
//! Covers:
//! - Contract snapshot tests
//! - Config file -> runner -> mock device campaigns
//! - Startup latency and frame loss against delayed/lossy mock devices

#[cfg(test)]
mod contract_tests {
    use contracts::{CampaignConfig, RateTable, StreamKind, TolerancePolicy};

    #[test]
    fn test_default_campaign_snapshot() {
        let config = CampaignConfig::default();

        let fps: Vec<u32> = config.rates.entries().iter().map(|e| e.requested_fps).collect();
        let secs: Vec<f64> = config
            .rates
            .entries()
            .iter()
            .map(|e| e.measurement.as_secs_f64())
            .collect();
        assert_eq!(fps, vec![5, 6, 15, 30, 60, 90]);
        assert_eq!(secs, vec![25.0, 20.0, 13.0, 10.0, 5.0, 4.0]);

        let kinds: Vec<StreamKind> = config.targets.iter().map(|t| t.kind).collect();
        assert_eq!(kinds, vec![StreamKind::Depth, StreamKind::Color]);
        assert_eq!(config.warmup_secs, 4.0);

        let policy = TolerancePolicy::default();
        assert_eq!(policy.fraction_for(StreamKind::Color, 5), 0.10);
        assert_eq!(policy.fraction_for(StreamKind::Depth, 5), 0.05);
    }

    #[test]
    fn test_rate_table_rejects_mismatched_columns() {
        assert!(RateTable::new(vec![5, 6, 15], vec![25.0, 20.0]).is_err());
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::io::Write;
    use std::time::Duration;

    use campaign::{CampaignRunner, CheckStatus};
    use config_loader::ConfigLoader;
    use contracts::{PixelFormat, StreamKind, StreamProfile};
    use mock_device::{MockDevice, MockSensor, MockSensorConfig};
    use rate_meter::{RateMeasurementSession, ToleranceEvaluator};

    const SHORT_CAMPAIGN: &str = r#"
warmup_secs = 0.3

[rates]
requested_fps = [5, 30, 60, 90]
measurement_secs = [1.0, 1.0, 1.0, 1.0]

[[targets]]
kind = "depth"
format = "z16"

[[targets.options]]
option = "enable_auto_exposure"
value = 1.0
product_line = "D400"

[[targets]]
kind = "color"
format = "rgb8"
optional_on = ["D421", "D405"]

[tolerance]
default_fraction = 0.05
"#;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    /// Config file -> loader -> runner -> D435 mock
    #[test]
    fn test_e2e_campaign_from_file() {
        let file = write_config(SHORT_CAMPAIGN);
        let config = ConfigLoader::load_from_path(file.path()).unwrap();
        let device = MockDevice::d435(MockSensorConfig::default());

        let report = CampaignRunner::new(config).run(&device);

        let depth: Vec<_> = report
            .section("depth")
            .unwrap()
            .checks
            .iter()
            .map(|c| c.status)
            .collect();
        // mock depth has no 5 Hz mode
        assert_eq!(
            depth,
            vec![
                CheckStatus::Unsupported,
                CheckStatus::Passed,
                CheckStatus::Passed,
                CheckStatus::Passed
            ]
        );

        let color: Vec<_> = report
            .section("color")
            .unwrap()
            .checks
            .iter()
            .map(|c| c.status)
            .collect();
        // mock color tops out at 60 Hz
        assert_eq!(
            color,
            vec![
                CheckStatus::Unsupported,
                CheckStatus::Passed,
                CheckStatus::Passed,
                CheckStatus::Unsupported
            ]
        );

        assert!(report.passed, "{:#?}", report);
        assert_eq!(report.exit_code(), 0);

        let depth_sensor = device.sensor_handle(StreamKind::Depth).unwrap();
        assert_eq!(depth_sensor.stats().opens, 3);
        assert_eq!(depth_sensor.stats().closes, 3);
        assert!(depth_sensor.is_closed());
    }

    #[test]
    fn test_e2e_d405_skips_color() {
        let config = ConfigLoader::load_from_path(write_config(SHORT_CAMPAIGN).path()).unwrap();
        let device = MockDevice::d405(MockSensorConfig::default());

        let report = CampaignRunner::new(config).run(&device);

        assert!(report.section("color").unwrap().skipped.is_some());
        assert_eq!(report.summary.passed, 3);
        assert!(report.passed);
    }

    #[test]
    fn test_e2e_lossy_device_fails_and_reports_drops() {
        let config = ConfigLoader::load_from_str(
            r#"
warmup_secs = 0.2

[rates]
requested_fps = [60]
measurement_secs = [1.0]

[[targets]]
kind = "depth"
format = "z16"
"#,
            config_loader::ConfigFormat::Toml,
        )
        .unwrap();
        // every 4th frame lost: ~45 fps delivered
        let device = MockDevice::d435(MockSensorConfig {
            drop_every: Some(4),
            ..Default::default()
        });

        let report = CampaignRunner::new(config).run(&device);

        let check = report.checks().next().unwrap();
        assert_eq!(check.status, CheckStatus::Failed);
        assert!(check.frame_drops >= 12, "drops {}", check.frame_drops);
        assert_eq!(report.exit_code(), 1);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["passed"], false);
        assert_eq!(json["sections"][0]["checks"][0]["status"], "failed");
    }

    /// A device whose first frame arrives 2 s after start reports ~2 s latency
    #[test]
    fn test_e2e_first_frame_latency_with_delayed_device() {
        let profile = StreamProfile {
            kind: StreamKind::Depth,
            format: PixelFormat::Z16,
            fps: 30,
            width: 848,
            height: 480,
        };
        let sensor = MockSensor::new(
            "Stereo Module",
            vec![profile],
            MockSensorConfig {
                start_delay: Duration::from_secs(2),
                ..Default::default()
            },
        );

        let session = RateMeasurementSession::new(Duration::from_millis(2500));
        let measurement = session
            .measure(&sensor, &profile, Duration::from_secs(1))
            .unwrap();

        let latency = measurement.first_frame_latency.unwrap();
        assert!(latency >= Duration::from_millis(1990), "latency {latency:?}");
        assert!(latency < Duration::from_millis(2300), "latency {latency:?}");

        let verdict = ToleranceEvaluator::default().check(
            StreamKind::Depth,
            30,
            measurement.achieved_fps,
        );
        assert!(verdict.passed, "{verdict:?}");
    }

    /// The campaign is blocking; async callers run it off the runtime threads
    #[tokio::test]
    async fn test_e2e_campaign_on_blocking_pool() {
        let config = ConfigLoader::load_from_str(
            r#"
warmup_secs = 0.1

[rates]
requested_fps = [30, 60]
measurement_secs = [1.0, 1.0]

[[targets]]
kind = "depth"
format = "z16"
"#,
            config_loader::ConfigFormat::Toml,
        )
        .unwrap();

        let report = tokio::task::spawn_blocking(move || {
            let device = MockDevice::d435(MockSensorConfig::default());
            CampaignRunner::new(config).run(&device)
        })
        .await
        .unwrap();

        assert_eq!(report.summary.passed, 2);
    }
}
