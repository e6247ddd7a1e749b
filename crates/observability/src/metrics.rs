//! Measurement metrics
//!
//! Exposes frame, drop, rate and check metrics through the `metrics` facade
//! and aggregates them in memory for the end-of-campaign summary.

use std::collections::HashMap;

use metrics::{counter, gauge, histogram};

/// Record one delivered frame
pub fn record_frame_delivered(target: &str) {
    counter!("fps_check_frames_delivered_total", "target" => target.to_string()).increment(1);
}

/// Record a sequence gap
pub fn record_frame_drop(target: &str, missing_frames: u64) {
    counter!("fps_check_frame_drops_total", "target" => target.to_string()).increment(1);
    counter!("fps_check_frames_missing_total", "target" => target.to_string())
        .increment(missing_frames);
}

/// Record the outcome of one measurement
///
/// # Example
///
/// ```ignore
/// use observability::metrics::{record_measurement, MeasurementSample};
///
/// record_measurement(&MeasurementSample {
///     target: "depth".into(),
///     requested_fps: 30,
///     achieved_fps: 29.9,
///     first_frame_latency_ms: Some(120.0),
///     frame_drops: 0,
/// });
/// ```
pub fn record_measurement(sample: &MeasurementSample) {
    gauge!(
        "fps_check_achieved_fps",
        "target" => sample.target.clone(),
        "requested_fps" => sample.requested_fps.to_string()
    )
    .set(sample.achieved_fps);

    histogram!(
        "fps_check_rate_error_pct",
        "target" => sample.target.clone()
    )
    .record(sample.rate_error_pct().abs());

    if let Some(latency) = sample.first_frame_latency_ms {
        histogram!(
            "fps_check_first_frame_latency_ms",
            "target" => sample.target.clone()
        )
        .record(latency);
    }
}

/// Record a recorded check
pub fn record_check(status: &str) {
    counter!("fps_check_checks_total", "status" => status.to_string()).increment(1);
}

/// One measurement as seen by the metrics layer
#[derive(Debug, Clone)]
pub struct MeasurementSample {
    pub target: String,
    pub requested_fps: u32,
    pub achieved_fps: f64,
    pub first_frame_latency_ms: Option<f64>,
    pub frame_drops: u64,
}

impl MeasurementSample {
    /// Signed deviation from the requested rate, in percent
    pub fn rate_error_pct(&self) -> f64 {
        if self.requested_fps == 0 {
            0.0
        } else {
            let requested = f64::from(self.requested_fps);
            (self.achieved_fps - requested) / requested * 100.0
        }
    }
}

/// Campaign metrics aggregator
///
/// Aggregates measurement samples in memory for summary output.
#[derive(Debug, Clone, Default)]
pub struct CampaignMetricsAggregator {
    /// Number of measurements
    pub total_measurements: u64,

    /// Total sequence gaps
    pub total_drops: u64,

    /// Measurements that never received a frame
    pub measurements_without_frames: u64,

    /// First-frame latency (ms)
    pub latency_stats: RunningStats,

    /// Absolute rate error (%)
    pub rate_error_stats: RunningStats,

    /// Sequence gaps per target
    pub drops_per_target: HashMap<String, u64>,
}

impl CampaignMetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update aggregate statistics
    pub fn update(&mut self, sample: &MeasurementSample) {
        self.total_measurements += 1;
        self.total_drops += sample.frame_drops;

        match sample.first_frame_latency_ms {
            Some(latency) => self.latency_stats.push(latency),
            None => self.measurements_without_frames += 1,
        }

        self.rate_error_stats.push(sample.rate_error_pct().abs());

        if sample.frame_drops > 0 {
            *self
                .drops_per_target
                .entry(sample.target.clone())
                .or_insert(0) += sample.frame_drops;
        }
    }

    /// Build summary report
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            total_measurements: self.total_measurements,
            total_drops: self.total_drops,
            measurements_without_frames: self.measurements_without_frames,
            first_frame_latency_ms: StatsSummary::from(&self.latency_stats),
            rate_error_pct: StatsSummary::from(&self.rate_error_stats),
            drops_per_target: self.drops_per_target.clone(),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Metrics summary
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total_measurements: u64,
    pub total_drops: u64,
    pub measurements_without_frames: u64,
    pub first_frame_latency_ms: StatsSummary,
    pub rate_error_pct: StatsSummary,
    pub drops_per_target: HashMap<String, u64>,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Measurement Metrics Summary ===")?;
        writeln!(f, "Measurements: {}", self.total_measurements)?;
        writeln!(f, "Frame drops: {}", self.total_drops)?;
        writeln!(
            f,
            "Measurements without frames: {}",
            self.measurements_without_frames
        )?;
        writeln!(f, "First frame latency (ms): {}", self.first_frame_latency_ms)?;
        writeln!(f, "Rate error (%): {}", self.rate_error_pct)?;

        if !self.drops_per_target.is_empty() {
            writeln!(f, "Drops per target:")?;
            for (target, count) in &self.drops_per_target {
                writeln!(f, "  {}: {}", target, count)?;
            }
        }

        Ok(())
    }
}

/// Statistics summary
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(target: &str, achieved: f64, latency: Option<f64>, drops: u64) -> MeasurementSample {
        MeasurementSample {
            target: target.to_string(),
            requested_fps: 30,
            achieved_fps: achieved,
            first_frame_latency_ms: latency,
            frame_drops: drops,
        }
    }

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();

        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            stats.push(v);
        }

        assert_eq!(stats.count(), 5);
        assert!((stats.mean() - 3.0).abs() < 1e-10);
        assert!((stats.min() - 1.0).abs() < 1e-10);
        assert!((stats.max() - 5.0).abs() < 1e-10);
        assert!((stats.variance() - 2.5).abs() < 1e-10);
    }

    #[test]
    fn test_rate_error_pct() {
        assert!((sample("depth", 27.0, None, 0).rate_error_pct() + 10.0).abs() < 1e-10);
        assert!((sample("depth", 33.0, None, 0).rate_error_pct() - 10.0).abs() < 1e-10);
    }

    #[test]
    fn test_aggregator_update() {
        let mut aggregator = CampaignMetricsAggregator::new();

        aggregator.update(&sample("depth", 30.0, Some(100.0), 0));
        aggregator.update(&sample("color", 27.0, None, 3));

        assert_eq!(aggregator.total_measurements, 2);
        assert_eq!(aggregator.total_drops, 3);
        assert_eq!(aggregator.measurements_without_frames, 1);
        assert_eq!(aggregator.latency_stats.count(), 1);
        assert_eq!(aggregator.drops_per_target.get("color"), Some(&3));
        assert_eq!(aggregator.drops_per_target.get("depth"), None);

        aggregator.reset();
        assert_eq!(aggregator.total_measurements, 0);
    }

    #[test]
    fn test_summary_display() {
        let mut aggregator = CampaignMetricsAggregator::new();
        aggregator.update(&sample("depth", 30.0, Some(150.0), 2));

        let output = format!("{}", aggregator.summary());
        assert!(output.contains("Measurements: 1"));
        assert!(output.contains("Frame drops: 2"));
        assert!(output.contains("depth: 2"));
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_frame_delivered("depth");
        record_frame_drop("depth", 2);
        record_check("passed");
        record_measurement(&sample("depth", 30.0, Some(1.0), 0));
    }
}
