//! Mock sensor implementation
//!
//! Implements `MeasurementTarget`, delivering empty frames from a background
//! thread at the opened profile's rate. Used for testing and for running the
//! harness without a device attached.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use contracts::{
    ContractError, FrameCallback, FrameEvent, LifecycleStage, MeasurementTarget, SensorOption,
    StreamProfile,
};
use tracing::{debug, error, trace, warn};

/// Longest single sleep of the delivery thread, bounds stop latency
const MAX_SLEEP_SLICE: Duration = Duration::from_millis(10);

/// Lifecycle call that should fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePoint {
    Open,
    Start,
    /// Delivery still halts, but `stop` reports an error
    Stop,
    Close,
}

/// Mock sensor configuration
#[derive(Debug, Clone)]
pub struct MockSensorConfig {
    /// Delay between `start` and the first frame
    pub start_delay: Duration,
    /// Time `open` blocks for
    pub open_delay: Duration,
    /// Actual rate as a multiple of the requested rate
    pub rate_scale: f64,
    /// Skip every Nth frame number (sequence gap of one)
    pub drop_every: Option<u64>,
    /// Lifecycle call that fails
    pub fail_at: Option<FailurePoint>,
    /// Number of the first delivered frame
    pub first_frame_number: u64,
}

impl Default for MockSensorConfig {
    fn default() -> Self {
        Self {
            start_delay: Duration::ZERO,
            open_delay: Duration::ZERO,
            rate_scale: 1.0,
            drop_every: None,
            fail_at: None,
            first_frame_number: 1,
        }
    }
}

/// Lifecycle call counters, failed calls included
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MockSensorStats {
    pub opens: u32,
    pub starts: u32,
    pub stops: u32,
    pub closes: u32,
    pub option_sets: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Opened,
    Started,
    Stopped,
}

struct Inner {
    state: State,
    profile: Option<StreamProfile>,
    worker: Option<JoinHandle<()>>,
    options: HashMap<SensorOption, f32>,
    stats: MockSensorStats,
}

/// Mock sensor
pub struct MockSensor {
    name: String,
    profiles: Vec<StreamProfile>,
    supported_options: Vec<SensorOption>,
    config: MockSensorConfig,
    running: Arc<AtomicBool>,
    inner: Mutex<Inner>,
}

impl MockSensor {
    /// Create a mock sensor offering `profiles`
    pub fn new(name: impl Into<String>, profiles: Vec<StreamProfile>, config: MockSensorConfig) -> Self {
        Self {
            name: name.into(),
            profiles,
            supported_options: Vec::new(),
            config,
            running: Arc::new(AtomicBool::new(false)),
            inner: Mutex::new(Inner {
                state: State::Idle,
                profile: None,
                worker: None,
                options: HashMap::new(),
                stats: MockSensorStats::default(),
            }),
        }
    }

    /// Declare options the sensor exposes
    pub fn with_options(mut self, options: impl IntoIterator<Item = SensorOption>) -> Self {
        self.supported_options = options.into_iter().collect();
        self
    }

    /// Call counters
    pub fn stats(&self) -> MockSensorStats {
        self.lock().stats
    }

    /// Current value of an option, if it was set
    pub fn option(&self, option: SensorOption) -> Option<f32> {
        self.lock().options.get(&option).copied()
    }

    /// Whether the sensor is back in the idle state
    pub fn is_closed(&self) -> bool {
        self.lock().state == State::Idle
    }

    /// Whether frames are being delivered
    pub fn is_streaming(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn injected(&self, point: FailurePoint, stage: LifecycleStage) -> Result<(), ContractError> {
        if self.config.fail_at == Some(point) {
            return Err(ContractError::lifecycle(
                &self.name,
                stage,
                "injected failure",
            ));
        }
        Ok(())
    }

    fn wrong_state(&self, stage: LifecycleStage, state: State) -> ContractError {
        ContractError::lifecycle(&self.name, stage, format!("not allowed in state {state:?}"))
    }

    fn spawn_delivery(&self, profile: StreamProfile, callback: FrameCallback) -> JoinHandle<()> {
        let name = self.name.clone();
        let config = self.config.clone();
        let running = self.running.clone();
        // an unrepresentable interval never ticks
        let interval =
            Duration::try_from_secs_f64(1.0 / (f64::from(profile.fps) * config.rate_scale))
                .unwrap_or(Duration::MAX);

        thread::spawn(move || {
            let first_frame_at = Instant::now().checked_add(config.start_delay);
            if first_frame_at.is_none() {
                warn!(
                    sensor = %name,
                    start_delay = ?config.start_delay,
                    "start delay out of range, no frames will be delivered"
                );
            }
            if !sleep_until(first_frame_at, &running) {
                return;
            }

            debug!(
                sensor = %name,
                fps = profile.fps,
                rate_scale = config.rate_scale,
                "mock delivery started"
            );

            // absolute schedule, so per-frame overhead does not accumulate
            let origin = Instant::now();
            let mut frame_number = config.first_frame_number;
            let mut tick: u32 = 0;

            loop {
                let deadline = interval
                    .checked_mul(tick)
                    .and_then(|offset| origin.checked_add(offset));
                if !sleep_until(deadline, &running) {
                    break;
                }

                let dropped = config
                    .drop_every
                    .is_some_and(|n| n > 0 && frame_number % n == 0);
                if dropped {
                    trace!(sensor = %name, frame_number, "mock frame dropped");
                } else {
                    let frame =
                        FrameEvent::empty(frame_number, origin.elapsed().as_secs_f64() * 1000.0);
                    callback(&frame);
                }

                frame_number += 1;
                tick = tick.saturating_add(1);
            }

            debug!(sensor = %name, last_frame = frame_number.saturating_sub(1), "mock delivery stopped");
        })
    }
}

/// Sleep until `deadline` in short slices; false if `running` was cleared
///
/// A `None` deadline lies beyond the clock's range and is never reached.
fn sleep_until(deadline: Option<Instant>, running: &AtomicBool) -> bool {
    loop {
        if !running.load(Ordering::Acquire) {
            return false;
        }
        let remaining = match deadline {
            Some(deadline) => deadline.saturating_duration_since(Instant::now()),
            None => MAX_SLEEP_SLICE,
        };
        if deadline.is_some() && remaining.is_zero() {
            return true;
        }
        thread::sleep(remaining.min(MAX_SLEEP_SLICE));
    }
}

impl MeasurementTarget for MockSensor {
    fn name(&self) -> &str {
        &self.name
    }

    fn profiles(&self) -> Vec<StreamProfile> {
        self.profiles.clone()
    }

    fn supports_option(&self, option: SensorOption) -> bool {
        self.supported_options.contains(&option)
    }

    fn set_option(&self, option: SensorOption, value: f32) -> Result<(), ContractError> {
        let mut inner = self.lock();
        inner.stats.option_sets += 1;
        if !self.supports_option(option) {
            return Err(ContractError::OptionUnsupported {
                target: self.name.clone(),
                option,
            });
        }
        inner.options.insert(option, value);
        Ok(())
    }

    fn open(&self, profile: &StreamProfile) -> Result<(), ContractError> {
        {
            let mut inner = self.lock();
            inner.stats.opens += 1;
            self.injected(FailurePoint::Open, LifecycleStage::Open)?;

            if inner.state != State::Idle {
                return Err(ContractError::lifecycle(
                    &self.name,
                    LifecycleStage::Open,
                    "device busy",
                ));
            }
            if !self.profiles.contains(profile) {
                return Err(ContractError::lifecycle(
                    &self.name,
                    LifecycleStage::Open,
                    format!("unsupported profile {profile}"),
                ));
            }
            inner.state = State::Opened;
            inner.profile = Some(*profile);
        }

        if !self.config.open_delay.is_zero() {
            thread::sleep(self.config.open_delay);
        }
        Ok(())
    }

    fn start(&self, callback: FrameCallback) -> Result<(), ContractError> {
        let mut inner = self.lock();
        inner.stats.starts += 1;
        self.injected(FailurePoint::Start, LifecycleStage::Start)?;

        let profile = match (inner.state, inner.profile) {
            (State::Opened, Some(profile)) => profile,
            (state, _) => return Err(self.wrong_state(LifecycleStage::Start, state)),
        };

        self.running.store(true, Ordering::Release);
        inner.worker = Some(self.spawn_delivery(profile, callback));
        inner.state = State::Started;
        Ok(())
    }

    fn stop(&self) -> Result<(), ContractError> {
        let worker = {
            let mut inner = self.lock();
            inner.stats.stops += 1;
            if inner.state != State::Started {
                return Err(self.wrong_state(LifecycleStage::Stop, inner.state));
            }
            inner.state = State::Stopped;
            inner.worker.take()
        };

        // join outside the lock: the delivery thread never takes it, but a
        // slow callback should not block readers of the stats either
        self.running.store(false, Ordering::Release);
        if let Some(worker) = worker {
            if worker.join().is_err() {
                error!(sensor = %self.name, "delivery thread panicked");
            }
        }

        self.injected(FailurePoint::Stop, LifecycleStage::Stop)
    }

    fn close(&self) -> Result<(), ContractError> {
        let mut inner = self.lock();
        inner.stats.closes += 1;
        self.injected(FailurePoint::Close, LifecycleStage::Close)?;

        match inner.state {
            State::Opened | State::Stopped => {
                inner.state = State::Idle;
                inner.profile = None;
                Ok(())
            }
            state => Err(self.wrong_state(LifecycleStage::Close, state)),
        }
    }
}

impl Drop for MockSensor {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(worker) = self.lock().worker.take() {
            let _ = worker.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{PixelFormat, StreamKind};
    use std::sync::atomic::AtomicU64;

    fn profile(fps: u32) -> StreamProfile {
        StreamProfile {
            kind: StreamKind::Depth,
            format: PixelFormat::Z16,
            fps,
            width: 640,
            height: 480,
        }
    }

    fn counting_callback(count: &Arc<AtomicU64>) -> FrameCallback {
        let count = count.clone();
        Arc::new(move |_: &FrameEvent| {
            count.fetch_add(1, Ordering::Relaxed);
        })
    }

    #[test]
    fn test_delivers_at_profile_rate() {
        let sensor = MockSensor::new("depth", vec![profile(100)], MockSensorConfig::default());
        let count = Arc::new(AtomicU64::new(0));

        sensor.open(&profile(100)).unwrap();
        sensor.start(counting_callback(&count)).unwrap();
        thread::sleep(Duration::from_millis(500));
        sensor.stop().unwrap();
        sensor.close().unwrap();

        let delivered = count.load(Ordering::Relaxed);
        assert!((45..=56).contains(&delivered), "delivered {delivered}");
        assert!(sensor.is_closed());
        assert!(!sensor.is_streaming());
    }

    #[test]
    fn test_no_callback_after_stop() {
        let sensor = MockSensor::new("depth", vec![profile(200)], MockSensorConfig::default());
        let count = Arc::new(AtomicU64::new(0));

        sensor.open(&profile(200)).unwrap();
        sensor.start(counting_callback(&count)).unwrap();
        thread::sleep(Duration::from_millis(50));
        sensor.stop().unwrap();

        let at_stop = count.load(Ordering::Relaxed);
        thread::sleep(Duration::from_millis(50));
        assert_eq!(count.load(Ordering::Relaxed), at_stop);
    }

    #[test]
    fn test_frame_numbers_and_drops() {
        let sensor = MockSensor::new(
            "depth",
            vec![profile(200)],
            MockSensorConfig {
                drop_every: Some(5),
                first_frame_number: 1,
                ..Default::default()
            },
        );
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_cb = seen.clone();

        sensor.open(&profile(200)).unwrap();
        sensor
            .start(Arc::new(move |frame: &FrameEvent| {
                seen_cb.lock().unwrap().push(frame.frame_number);
            }))
            .unwrap();
        thread::sleep(Duration::from_millis(100));
        sensor.stop().unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(&seen[..4], &[1, 2, 3, 4]);
        assert!(seen.iter().all(|n| n % 5 != 0));
    }

    #[test]
    fn test_open_rejects_unknown_profile_and_busy() {
        let sensor = MockSensor::new("depth", vec![profile(30)], MockSensorConfig::default());

        assert!(sensor.open(&profile(60)).is_err());
        sensor.open(&profile(30)).unwrap();
        let busy = sensor.open(&profile(30)).unwrap_err();
        assert!(busy.to_string().contains("busy"));
        sensor.close().unwrap();
        sensor.open(&profile(30)).unwrap();
        assert_eq!(sensor.stats().opens, 4);
    }

    #[test]
    fn test_close_while_streaming_is_rejected() {
        let sensor = MockSensor::new("depth", vec![profile(30)], MockSensorConfig::default());
        sensor.open(&profile(30)).unwrap();
        sensor.start(Arc::new(|_: &FrameEvent| {})).unwrap();

        assert!(sensor.close().is_err());
        sensor.stop().unwrap();
        sensor.close().unwrap();
    }

    #[test]
    fn test_stop_failure_still_halts_delivery() {
        let sensor = MockSensor::new(
            "depth",
            vec![profile(30)],
            MockSensorConfig {
                fail_at: Some(FailurePoint::Stop),
                ..Default::default()
            },
        );
        sensor.open(&profile(30)).unwrap();
        sensor.start(Arc::new(|_: &FrameEvent| {})).unwrap();

        assert!(sensor.stop().is_err());
        assert!(!sensor.is_streaming());
    }

    #[test]
    fn test_out_of_range_start_delay_delivers_nothing_and_stops() {
        let sensor = MockSensor::new(
            "depth",
            vec![profile(100)],
            MockSensorConfig {
                start_delay: Duration::MAX,
                ..Default::default()
            },
        );
        let count = Arc::new(AtomicU64::new(0));

        sensor.open(&profile(100)).unwrap();
        sensor.start(counting_callback(&count)).unwrap();
        thread::sleep(Duration::from_millis(50));
        // the delivery thread must still be alive and joinable without panic
        sensor.stop().unwrap();
        sensor.close().unwrap();

        assert_eq!(count.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_options() {
        let sensor = MockSensor::new("rgb", vec![profile(30)], MockSensorConfig::default())
            .with_options([SensorOption::EnableAutoExposure]);

        assert!(sensor.supports_option(SensorOption::EnableAutoExposure));
        assert!(!sensor.supports_option(SensorOption::AutoExposurePriority));

        sensor
            .set_option(SensorOption::EnableAutoExposure, 1.0)
            .unwrap();
        assert_eq!(sensor.option(SensorOption::EnableAutoExposure), Some(1.0));

        let err = sensor
            .set_option(SensorOption::AutoExposurePriority, 0.0)
            .unwrap_err();
        assert!(matches!(err, ContractError::OptionUnsupported { .. }));
    }
}
