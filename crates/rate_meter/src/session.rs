//! Rate measurement session
//!
//! Runs exactly one measurement for one (target, profile, window) triple:
//! open, start, warm-up, count, stop, close. One shot, no retries.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use contracts::{FrameCallback, FrameEvent, LifecycleStage, MeasurementTarget, StreamProfile};
use tracing::{debug, error, info, instrument};

use crate::collector::{FrameEventCollector, FrameGap};
use crate::error::{MeasureError, Result};

/// Warm-up window used when none is configured
pub const DEFAULT_WARMUP: Duration = Duration::from_secs(4);

/// Result of one measurement run
#[derive(Debug, Clone)]
pub struct Measurement {
    /// Profile the target was opened with
    pub profile: StreamProfile,

    /// Frames counted in steady state divided by the window length
    pub achieved_fps: f64,

    /// Time from just after start to the first delivered frame
    pub first_frame_latency: Option<Duration>,

    /// Frames counted in steady state
    pub counted_frames: u64,

    /// Frames delivered over the whole run
    pub delivered_frames: u64,

    /// Sequence gaps seen over the whole run
    pub frame_gaps: Vec<FrameGap>,

    /// Counting window
    pub window: Duration,
}

/// Measurement session
///
/// Phase transitions run on the calling thread with blocking sleeps. Frames
/// arrive on the target's delivery thread.
#[derive(Debug, Clone)]
pub struct RateMeasurementSession {
    warmup: Duration,
}

impl RateMeasurementSession {
    pub fn new(warmup: Duration) -> Self {
        Self { warmup }
    }

    pub fn warmup(&self) -> Duration {
        self.warmup
    }

    /// Measure the achieved frame rate of `target` opened with `profile`
    ///
    /// # Errors
    /// - zero `window`
    /// - open or start failure; the target is closed again before returning
    /// - stop or close failure; the count is discarded
    #[instrument(
        name = "rate_session_measure",
        skip(self, target, profile),
        fields(sensor = %target.name(), fps = profile.fps, window_secs = window.as_secs_f64())
    )]
    pub fn measure(
        &self,
        target: &dyn MeasurementTarget,
        profile: &StreamProfile,
        window: Duration,
    ) -> Result<Measurement> {
        if window.is_zero() {
            return Err(MeasureError::InvalidWindow(window));
        }

        let mut opened = OpenedTarget::open(target, profile)?;

        let collector = Arc::new(FrameEventCollector::new(target.name()));
        let callback: FrameCallback = {
            let collector = Arc::clone(&collector);
            Arc::new(move |frame: &FrameEvent| collector.on_frame_delivered(frame))
        };

        opened.start(callback)?;
        collector.reset_clock();

        debug!(warmup_secs = self.warmup.as_secs_f64(), "warming up");
        thread::sleep(self.warmup);

        collector.enter_steady_state();
        thread::sleep(window);
        collector.exit_steady_state();

        opened.shutdown()?;

        let state = collector.snapshot();
        let achieved_fps = state.counted_frames as f64 / window.as_secs_f64();

        info!(
            requested_fps = profile.fps,
            achieved_fps = format!("{achieved_fps:.1}"),
            counted_frames = state.counted_frames,
            first_frame_latency_ms = state.first_frame_latency.map(|l| l.as_secs_f64() * 1000.0),
            frame_drops = state.gaps.len(),
            "measurement finished"
        );

        Ok(Measurement {
            profile: *profile,
            achieved_fps,
            first_frame_latency: state.first_frame_latency,
            counted_frames: state.counted_frames,
            delivered_frames: state.delivered_frames,
            frame_gaps: state.gaps,
            window,
        })
    }
}

impl Default for RateMeasurementSession {
    fn default() -> Self {
        Self::new(DEFAULT_WARMUP)
    }
}

/// An opened target
///
/// Guarantees the target is stopped (if started) and closed on every exit
/// path. `shutdown` reports teardown failures; dropping the guard without
/// calling it only logs them.
pub struct OpenedTarget<'a> {
    target: &'a dyn MeasurementTarget,
    started: bool,
    closed: bool,
}

impl<'a> OpenedTarget<'a> {
    /// Open `target` against `profile`
    pub fn open(target: &'a dyn MeasurementTarget, profile: &StreamProfile) -> Result<Self> {
        target.open(profile).map_err(|source| MeasureError::Open {
            target: target.name().to_string(),
            profile: *profile,
            source,
        })?;

        debug!(target_name = %target.name(), profile = %profile, "target opened");

        Ok(Self {
            target,
            started: false,
            closed: false,
        })
    }

    /// Start frame delivery
    pub fn start(&mut self, callback: FrameCallback) -> Result<()> {
        self.target
            .start(callback)
            .map_err(|source| MeasureError::Start {
                target: self.target.name().to_string(),
                source,
            })?;
        self.started = true;
        Ok(())
    }

    /// Stop (if started) then close
    ///
    /// Close is attempted even when stop fails.
    pub fn shutdown(mut self) -> Result<()> {
        let stopped = if self.started {
            self.started = false;
            self.target.stop()
        } else {
            Ok(())
        };
        let closed = self.target.close();
        self.closed = true;

        let name = self.target.name().to_string();
        match (stopped, closed) {
            (Err(source), closed) => {
                if let Err(e) = closed {
                    error!(target_name = %name, error = %e, "close after failed stop also failed");
                }
                Err(MeasureError::Teardown {
                    target: name,
                    stage: LifecycleStage::Stop,
                    source,
                })
            }
            (Ok(()), Err(source)) => Err(MeasureError::Teardown {
                target: name,
                stage: LifecycleStage::Close,
                source,
            }),
            (Ok(()), Ok(())) => Ok(()),
        }
    }
}

impl Drop for OpenedTarget<'_> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }

        let name = self.target.name();
        if self.started {
            if let Err(e) = self.target.stop() {
                error!(target_name = %name, error = %e, "failed to stop target during cleanup");
            }
        }
        if let Err(e) = self.target.close() {
            error!(target_name = %name, error = %e, "failed to close target during cleanup");
        }
    }
}
