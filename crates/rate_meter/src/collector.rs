//! Frame event collector
//!
//! Observer invoked on the target's delivery thread for every frame. Owns the
//! steady-state gate, the frame counter, first-frame latency and sequence gap
//! detection for one measurement run.
//!
//! ## Boundary policy
//!
//! All state sits behind one mutex. A frame is counted iff the steady-state
//! flag is set when its callback acquires the lock. A frame racing with
//! `enter_steady_state`/`exit_steady_state` may land on either side, so the
//! count is exact up to one frame at each toggle; no increment is ever lost.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use contracts::FrameEvent;
use serde::Serialize;
use tracing::{trace, warn};

use crate::stopwatch::Stopwatch;

/// A detected gap in frame numbering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FrameGap {
    /// Frame number that should have arrived
    pub expected: u64,
    /// Frame number that did arrive
    pub actual: u64,
}

impl FrameGap {
    /// Number of frames lost in this gap
    pub fn missing(&self) -> u64 {
        self.actual - self.expected
    }
}

/// Mutable per-run state
#[derive(Debug, Clone, Default)]
pub struct CollectorState {
    pub seen_first_frame: bool,
    pub prev_sequence_number: u64,
    pub in_steady_state: bool,
    pub counted_frames: u64,
    /// Every frame seen, steady state or not
    pub delivered_frames: u64,
    pub first_frame_latency: Option<Duration>,
    pub gaps: Vec<FrameGap>,
}

struct Inner {
    state: CollectorState,
    clock: Stopwatch,
}

/// Frame event collector
///
/// Shared between the orchestrator and the delivery callback through an `Arc`.
pub struct FrameEventCollector {
    target: String,
    inner: Mutex<Inner>,
}

impl FrameEventCollector {
    /// Create a collector for one run; the latency clock starts now
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            inner: Mutex::new(Inner {
                state: CollectorState::default(),
                clock: Stopwatch::new(),
            }),
        }
    }

    /// Delivery callback body
    pub fn on_frame_delivered(&self, frame: &FrameEvent) {
        let current = frame.frame_number;

        let (gap, latency) = {
            let mut inner = self.lock();
            let elapsed = inner.clock.elapsed();
            let state = &mut inner.state;

            let mut gap = None;
            let mut latency = None;
            if !state.seen_first_frame {
                state.seen_first_frame = true;
                state.first_frame_latency = Some(elapsed);
                latency = Some(elapsed);
            } else if current > state.prev_sequence_number.saturating_add(1) {
                let g = FrameGap {
                    expected: state.prev_sequence_number + 1,
                    actual: current,
                };
                state.gaps.push(g);
                gap = Some(g);
            }

            if state.in_steady_state {
                state.counted_frames += 1;
            }
            state.delivered_frames += 1;
            state.prev_sequence_number = current;

            (gap, latency)
        };

        observability::record_frame_delivered(&self.target);

        if let Some(latency) = latency {
            trace!(
                target_name = %self.target,
                frame_number = current,
                latency_ms = latency.as_secs_f64() * 1000.0,
                "first frame received"
            );
        }

        if let Some(gap) = gap {
            warn!(
                target_name = %self.target,
                current_frame = gap.actual,
                previous_frame = gap.expected - 1,
                missing = gap.missing(),
                "frame drop detected"
            );
            observability::record_frame_drop(&self.target, gap.missing());
        }
    }

    /// Re-zero the latency clock
    pub fn reset_clock(&self) {
        self.lock().clock.reset();
    }

    /// Start counting frames
    pub fn enter_steady_state(&self) {
        self.lock().state.in_steady_state = true;
    }

    /// Stop counting frames
    pub fn exit_steady_state(&self) {
        self.lock().state.in_steady_state = false;
    }

    pub fn in_steady_state(&self) -> bool {
        self.lock().state.in_steady_state
    }

    pub fn counted_frames(&self) -> u64 {
        self.lock().state.counted_frames
    }

    /// Time from the last clock reset to the first frame, if any arrived
    pub fn first_frame_latency(&self) -> Option<Duration> {
        self.lock().state.first_frame_latency
    }

    pub fn frame_gaps(&self) -> Vec<FrameGap> {
        self.lock().state.gaps.clone()
    }

    /// Copy of the whole state
    pub fn snapshot(&self) -> CollectorState {
        self.lock().state.clone()
    }

    /// Sensor name used in logs and metric labels
    pub fn target(&self) -> &str {
        &self.target
    }

    // A panicking callback must not wedge the orchestrator.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
