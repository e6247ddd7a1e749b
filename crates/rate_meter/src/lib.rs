//! # Rate Meter
//!
//! Steady-state frame-rate measurement.
//!
//! Responsibilities:
//! - Open a target at one profile and drive it through warm-up and counting
//! - Count frames delivered on the target's own thread
//! - Detect frame-number gaps and first-frame latency
//! - Compare the achieved rate against a tolerance policy
//!
//! ## Example
//!
//! ```ignore
//! use rate_meter::{RateMeasurementSession, ToleranceEvaluator};
//!
//! let session = RateMeasurementSession::default();
//! let m = session.measure(sensor.as_ref(), &profile, Duration::from_secs(10))?;
//! let verdict = ToleranceEvaluator::default().check(profile.kind, profile.fps, m.achieved_fps);
//! ```

mod collector;
mod error;
mod session;
mod stopwatch;
mod tolerance;

pub use collector::{CollectorState, FrameEventCollector, FrameGap};
pub use error::{MeasureError, Result};
pub use session::{Measurement, OpenedTarget, RateMeasurementSession, DEFAULT_WARMUP};
pub use stopwatch::Stopwatch;
pub use tolerance::{ToleranceEvaluator, ToleranceResult};
