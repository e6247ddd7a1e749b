//! Tolerance evaluation
//!
//! Pass iff `requested * (1 - f) <= achieved <= requested * (1 + f)`, where the
//! fraction `f` comes from a [`TolerancePolicy`] keyed by stream kind and
//! requested rate.

use contracts::{StreamKind, TolerancePolicy};
use serde::Serialize;

/// Verdict of one tolerance check
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ToleranceResult {
    pub requested_fps: f64,
    pub achieved_fps: f64,
    pub tolerance_fraction: f64,
    pub passed: bool,
}

impl ToleranceResult {
    /// Lowest passing rate
    pub fn lower_bound(&self) -> f64 {
        self.requested_fps * (1.0 - self.tolerance_fraction)
    }

    /// Highest passing rate
    pub fn upper_bound(&self) -> f64 {
        self.requested_fps * (1.0 + self.tolerance_fraction)
    }
}

/// Applies a tolerance policy to achieved rates
#[derive(Debug, Clone, Default)]
pub struct ToleranceEvaluator {
    policy: TolerancePolicy,
}

impl ToleranceEvaluator {
    pub fn new(policy: TolerancePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &TolerancePolicy {
        &self.policy
    }

    /// Bounds check with an explicit fraction
    pub fn evaluate(requested_fps: f64, achieved_fps: f64, tolerance_fraction: f64) -> bool {
        achieved_fps >= requested_fps * (1.0 - tolerance_fraction)
            && achieved_fps <= requested_fps * (1.0 + tolerance_fraction)
    }

    /// Look up the fraction for `(kind, requested_fps)` and evaluate
    pub fn check(&self, kind: StreamKind, requested_fps: u32, achieved_fps: f64) -> ToleranceResult {
        let tolerance_fraction = self.policy.fraction_for(kind, requested_fps);
        let requested = f64::from(requested_fps);
        ToleranceResult {
            requested_fps: requested,
            achieved_fps,
            tolerance_fraction,
            passed: Self::evaluate(requested, achieved_fps, tolerance_fraction),
        }
    }
}
