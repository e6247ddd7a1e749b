//! Monotonic elapsed-time source.

use std::time::{Duration, Instant};

/// Stopwatch backed by a monotonic clock
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    start: Instant,
}

impl Stopwatch {
    /// Start a stopwatch at the current instant
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Capture a new zero reference
    pub fn reset(&mut self) {
        self.start = Instant::now();
    }

    /// Time since the last reset
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Default for Stopwatch {
    fn default() -> Self {
        Self::new()
    }
}
