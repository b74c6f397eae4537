//! Fixed-point scheduler clock
//!
//! Elapsed time is kept in whole milliseconds. Deltas arrive as
//! [`Duration`]s (or raw milliseconds), are multiplied by the clock's time
//! scale, and any sub-millisecond remainder is carried into the next pass so
//! that thousands of small updates sum exactly.

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const NANOS_PER_MILLI: u64 = 1_000_000;

/// Monotonic elapsed-time clock advanced once per update pass
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Clock {
    elapsed_ms: u64,
    delta_ms: u64,
    last_delta_ms: u64,
    update_count: u64,
    time_scale: f64,
    carry_ns: u64,
}

impl Clock {
    pub fn new(time_scale: f64) -> Self {
        Self {
            elapsed_ms: 0,
            delta_ms: 0,
            last_delta_ms: 0,
            update_count: 0,
            time_scale: sanitize_scale(time_scale),
            carry_ns: 0,
        }
    }

    /// Record the delta for a new pass and return it in scaled milliseconds.
    ///
    /// Elapsed time is not touched until [`Clock::advance`].
    pub fn begin_pass(&mut self, delta: Duration) -> u64 {
        let scaled = self.scale_nanos(delta).saturating_add(self.carry_ns);
        self.carry_ns = scaled % NANOS_PER_MILLI;
        self.last_delta_ms = self.delta_ms;
        self.delta_ms = scaled / NANOS_PER_MILLI;
        self.delta_ms
    }

    /// Apply the current delta to the elapsed time
    pub fn advance(&mut self) {
        self.elapsed_ms = self.elapsed_ms.saturating_add(self.delta_ms);
    }

    /// Close the pass
    pub fn end_pass(&mut self) {
        self.update_count += 1;
    }

    fn scale_nanos(&self, delta: Duration) -> u64 {
        let raw = u64::try_from(delta.as_nanos()).unwrap_or(u64::MAX);
        if self.time_scale == 1.0 {
            raw
        } else {
            // float-to-int `as` saturates, so huge products clamp to u64::MAX
            (raw as f64 * self.time_scale) as u64
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    /// Elapsed time in seconds, for display only
    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed_ms as f64 / 1000.0
    }

    pub fn delta_ms(&self) -> u64 {
        self.delta_ms
    }

    pub fn last_delta_ms(&self) -> u64 {
        self.last_delta_ms
    }

    pub fn update_count(&self) -> u64 {
        self.update_count
    }

    pub fn time_scale(&self) -> f64 {
        self.time_scale
    }

    /// Change the multiplier applied to future deltas.
    ///
    /// Negative, NaN and infinite scales are treated as zero.
    pub fn set_time_scale(&mut self, time_scale: f64) {
        self.time_scale = sanitize_scale(time_scale);
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new(1.0)
    }
}

fn sanitize_scale(scale: f64) -> f64 {
    if scale.is_finite() && scale > 0.0 {
        scale
    } else {
        0.0
    }
}
