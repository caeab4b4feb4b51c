//! Time types for the timeline
//!
//! Timeline positions are seconds (f64). Clip lengths are carried in
//! samples at the clip's own rate; drag deltas are quantized to the
//! sample grid at the drag boundary so repeated edits cannot accumulate
//! sub-sample drift.

use serde::{Deserialize, Serialize};

/// Convert a time in seconds to the nearest sample index at `rate`.
#[inline]
pub fn seconds_to_samples(seconds: f64, rate: f64) -> i64 {
    (seconds * rate).round() as i64
}

/// Quantize a time in seconds to the sample grid of `rate`.
#[inline]
pub fn quantize_to_rate(seconds: f64, rate: f64) -> f64 {
    (seconds * rate).round() / rate
}

/// Half-open time interval `[start, end)` in seconds
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TimeSpan {
    pub start: f64,
    pub end: f64,
}

impl TimeSpan {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    #[inline]
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    #[inline]
    pub fn contains(&self, t: f64) -> bool {
        t >= self.start && t < self.end
    }

    #[inline]
    pub fn overlaps(&self, other: &TimeSpan) -> bool {
        self.start < other.end && other.start < self.end
    }

    #[inline]
    pub fn shift(&mut self, delta: f64) {
        self.start += delta;
        self.end += delta;
    }

    #[inline]
    pub fn shifted(&self, delta: f64) -> Self {
        Self::new(self.start + delta, self.end + delta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantize_to_rate() {
        // 44.1kHz: 0.5s is exactly 22050 samples
        assert_eq!(quantize_to_rate(0.5, 44100.0), 0.5);
        // A time between sample points rounds to the nearest one
        let q = quantize_to_rate(1.00001, 44100.0);
        assert_eq!((q * 44100.0).round(), q * 44100.0);
    }

    #[test]
    fn test_span_overlap() {
        let a = TimeSpan::new(2.0, 5.0);
        assert!(a.overlaps(&TimeSpan::new(4.0, 6.0)));
        assert!(!a.overlaps(&TimeSpan::new(5.0, 6.0))); // touching is not overlap
        assert!(a.contains(2.0));
        assert!(!a.contains(5.0));
    }
}
