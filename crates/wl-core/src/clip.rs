//! Audio clips
//!
//! A clip is an immutable-identity, mutable-position audio segment owned
//! by exactly one wave track at any instant. Length is held in samples at
//! the clip's own rate; the end time is derived from it.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::TimeSpan;

/// Unique clip ID generator
static NEXT_CLIP_ID: AtomicU64 = AtomicU64::new(1);

/// Unique clip identifier; identity survives moves between tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClipId(pub u64);

fn new_clip_id() -> ClipId {
    ClipId(NEXT_CLIP_ID.fetch_add(1, Ordering::Relaxed))
}

/// Audio clip on a wave track
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Clip {
    /// Unique ID
    pub id: ClipId,
    /// Display name
    pub name: String,
    /// Start position on the timeline (seconds)
    pub start: f64,
    /// Length in samples at `rate`
    pub len_samples: u64,
    /// Sample rate of the clip's audio
    pub rate: f64,
    /// Audio content needs re-rendering (set after a resample)
    pub changed: bool,
}

impl Clip {
    pub fn new(name: &str, start: f64, len_samples: u64, rate: f64) -> Self {
        Self {
            id: new_clip_id(),
            name: name.to_string(),
            start,
            len_samples,
            rate,
            changed: false,
        }
    }

    /// Create a clip spanning `[start, end)` at `rate`
    pub fn from_span(name: &str, start: f64, end: f64, rate: f64) -> Self {
        Self::new(name, start, ((end - start) * rate).round() as u64, rate)
    }

    /// Duration in seconds
    #[inline]
    pub fn duration(&self) -> f64 {
        self.len_samples as f64 / self.rate
    }

    /// End position on the timeline (seconds)
    #[inline]
    pub fn end(&self) -> f64 {
        self.start + self.duration()
    }

    /// Occupied interval on the timeline
    #[inline]
    pub fn span(&self) -> TimeSpan {
        TimeSpan::new(self.start, self.end())
    }

    /// Move the clip by `delta` seconds
    #[inline]
    pub fn offset(&mut self, delta: f64) {
        self.start += delta;
    }

    /// Adjust the clip's audio to `new_rate`, preserving its duration
    pub fn resample(&mut self, new_rate: f64) {
        if (self.rate - new_rate).abs() < f64::EPSILON {
            return;
        }
        self.len_samples = (self.duration() * new_rate).round() as u64;
        self.rate = new_rate;
        self.changed = true;
    }
}
