//! Timeline geometry
//!
//! Pure mapping between pointer pixel positions and timeline time under
//! the current zoom and scroll state. The mapping is affine and exact up
//! to floating-point rounding; everything else in the drag engine works
//! in seconds and converts at this boundary.

use serde::{Deserialize, Serialize};

/// Horizontal view state of the track area
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Viewport {
    /// Time at the left edge of the track area (seconds)
    pub left_time: f64,
    /// Zoom level (pixels per second)
    pub pixels_per_second: f64,
    /// Width of the track area (pixels)
    pub width: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            left_time: 0.0,
            pixels_per_second: 100.0,
            width: 800.0,
        }
    }
}

impl Viewport {
    pub fn new(left_time: f64, pixels_per_second: f64, width: f64) -> Self {
        Self {
            left_time,
            pixels_per_second,
            width,
        }
    }

    /// Time under pixel column `x`
    #[inline]
    pub fn time_at(&self, x: f64) -> f64 {
        self.left_time + x / self.pixels_per_second
    }

    /// Pixel column of time `t`
    #[inline]
    pub fn pixel_of(&self, t: f64) -> f64 {
        (t - self.left_time) * self.pixels_per_second
    }

    /// Duration covered by one pixel at the current zoom
    #[inline]
    pub fn time_per_pixel(&self) -> f64 {
        1.0 / self.pixels_per_second
    }

    /// Whether a pixel column lies inside the track area
    #[inline]
    pub fn contains_x(&self, x: f64) -> bool {
        x >= 0.0 && x < self.width
    }
}
