//! wl-core: Shared types for the WaveLoom timeline editor
//!
//! This crate provides the foundational data model used across all
//! WaveLoom crates: timeline time spans, clips, tracks and the track
//! list, and the common error type.

mod clip;
mod error;
mod time;
mod track;

pub use clip::*;
pub use error::*;
pub use time::*;
pub use track::*;
