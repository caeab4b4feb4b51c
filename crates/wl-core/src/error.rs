//! Error types for WaveLoom

use thiserror::Error;

use crate::{ClipId, TrackId};

/// Core error type
#[derive(Error, Debug)]
pub enum WlError {
    #[error("track not found: {0:?}")]
    TrackNotFound(TrackId),

    #[error("clip not found: {0:?}")]
    ClipNotFound(ClipId),

    #[error("track {0:?} does not hold clips")]
    NotAWaveTrack(TrackId),

    #[error("State error: {0}")]
    State(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias
pub type WlResult<T> = Result<T, WlError>;
