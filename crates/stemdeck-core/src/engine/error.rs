//! Playback engine error types

use thiserror::Error;

use crate::types::TrackId;

/// Errors returned by engine commands
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineError {
    /// No session bound, or its reference track never decoded
    #[error("Playback session is not ready (no reference track loaded)")]
    NotReady,

    /// Command addressed a track that is not part of the session
    #[error("Track {0} not found in session")]
    TrackNotFound(TrackId),
}

/// Result type for engine commands
pub type EngineResult<T> = Result<T, EngineError>;
