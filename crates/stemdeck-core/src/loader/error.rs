//! Loader error types

use std::path::PathBuf;

use thiserror::Error;

/// Archive retrieval failures (terminal for the load)
#[derive(Error, Debug)]
pub enum FetchError {
    /// No stem set with this id
    #[error("Stem set not found: {0}")]
    NotFound(String),

    /// Id that cannot name a stem set (empty, path separators, ...)
    #[error("Invalid stem set id: {0:?}")]
    InvalidId(String),

    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Stem bundle that is not a readable zip
    #[error("Invalid stem bundle {path:?}: {source}")]
    Bundle {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    /// The unpack task itself died
    #[error("Archive worker failed: {0}")]
    Worker(String),
}

/// Failure to decode one stem (the stem is dropped, the load continues)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Container format not recognised
    #[error("Unsupported audio format: {0}")]
    Probe(String),

    #[error("No decodable audio track in payload")]
    NoAudioTrack,

    #[error("Decoder error: {0}")]
    Codec(String),

    /// Decoded to nothing playable (no frames, channels or sample rate)
    #[error("Decoded audio is empty")]
    Empty,

    /// The decode task itself died
    #[error("Decode worker failed: {0}")]
    Worker(String),
}

/// Failure of a whole session load
#[derive(Error, Debug)]
pub enum LoadError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The reference stem (drums) is absent or failed to decode
    #[error("Reference stem missing or undecodable; session not ready")]
    MissingReference,

    /// A newer load started before this one finished
    #[error("Load superseded by a newer request")]
    Superseded,
}
