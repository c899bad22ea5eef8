//! Playback synchronization engine
//!
//! One logical transport clock over many playback handles:
//!
//! - Commands (play/pause/stop/seek/volume/mute) fan out to every Track in a
//!   single synchronous pass.
//! - Position and duration are read from the reference Track only.
//! - All state the UI sees is published through a `watch` channel; the
//!   engine is its only writer.

mod engine;
mod error;
mod state;

pub use engine::PlaybackEngine;
pub use error::{EngineError, EngineResult};
pub use state::{progress_fraction, PlaybackSnapshot, TransportState};
