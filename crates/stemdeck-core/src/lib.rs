//! Stemdeck Core - synchronized multi-stem playback
//!
//! Loads a stem set (drums, bass, other, vocals), keeps every stem on one
//! transport clock and precomputes the waveform envelopes front ends draw.

pub mod config;
pub mod engine;
pub mod handle;
pub mod loader;
pub mod output;
pub mod session;
pub mod track;
pub mod types;
pub mod waveform;

#[cfg(test)]
mod testing;

pub use engine::{PlaybackEngine, PlaybackSnapshot, TransportState};
pub use handle::{HandleEvent, HandleFactory, PlaybackHandle};
pub use session::SessionController;
pub use track::Track;
pub use types::*;
