//! Audio output for bound Tracks
//!
//! - [`Mixer`] / [`SharedMixer`]: sums voices, implements `HandleFactory`
//! - [`VoiceHandle`]: the `PlaybackHandle` the engine drives
//! - [`AudioOutput`]: whatever pulls blocks from the mixer, either a CPAL
//!   device stream or the silent [`NullOutput`] clock

#[cfg(feature = "cpal-backend")]
mod cpal_backend;
mod error;
mod mixer;
mod null;
mod voice;

#[cfg(feature = "cpal-backend")]
pub use cpal_backend::CpalOutput;
pub use error::{AudioError, AudioResult};
pub use mixer::{Mixer, SharedMixer};
pub use null::NullOutput;
pub use voice::{VoiceAtomics, VoiceHandle};

/// A running output pulling from a [`SharedMixer`]
pub enum AudioOutput {
    #[cfg(feature = "cpal-backend")]
    Cpal(CpalOutput),
    Null(NullOutput),
}

impl AudioOutput {
    /// Start the best available output
    ///
    /// With `cpal-backend`, the default device is tried first; if it cannot
    /// be opened the silent clock is used instead so playback still works.
    pub fn start(mixer: SharedMixer, prefer_device: bool) -> AudioResult<Self> {
        if prefer_device {
            if let Some(output) = open_device(&mixer) {
                return Ok(output);
            }
        }
        NullOutput::start(mixer).map(AudioOutput::Null)
    }

    pub fn sample_rate(&self) -> u32 {
        match self {
            #[cfg(feature = "cpal-backend")]
            AudioOutput::Cpal(output) => output.sample_rate(),
            AudioOutput::Null(output) => output.sample_rate(),
        }
    }

    /// Short description for status lines
    pub fn name(&self) -> &'static str {
        match self {
            #[cfg(feature = "cpal-backend")]
            AudioOutput::Cpal(_) => "device",
            AudioOutput::Null(_) => "null",
        }
    }
}

#[cfg(feature = "cpal-backend")]
fn open_device(mixer: &SharedMixer) -> Option<AudioOutput> {
    match CpalOutput::start(mixer.clone()) {
        Ok(output) => Some(AudioOutput::Cpal(output)),
        Err(e) => {
            log::warn!("Audio device unavailable ({}), using null output", e);
            None
        }
    }
}

#[cfg(not(feature = "cpal-backend"))]
fn open_device(_mixer: &SharedMixer) -> Option<AudioOutput> {
    log::info!("Built without cpal-backend, using null output");
    None
}
