//! Mixer voices and the playback handles that control them
//!
//! A voice is the audio-thread side of a Track: the decoded buffer plus a
//! block of atomics holding its transport state. The matching
//! [`VoiceHandle`] is the control side handed to the engine. Neither side
//! ever blocks the other.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use crate::handle::PlaybackHandle;
use crate::types::DecodedBuffer;

/// Lock-free voice state shared between handle and mixer
///
/// All operations use `Ordering::Relaxed`; only visibility is needed.
#[derive(Debug)]
pub struct VoiceAtomics {
    /// Playhead in frames
    frame: AtomicU64,
    playing: AtomicBool,
    /// `f32` volume stored as raw bits
    volume: AtomicU32,
    muted: AtomicBool,
    /// Set when the handle is dropped; the mixer prunes released voices
    released: AtomicBool,
}

impl VoiceAtomics {
    fn new() -> Self {
        Self {
            frame: AtomicU64::new(0),
            playing: AtomicBool::new(false),
            volume: AtomicU32::new(1.0f32.to_bits()),
            muted: AtomicBool::new(false),
            released: AtomicBool::new(false),
        }
    }

    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn volume(&self) -> f32 {
        f32::from_bits(self.volume.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn is_muted(&self) -> bool {
        self.muted.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Relaxed)
    }

    /// Gain the mixer applies (0 while muted)
    #[inline]
    pub fn gain(&self) -> f32 {
        if self.is_muted() {
            0.0
        } else {
            self.volume()
        }
    }

    /// Move the playhead from `from` to `to` unless someone else moved it first
    ///
    /// Used by the mixer so a seek issued mid-block is not overwritten by
    /// the block's own advance.
    #[inline]
    pub(crate) fn advance(&self, from: u64, to: u64) -> bool {
        self.frame
            .compare_exchange(from, to, Ordering::Relaxed, Ordering::Relaxed)
            .is_ok()
    }

    #[inline]
    pub(crate) fn stop(&self) {
        self.playing.store(false, Ordering::Relaxed);
    }
}

/// Audio-thread side of a bound Track
pub(crate) struct Voice {
    pub(crate) buffer: Arc<DecodedBuffer>,
    pub(crate) atomics: Arc<VoiceAtomics>,
}

impl Voice {
    /// Create a voice rendered at `output_rate` and its control handle
    pub(crate) fn pair(buffer: Arc<DecodedBuffer>, output_rate: u32) -> (Voice, VoiceHandle) {
        let atomics = Arc::new(VoiceAtomics::new());
        let handle = VoiceHandle {
            atomics: Arc::clone(&atomics),
            sample_rate: buffer.sample_rate(),
            frames: buffer.sample_count() as u64,
            on_clock: buffer.sample_rate() == output_rate,
        };
        (Voice { buffer, atomics }, handle)
    }
}

/// Control side of a mixer voice
///
/// Dropping the handle releases the voice.
#[derive(Debug)]
pub struct VoiceHandle {
    atomics: Arc<VoiceAtomics>,
    sample_rate: u32,
    frames: u64,
    /// Buffer rate matches the mixer rate
    on_clock: bool,
}

impl VoiceHandle {
    /// Shared state, for meters and diagnostics
    pub fn atomics(&self) -> &Arc<VoiceAtomics> {
        &self.atomics
    }
}

impl PlaybackHandle for VoiceHandle {
    fn play(&mut self) {
        // Restarting a finished voice is the caller's business (seek first)
        if self.atomics.frame() < self.frames {
            self.atomics.playing.store(true, Ordering::Relaxed);
        }
    }

    fn pause(&mut self) {
        self.atomics.stop();
    }

    fn is_playing(&self) -> bool {
        self.atomics.is_playing()
    }

    fn current_time(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.atomics.frame() as f64 / self.sample_rate as f64
    }

    fn set_current_time(&mut self, seconds: f64) {
        let target = if seconds.is_finite() && seconds > 0.0 {
            ((seconds * self.sample_rate as f64).round() as u64).min(self.frames)
        } else {
            0
        };
        self.atomics.frame.store(target, Ordering::Relaxed);
    }

    fn volume(&self) -> f32 {
        self.atomics.volume()
    }

    fn set_volume(&mut self, volume: f32) {
        self.atomics
            .volume
            .store(volume.clamp(0.0, 1.0).to_bits(), Ordering::Relaxed);
    }

    fn muted(&self) -> bool {
        self.atomics.is_muted()
    }

    fn set_muted(&mut self, muted: bool) {
        self.atomics.muted.store(muted, Ordering::Relaxed);
    }

    fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return f64::NAN;
        }
        self.frames as f64 / self.sample_rate as f64
    }

    fn follows_session_clock(&self) -> bool {
        self.on_clock
    }
}

impl Drop for VoiceHandle {
    fn drop(&mut self) {
        self.atomics.stop();
        self.atomics.released.store(true, Ordering::Relaxed);
    }
}
