//! Track - one decoded stem bound to its playback handle

use std::sync::Arc;

use crate::handle::PlaybackHandle;
use crate::types::{DecodedBuffer, StemKind, TrackId};
use crate::waveform::WaveformEnvelope;

/// The engine's in-memory representation of one stem
///
/// Owns the decoded buffer, the precomputed envelope and exactly one
/// playback handle. Dropping the Track releases the handle. Mute state is
/// only changed through the engine, which also keeps the handle's volume in
/// step with it.
pub struct Track<H: PlaybackHandle> {
    stem: StemKind,
    buffer: Arc<DecodedBuffer>,
    envelope: Arc<WaveformEnvelope>,
    pub(crate) muted: bool,
    volume: f32,
    pub(crate) handle: H,
}

impl<H: PlaybackHandle> Track<H> {
    /// Create an unmuted track at full track volume
    pub fn new(
        stem: StemKind,
        buffer: Arc<DecodedBuffer>,
        envelope: Arc<WaveformEnvelope>,
        handle: H,
    ) -> Self {
        Self {
            stem,
            buffer,
            envelope,
            muted: false,
            volume: 1.0,
            handle,
        }
    }

    /// Stable id, equal to the stem slot
    #[inline]
    pub fn id(&self) -> TrackId {
        self.stem.index()
    }

    #[inline]
    pub fn stem(&self) -> StemKind {
        self.stem
    }

    #[inline]
    pub fn buffer(&self) -> &Arc<DecodedBuffer> {
        &self.buffer
    }

    #[inline]
    pub fn envelope(&self) -> &Arc<WaveformEnvelope> {
        &self.envelope
    }

    #[inline]
    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Per-track volume in [0, 1]
    #[inline]
    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Set the per-track volume (clamped). Takes effect on the next gain sync.
    pub fn set_volume(&mut self, volume: f32) {
        self.volume = clamp_unit(volume);
    }

    /// Read-only view of the playback handle
    #[inline]
    pub fn handle(&self) -> &H {
        &self.handle
    }

    /// Effective handle volume for the given session volume
    #[inline]
    pub fn gain(&self, session_volume: f32) -> f32 {
        if self.muted {
            0.0
        } else {
            session_volume * self.volume
        }
    }

    /// Push mute state and effective volume down to the handle
    pub(crate) fn sync_gain(&mut self, session_volume: f32) {
        let gain = self.gain(session_volume);
        self.handle.set_muted(self.muted);
        self.handle.set_volume(gain);
    }
}

impl<H: PlaybackHandle> std::fmt::Debug for Track<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Track")
            .field("stem", &self.stem)
            .field("frames", &self.buffer.sample_count())
            .field("buckets", &self.envelope.len())
            .field("muted", &self.muted)
            .field("volume", &self.volume)
            .finish()
    }
}

/// Clamp to [0, 1], mapping NaN to 0
#[inline]
pub(crate) fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
