//! Playback handle contract
//!
//! A playback handle is the platform primitive that actually produces sound
//! for one Track. The engine only needs a small capability set from it, so
//! any media primitive satisfying [`PlaybackHandle`] is interchangeable:
//! the in-process mixer voices in [`crate::output`] in production, scripted
//! handles in tests.
//!
//! Notifications (duration available, position changed) travel the other way
//! as [`HandleEvent`]s, tagged with the Track they came from.

use std::sync::Arc;

use crate::types::{DecodedBuffer, StemKind, TrackId};

/// Minimal capability set the engine drives a Track with
pub trait PlaybackHandle: Send {
    /// Resume output from the current position
    fn play(&mut self);

    /// Stop advancing, keeping the current position
    fn pause(&mut self);

    /// Whether the handle is currently advancing
    fn is_playing(&self) -> bool;

    /// Current position in seconds
    fn current_time(&self) -> f64;

    /// Move the position, in seconds
    fn set_current_time(&mut self, seconds: f64);

    /// Output volume in [0, 1]
    fn volume(&self) -> f32;

    fn set_volume(&mut self, volume: f32);

    fn muted(&self) -> bool;

    fn set_muted(&mut self, muted: bool);

    /// Media duration in seconds, NaN until the platform knows it
    fn duration(&self) -> f64;

    /// Whether `current_time` advances at the session's rate
    ///
    /// False for a handle playing off-speed; drift correction skips it.
    fn follows_session_clock(&self) -> bool {
        true
    }
}

/// Notification raised by a Track's handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleEvent {
    /// Duration/metadata became available (or changed)
    MetadataLoaded(TrackId),
    /// Position advanced
    PositionChanged(TrackId),
}

impl HandleEvent {
    /// Track that raised the notification
    pub fn track(&self) -> TrackId {
        match *self {
            HandleEvent::MetadataLoaded(id) | HandleEvent::PositionChanged(id) => id,
        }
    }
}

/// Binds decoded buffers to fresh playback handles
///
/// Implemented by whatever owns the platform side of playback (the mixer in
/// production). Each call yields exactly one handle for exactly one buffer.
pub trait HandleFactory {
    type Handle: PlaybackHandle;

    fn bind(&mut self, stem: StemKind, buffer: Arc<DecodedBuffer>) -> Self::Handle;
}
