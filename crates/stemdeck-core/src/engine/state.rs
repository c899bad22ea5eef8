//! Transport state and the UI-facing playback snapshot

use crate::types::NUM_STEMS;

/// Transport state machine
///
/// `Idle → Ready → Playing ⇄ Paused`, with `Stopped` reachable from any
/// bound state. `Stopped` is the Ready state re-entered through `stop()`:
/// position 0, handles paused, `play()` accepted. It is reported separately
/// only so a front end can tell "stopped" from "freshly loaded".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportState {
    /// No tracks bound (or the reference track is missing)
    #[default]
    Idle,
    /// Handles bound, nothing played yet
    Ready,
    Playing,
    Paused,
    /// Ready again after `stop()`, position reset to 0
    Stopped,
}

impl TransportState {
    /// Whether transport commands can act on bound tracks
    #[inline]
    pub fn is_bound(self) -> bool {
        !matches!(self, TransportState::Idle)
    }

    #[inline]
    pub fn is_playing(self) -> bool {
        matches!(self, TransportState::Playing)
    }
}

/// Read-only view of the session published to the UI after every change
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlaybackSnapshot {
    pub state: TransportState,
    /// Playhead in seconds
    pub position: f64,
    /// Reference duration in seconds, 0 until resolved
    pub duration: f64,
    pub playing: bool,
    /// Session volume in [0, 1]
    pub volume: f32,
    /// Which stem slots hold a track
    pub present: [bool; NUM_STEMS],
    /// Mute flag per stem slot (false for absent slots)
    pub muted: [bool; NUM_STEMS],
}

impl PlaybackSnapshot {
    /// Playhead as a fraction of the duration, 0 while the duration is unknown
    pub fn progress(&self) -> f64 {
        progress_fraction(self.position, self.duration)
    }
}

/// `position / duration` clamped to [0, 1], guarding against a zero duration
pub fn progress_fraction(position: f64, duration: f64) -> f64 {
    if duration > 0.0 && position.is_finite() {
        (position / duration).clamp(0.0, 1.0)
    } else {
        0.0
    }
}
