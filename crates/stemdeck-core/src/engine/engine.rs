//! PlaybackEngine - single transport clock over a set of Tracks

use tokio::sync::watch;

use crate::handle::{HandleEvent, PlaybackHandle};
use crate::track::{clamp_unit, Track};
use crate::types::{TrackId, NUM_STEMS, REFERENCE_TRACK};
use crate::waveform::BUCKET_SIZE;

use super::error::{EngineError, EngineResult};
use super::state::{progress_fraction, PlaybackSnapshot, TransportState};

/// Synchronized playback of every stem in a session
///
/// Owns the Tracks (and through them the playback handles). Every command
/// is applied to all handles in one synchronous pass so inter-track skew is
/// bounded by platform scheduling only. Position and duration come from the
/// reference Track (slot 0); other handles are never read for them.
pub struct PlaybackEngine<H: PlaybackHandle> {
    /// Bound tracks, ordered by id
    tracks: Vec<Track<H>>,
    state: TransportState,
    /// Playhead in seconds
    position: f64,
    /// Reference duration, resolved on the first valid metadata notification
    duration: Option<f64>,
    session_volume: f32,
    observer: watch::Sender<PlaybackSnapshot>,
}

impl<H: PlaybackHandle> PlaybackEngine<H> {
    /// Create an idle engine with the given session volume
    pub fn new(session_volume: f32) -> Self {
        let session_volume = clamp_unit(session_volume);
        let (observer, _) = watch::channel(PlaybackSnapshot {
            volume: session_volume,
            ..PlaybackSnapshot::default()
        });
        Self {
            tracks: Vec::new(),
            state: TransportState::Idle,
            position: 0.0,
            duration: None,
            session_volume,
            observer,
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Session lifecycle
    // ─────────────────────────────────────────────────────────────

    /// Bind a new set of Tracks, replacing (and releasing) any previous ones
    ///
    /// The set must contain the reference Track; without it the engine
    /// stays `Idle` and every later `play()` fails with `NotReady`.
    /// The duration stays unknown until the reference handle reports it.
    pub fn bind(&mut self, mut tracks: Vec<Track<H>>) -> EngineResult<()> {
        self.release_tracks();

        if !tracks.iter().any(|t| t.id() == REFERENCE_TRACK) {
            log::warn!(
                "Reference track missing; dropping {} track(s), session stays idle",
                tracks.len()
            );
            self.publish();
            return Err(EngineError::NotReady);
        }

        tracks.sort_by_key(Track::id);
        tracks.dedup_by_key(|t| t.id());
        for track in &mut tracks {
            track.handle.pause();
            track.handle.set_current_time(0.0);
            track.sync_gain(self.session_volume);
        }

        log::info!("Session bound with {} track(s)", tracks.len());
        self.tracks = tracks;
        self.state = TransportState::Ready;
        self.publish();
        Ok(())
    }

    /// Tear down the session, releasing every handle
    pub fn unload(&mut self) {
        self.release_tracks();
        self.publish();
    }

    fn release_tracks(&mut self) {
        for track in &mut self.tracks {
            track.handle.pause();
        }
        if !self.tracks.is_empty() {
            log::debug!("Releasing {} track(s)", self.tracks.len());
        }
        self.tracks.clear();
        self.state = TransportState::Idle;
        self.position = 0.0;
        self.duration = None;
    }

    // ─────────────────────────────────────────────────────────────
    // Observable state
    // ─────────────────────────────────────────────────────────────

    /// Subscribe to snapshots published after every state change
    pub fn subscribe(&self) -> watch::Receiver<PlaybackSnapshot> {
        self.observer.subscribe()
    }

    /// Current observable state
    pub fn snapshot(&self) -> PlaybackSnapshot {
        let mut present = [false; NUM_STEMS];
        let mut muted = [false; NUM_STEMS];
        for track in &self.tracks {
            if let Some(slot) = present.get_mut(track.id()) {
                *slot = true;
                muted[track.id()] = track.is_muted();
            }
        }
        PlaybackSnapshot {
            state: self.state,
            position: self.position,
            duration: self.duration(),
            playing: self.state.is_playing(),
            volume: self.session_volume,
            present,
            muted,
        }
    }

    fn publish(&self) {
        self.observer.send_replace(self.snapshot());
    }

    #[inline]
    pub fn state(&self) -> TransportState {
        self.state
    }

    #[inline]
    pub fn is_playing(&self) -> bool {
        self.state.is_playing()
    }

    /// Playhead in seconds
    #[inline]
    pub fn position(&self) -> f64 {
        self.position
    }

    /// Reference duration in seconds, 0 until resolved
    #[inline]
    pub fn duration(&self) -> f64 {
        self.duration.unwrap_or(0.0)
    }

    #[inline]
    pub fn is_duration_resolved(&self) -> bool {
        self.duration.is_some()
    }

    /// Playhead as a fraction of the duration (0 while unknown)
    pub fn progress(&self) -> f64 {
        progress_fraction(self.position, self.duration())
    }

    #[inline]
    pub fn session_volume(&self) -> f32 {
        self.session_volume
    }

    #[inline]
    pub fn tracks(&self) -> &[Track<H>] {
        &self.tracks
    }

    pub fn track(&self, id: TrackId) -> Option<&Track<H>> {
        self.tracks.iter().find(|t| t.id() == id)
    }

    fn track_mut(&mut self, id: TrackId) -> EngineResult<&mut Track<H>> {
        self.tracks
            .iter_mut()
            .find(|t| t.id() == id)
            .ok_or(EngineError::TrackNotFound(id))
    }

    fn reference(&self) -> Option<&Track<H>> {
        self.tracks.first().filter(|t| t.id() == REFERENCE_TRACK)
    }

    // ─────────────────────────────────────────────────────────────
    // Transport
    // ─────────────────────────────────────────────────────────────

    /// Resume every Track from the session position
    ///
    /// Playing from the very end restarts from 0, like a media element.
    pub fn play(&mut self) -> EngineResult<()> {
        if !self.state.is_bound() {
            return Err(EngineError::NotReady);
        }
        if self.state.is_playing() {
            return Ok(());
        }

        if self.duration.is_some_and(|d| self.position >= d) {
            self.position = 0.0;
        }

        let position = self.position;
        for track in &mut self.tracks {
            track.handle.set_current_time(position);
        }
        for track in &mut self.tracks {
            track.handle.play();
        }

        log::debug!("Play from {:.3}s ({} tracks)", position, self.tracks.len());
        self.state = TransportState::Playing;
        self.publish();
        Ok(())
    }

    /// Pause every Track, freezing the position at the reference time
    pub fn pause(&mut self) {
        if !self.state.is_playing() {
            return;
        }
        for track in &mut self.tracks {
            track.handle.pause();
        }
        if let Some(time) = self.reference().map(|t| t.handle.current_time()) {
            self.position = self.clamp_position(time);
        }

        log::debug!("Pause at {:.3}s", self.position);
        self.state = TransportState::Paused;
        self.publish();
    }

    /// Play when paused/stopped, pause when playing
    pub fn toggle_play(&mut self) -> EngineResult<()> {
        if self.state.is_playing() {
            self.pause();
            Ok(())
        } else {
            self.play()
        }
    }

    /// Pause every Track and rewind all of them to 0
    ///
    /// The session is ready again afterwards, reported as `Stopped`.
    pub fn stop(&mut self) {
        if !self.state.is_bound() {
            return;
        }
        for track in &mut self.tracks {
            track.handle.pause();
            track.handle.set_current_time(0.0);
        }

        log::debug!("Stop");
        self.position = 0.0;
        self.state = TransportState::Stopped;
        self.publish();
    }

    /// Move every Track to `target` seconds, clamped to `[0, duration]`
    ///
    /// The session position is updated immediately, without waiting for a
    /// position notification. While playing, every handle is resumed too,
    /// including stems that stopped at their own end. Returns the clamped
    /// target.
    pub fn seek(&mut self, target: f64) -> f64 {
        let target = self.clamp_position(target);
        for track in &mut self.tracks {
            track.handle.set_current_time(target);
        }
        if self.state.is_playing() {
            for track in &mut self.tracks {
                track.handle.play();
            }
        }

        log::debug!("Seek to {:.3}s", target);
        self.position = target;
        self.publish();
        target
    }

    /// Seek to a fraction of the duration (progress-bar click)
    pub fn seek_fraction(&mut self, fraction: f64) -> f64 {
        let fraction = if fraction.is_finite() {
            fraction.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.seek(fraction * self.duration())
    }

    fn clamp_position(&self, seconds: f64) -> f64 {
        if !seconds.is_finite() {
            return 0.0;
        }
        seconds.clamp(0.0, self.duration())
    }

    // ─────────────────────────────────────────────────────────────
    // Gain
    // ─────────────────────────────────────────────────────────────

    /// Set the session volume (clamped to [0, 1])
    ///
    /// Each handle gets `volume * track.volume`; muted handles stay at 0.
    pub fn set_volume(&mut self, volume: f32) {
        self.session_volume = clamp_unit(volume);
        let session_volume = self.session_volume;
        for track in &mut self.tracks {
            track.sync_gain(session_volume);
        }
        self.publish();
    }

    /// Set one Track's own volume (clamped to [0, 1])
    pub fn set_track_volume(&mut self, id: TrackId, volume: f32) -> EngineResult<()> {
        let session_volume = self.session_volume;
        let track = self.track_mut(id)?;
        track.set_volume(volume);
        track.sync_gain(session_volume);
        Ok(())
    }

    /// Flip mute for one Track, returning the new mute state
    ///
    /// Only audible output changes; the Track keeps advancing with the rest.
    pub fn toggle_mute(&mut self, id: TrackId) -> EngineResult<bool> {
        let session_volume = self.session_volume;
        let track = self.track_mut(id)?;
        track.muted = !track.muted;
        track.sync_gain(session_volume);
        let muted = track.muted;

        log::debug!("Track {} {}", id, if muted { "muted" } else { "unmuted" });
        self.publish();
        Ok(muted)
    }

    // ─────────────────────────────────────────────────────────────
    // Notifications
    // ─────────────────────────────────────────────────────────────

    /// Dispatch a handle notification; returns true if the state changed
    pub fn handle_event(&mut self, event: HandleEvent) -> bool {
        match event {
            HandleEvent::MetadataLoaded(id) => self.on_metadata(id),
            HandleEvent::PositionChanged(id) if id == REFERENCE_TRACK => self.on_position_tick(),
            // Other handles are never read for position
            HandleEvent::PositionChanged(_) => false,
        }
    }

    /// Refresh the position from the reference Track
    ///
    /// This is the sole driver of progress and waveform updates. When the
    /// reference reaches the end while playing, every Track is paused and the
    /// session parks at `duration`.
    pub fn on_position_tick(&mut self) -> bool {
        let Some(reference) = self.reference() else {
            return false;
        };
        let time = reference.handle.current_time();
        let reference_running = reference.handle.is_playing();
        self.position = self.clamp_position(time);

        if self.state.is_playing() {
            if let Some(duration) = self.duration {
                if self.position >= duration || (!reference_running && time >= duration) {
                    for track in &mut self.tracks {
                        track.handle.pause();
                    }
                    self.position = duration;
                    self.state = TransportState::Paused;
                    log::info!("Reached end of session at {:.3}s", duration);
                }
            }
        }

        self.publish();
        true
    }

    /// Handle a metadata notification from Track `id`
    ///
    /// Re-applies the current gain to every handle. The first valid duration
    /// reported by the reference Track is kept for the rest of the session;
    /// NaN or non-positive values are ignored and retried on the next
    /// notification.
    pub fn on_metadata(&mut self, id: TrackId) -> bool {
        if !self.state.is_bound() {
            return false;
        }

        let session_volume = self.session_volume;
        for track in &mut self.tracks {
            track.sync_gain(session_volume);
        }

        if id != REFERENCE_TRACK || self.duration.is_some() {
            return false;
        }

        let Some(reported) = self.reference().map(|t| t.handle.duration()) else {
            return false;
        };
        if !reported.is_finite() || reported <= 0.0 {
            log::debug!("Reference duration not available yet ({})", reported);
            return false;
        }

        self.duration = Some(reported);
        log::info!("Session duration resolved: {:.3}s", reported);
        self.warn_on_duration_mismatch(reported);
        self.publish();
        true
    }

    fn warn_on_duration_mismatch(&self, duration: f64) {
        for track in &self.tracks {
            let buffer = track.buffer();
            if buffer.sample_rate() == 0 {
                continue;
            }
            let tolerance = BUCKET_SIZE as f64 / buffer.sample_rate() as f64;
            let delta = (buffer.duration() - duration).abs();
            if delta > tolerance {
                log::warn!(
                    "Stem {} is {:.3}s long, reference is {:.3}s; using the reference",
                    track.stem(),
                    buffer.duration(),
                    duration
                );
            }
        }
    }

    /// Re-seek any Track that drifted more than `tolerance` seconds from the
    /// reference; returns how many were moved
    ///
    /// A Track shorter than the reference is aligned to its own end once the
    /// reference passes it. Tracks off the session clock are left alone.
    /// While playing, a Track that stopped is resumed.
    pub fn realign(&mut self, tolerance: f64) -> usize {
        let Some(reference_time) = self.reference().map(|t| t.handle.current_time()) else {
            return 0;
        };
        let playing = self.state.is_playing();

        let mut moved = 0;
        for track in self.tracks.iter_mut().skip(1) {
            if !track.handle.follows_session_clock() {
                continue;
            }

            let length = track.handle.duration();
            let target = if length.is_finite() && length >= 0.0 {
                reference_time.min(length)
            } else {
                reference_time
            };
            let drift = track.handle.current_time() - target;
            if drift.abs() > tolerance {
                track.handle.set_current_time(target);
                moved += 1;
                log::debug!("Re-aligned {} (drift {:+.1} ms)", track.stem(), drift * 1000.0);
            }
            if playing && !track.handle.is_playing() {
                track.handle.play();
            }
        }
        moved
    }
}
