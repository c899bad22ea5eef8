//! Session controller - wires loading, binding and the engine together
//!
//! The controller is the one place that turns a finished load into a bound
//! session: it checks the load is still current, requires the reference stem,
//! binds every prepared stem to a fresh playback handle and kicks the
//! engine's metadata path. After that it forwards UI commands and the
//! periodic position tick to the engine.

use tokio::sync::watch;

use crate::config::PlaybackConfig;
use crate::engine::{EngineResult, PlaybackEngine, PlaybackSnapshot};
use crate::handle::{HandleEvent, HandleFactory, PlaybackHandle};
use crate::loader::{LoadError, LoadTicket, PreparedStems, StemArchive, StemDecoder, StemLoader};
use crate::track::Track;
use crate::types::{TrackId, REFERENCE_TRACK};

/// Owns the engine for one player and the session currently bound to it
pub struct SessionController<H: PlaybackHandle> {
    engine: PlaybackEngine<H>,
    config: PlaybackConfig,
    /// Id of the bound stem set, if any
    current: Option<String>,
}

impl<H: PlaybackHandle> SessionController<H> {
    pub fn new(config: PlaybackConfig) -> Self {
        let config = config.sanitized();
        Self {
            engine: PlaybackEngine::new(config.default_volume),
            config,
            current: None,
        }
    }

    #[inline]
    pub fn config(&self) -> &PlaybackConfig {
        &self.config
    }

    #[inline]
    pub fn engine(&self) -> &PlaybackEngine<H> {
        &self.engine
    }

    #[inline]
    pub fn tracks(&self) -> &[Track<H>] {
        self.engine.tracks()
    }

    /// Id of the bound stem set
    pub fn current_id(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn subscribe(&self) -> watch::Receiver<PlaybackSnapshot> {
        self.engine.subscribe()
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.engine.snapshot()
    }

    // ─────────────────────────────────────────────────────────────
    // Loading
    // ─────────────────────────────────────────────────────────────

    /// Bind a finished load, replacing the current session
    ///
    /// A stale ticket leaves the current session untouched. A load without
    /// the reference stem unloads the current session and leaves the
    /// controller idle.
    pub fn install<F>(
        &mut self,
        ticket: &LoadTicket,
        id: &str,
        prepared: PreparedStems,
        factory: &mut F,
    ) -> Result<(), LoadError>
    where
        F: HandleFactory<Handle = H>,
    {
        if !ticket.is_current() {
            log::debug!("Discarding stale load of '{}'", id);
            return Err(LoadError::Superseded);
        }

        if !prepared.has_reference() {
            log::warn!("'{}' has no playable reference stem; session unloaded", id);
            self.unload();
            return Err(LoadError::MissingReference);
        }

        // Release the old handles before creating new ones
        self.engine.unload();

        let tracks: Vec<Track<H>> = prepared
            .stems
            .into_iter()
            .map(|p| {
                let handle = factory.bind(p.stem, p.buffer.clone());
                Track::new(p.stem, p.buffer, p.envelope, handle)
            })
            .collect();
        let ids: Vec<TrackId> = tracks.iter().map(Track::id).collect();

        if self.engine.bind(tracks).is_err() {
            self.current = None;
            return Err(LoadError::MissingReference);
        }
        self.current = Some(id.to_string());

        // Handles know their duration as soon as they are bound
        for id in ids {
            self.engine.handle_event(HandleEvent::MetadataLoaded(id));
        }
        Ok(())
    }

    /// Load stem set `id` through `loader` and bind it
    pub async fn load_session<A, D, F>(
        &mut self,
        loader: &StemLoader<A, D>,
        id: &str,
        factory: &mut F,
    ) -> Result<(), LoadError>
    where
        A: StemArchive,
        D: StemDecoder + 'static,
        F: HandleFactory<Handle = H>,
    {
        let ticket = loader.begin();
        let prepared = loader.load(&ticket, id).await?;
        self.install(&ticket, id, prepared, factory)
    }

    /// Tear down the current session
    pub fn unload(&mut self) {
        self.engine.unload();
        self.current = None;
    }

    // ─────────────────────────────────────────────────────────────
    // Commands
    // ─────────────────────────────────────────────────────────────

    pub fn play(&mut self) -> EngineResult<()> {
        self.engine.play()
    }

    pub fn pause(&mut self) {
        self.engine.pause();
    }

    pub fn toggle_play(&mut self) -> EngineResult<()> {
        self.engine.toggle_play()
    }

    pub fn stop(&mut self) {
        self.engine.stop();
    }

    pub fn seek(&mut self, seconds: f64) -> f64 {
        self.engine.seek(seconds)
    }

    pub fn seek_fraction(&mut self, fraction: f64) -> f64 {
        self.engine.seek_fraction(fraction)
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.engine.set_volume(volume);
    }

    pub fn set_track_volume(&mut self, id: TrackId, volume: f32) -> EngineResult<()> {
        self.engine.set_track_volume(id, volume)
    }

    pub fn toggle_mute(&mut self, id: TrackId) -> EngineResult<bool> {
        self.engine.toggle_mute(id)
    }

    pub fn handle_event(&mut self, event: HandleEvent) -> bool {
        self.engine.handle_event(event)
    }

    /// Periodic position tick
    ///
    /// Samples the reference position and, while playing, pulls drifting
    /// tracks back onto it when a drift tolerance is configured.
    pub fn tick(&mut self) -> bool {
        let changed = self
            .engine
            .handle_event(HandleEvent::PositionChanged(REFERENCE_TRACK));
        if self.engine.is_playing() {
            if let Some(tolerance) = self.config.drift_tolerance() {
                self.engine.realign(tolerance);
            }
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::engine::{EngineError, TransportState};
    use crate::loader::{DecodeError, FetchError, PreparedStem, StemPayloads, SymphoniaDecoder};
    use crate::testing::{ScriptedFactory, ScriptedHandle};
    use crate::types::{DecodedBuffer, StemKind};
    use crate::waveform::downsample;

    fn prepared(stems: &[StemKind], seconds: usize) -> PreparedStems {
        let stems = stems
            .iter()
            .map(|&stem| {
                let buffer = DecodedBuffer::mono(1000, vec![0.5; seconds * 1000]);
                let envelope = downsample(&buffer);
                PreparedStem {
                    stem,
                    buffer: Arc::new(buffer),
                    envelope: Arc::new(envelope),
                }
            })
            .collect();
        PreparedStems {
            stems,
            dropped: Vec::new(),
        }
    }

    /// Archive that never has anything; only used to mint tickets
    struct EmptyArchive;

    impl StemArchive for EmptyArchive {
        async fn fetch(&self, id: &str) -> Result<StemPayloads, FetchError> {
            Err(FetchError::NotFound(id.to_string()))
        }
    }

    fn loader() -> StemLoader<EmptyArchive, SymphoniaDecoder> {
        StemLoader::new(EmptyArchive, SymphoniaDecoder)
    }

    fn ticket() -> LoadTicket {
        loader().begin()
    }

    fn controller() -> SessionController<ScriptedHandle> {
        SessionController::new(PlaybackConfig::default())
    }

    #[test]
    fn test_install_binds_and_resolves_duration() {
        let mut session = controller();
        let mut factory = ScriptedFactory::default();
        session
            .install(&ticket(), "song", prepared(&StemKind::ALL, 120), &mut factory)
            .unwrap();

        assert_eq!(session.tracks().len(), 4);
        assert_eq!(session.current_id(), Some("song"));
        let snapshot = session.snapshot();
        assert_eq!(snapshot.state, TransportState::Ready);
        assert!((snapshot.duration - 120.0).abs() < 1e-9);
        assert_eq!(snapshot.present, [true; 4]);
    }

    #[test]
    fn test_install_without_reference_unloads() {
        let mut session = controller();
        let mut factory = ScriptedFactory::default();
        session
            .install(&ticket(), "old", prepared(&StemKind::ALL, 10), &mut factory)
            .unwrap();

        let result = session.install(
            &ticket(),
            "broken",
            prepared(&[StemKind::Bass, StemKind::Vocals], 10),
            &mut factory,
        );
        assert!(matches!(result, Err(LoadError::MissingReference)));
        assert!(session.tracks().is_empty());
        assert_eq!(session.current_id(), None);
        assert_eq!(session.play(), Err(EngineError::NotReady));
    }

    #[test]
    fn test_stale_ticket_keeps_current_session() {
        let mut session = controller();
        let mut factory = ScriptedFactory::default();
        let loader = loader();
        let stale = loader.begin();
        let fresh = loader.begin();

        session
            .install(&fresh, "fresh", prepared(&StemKind::ALL, 10), &mut factory)
            .unwrap();
        let result = session.install(&stale, "stale", prepared(&StemKind::ALL, 20), &mut factory);

        assert!(matches!(result, Err(LoadError::Superseded)));
        assert_eq!(session.current_id(), Some("fresh"));
        assert!((session.engine().duration() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_stem_leaves_gap() {
        let mut session = controller();
        let mut factory = ScriptedFactory::default();
        session
            .install(
                &ticket(),
                "song",
                prepared(&[StemKind::Drums, StemKind::Bass, StemKind::Other], 30),
                &mut factory,
            )
            .unwrap();

        assert_eq!(session.snapshot().present, [true, true, true, false]);
        assert_eq!(
            session.toggle_mute(StemKind::Vocals.index()),
            Err(EngineError::TrackNotFound(3))
        );
        session.play().unwrap();
        assert!(factory.bound.iter().all(|(_, h)| h.state().playing));
    }

    #[test]
    fn test_tick_follows_reference_and_realigns() {
        let mut session = controller();
        let mut factory = ScriptedFactory::default();
        session
            .install(&ticket(), "song", prepared(&StemKind::ALL, 60), &mut factory)
            .unwrap();
        session.play().unwrap();

        for (stem, handle) in &factory.bound {
            let step = if *stem == StemKind::Vocals { 2.2 } else { 2.0 };
            handle.advance(step);
        }
        assert!(session.tick());

        assert!((session.snapshot().position - 2.0).abs() < 1e-9);
        let vocals = factory.scripted(StemKind::Vocals).unwrap();
        assert!((vocals.state().time - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_tick_without_drift_tolerance_leaves_tracks() {
        let config = PlaybackConfig {
            drift_tolerance_ms: None,
            ..PlaybackConfig::default()
        };
        let mut session: SessionController<ScriptedHandle> = SessionController::new(config);
        let mut factory = ScriptedFactory::default();
        session
            .install(&ticket(), "song", prepared(&StemKind::ALL, 60), &mut factory)
            .unwrap();
        session.play().unwrap();

        factory.scripted(StemKind::Drums).unwrap().advance(1.0);
        factory.scripted(StemKind::Bass).unwrap().advance(1.5);
        session.tick();

        let bass = factory.scripted(StemKind::Bass).unwrap();
        assert!((bass.state().time - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_reinstall_releases_previous_handles() {
        let mut session = controller();
        let mut factory = ScriptedFactory::default();
        session
            .install(&ticket(), "a", prepared(&StemKind::ALL, 10), &mut factory)
            .unwrap();
        session.play().unwrap();
        let old: Vec<_> = factory.bound.iter().map(|(_, h)| h.clone()).collect();

        session
            .install(&ticket(), "b", prepared(&StemKind::ALL, 20), &mut factory)
            .unwrap();

        assert!(old.iter().all(|h| !h.state().playing));
        assert_eq!(session.snapshot().state, TransportState::Ready);
        assert!((session.engine().duration() - 20.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_load_session_from_memory() {
        struct OneSet;
        impl StemArchive for OneSet {
            async fn fetch(&self, id: &str) -> Result<StemPayloads, FetchError> {
                if id != "song" {
                    return Err(FetchError::NotFound(id.to_string()));
                }
                let mut payloads = StemPayloads::new();
                payloads.insert(StemKind::Drums, vec![]);
                payloads.insert(StemKind::Bass, vec![]);
                Ok(payloads)
            }
        }
        struct Silence;
        impl StemDecoder for Silence {
            fn decode(&self, _: Vec<u8>) -> Result<DecodedBuffer, DecodeError> {
                Ok(DecodedBuffer::mono(1000, vec![0.0; 3000]))
            }
        }

        let loader = StemLoader::new(OneSet, Silence);
        let mut session = controller();
        let mut factory = ScriptedFactory::default();
        session.load_session(&loader, "song", &mut factory).await.unwrap();

        assert_eq!(session.tracks().len(), 2);
        assert!((session.engine().duration() - 3.0).abs() < 1e-9);

        let err = session.load_session(&loader, "other", &mut factory).await;
        assert!(matches!(err, Err(LoadError::Fetch(_))));
        // A failed fetch leaves the bound session alone
        assert_eq!(session.current_id(), Some("song"));
    }
}
