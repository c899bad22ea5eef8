//! Scripted playback handles for engine and session tests

use std::sync::{Arc, Mutex, MutexGuard};

use crate::handle::{HandleFactory, PlaybackHandle};
use crate::types::{DecodedBuffer, StemKind};

#[derive(Debug, Clone)]
pub(crate) struct ScriptedState {
    pub playing: bool,
    pub time: f64,
    pub volume: f32,
    pub muted: bool,
    pub duration: f64,
    pub play_calls: usize,
}

/// Handle whose state tests can inspect and move from the outside
#[derive(Debug, Clone)]
pub(crate) struct ScriptedHandle {
    state: Arc<Mutex<ScriptedState>>,
}

impl ScriptedHandle {
    pub fn new(duration: f64) -> Self {
        Self {
            state: Arc::new(Mutex::new(ScriptedState {
                playing: false,
                time: 0.0,
                volume: 1.0,
                muted: false,
                duration,
                play_calls: 0,
            })),
        }
    }

    pub fn state(&self) -> MutexGuard<'_, ScriptedState> {
        self.state.lock().unwrap()
    }

    /// Advance the playhead as the platform would while playing
    pub fn advance(&self, seconds: f64) {
        let mut state = self.state();
        if state.playing {
            state.time = (state.time + seconds).min(state.duration.max(0.0));
        }
    }
}

impl PlaybackHandle for ScriptedHandle {
    fn play(&mut self) {
        let mut state = self.state();
        state.playing = true;
        state.play_calls += 1;
    }

    fn pause(&mut self) {
        self.state().playing = false;
    }

    fn is_playing(&self) -> bool {
        self.state().playing
    }

    fn current_time(&self) -> f64 {
        self.state().time
    }

    fn set_current_time(&mut self, seconds: f64) {
        self.state().time = seconds;
    }

    fn volume(&self) -> f32 {
        self.state().volume
    }

    fn set_volume(&mut self, volume: f32) {
        self.state().volume = volume;
    }

    fn muted(&self) -> bool {
        self.state().muted
    }

    fn set_muted(&mut self, muted: bool) {
        self.state().muted = muted;
    }

    fn duration(&self) -> f64 {
        self.state().duration
    }
}

/// Factory that keeps a shared copy of every handle it creates
#[derive(Default)]
pub(crate) struct ScriptedFactory {
    /// Duration reported by new handles (NaN models unknown metadata)
    pub duration: Option<f64>,
    pub bound: Vec<(StemKind, ScriptedHandle)>,
}

impl ScriptedFactory {
    pub fn scripted(&self, stem: StemKind) -> Option<&ScriptedHandle> {
        self.bound.iter().find(|(s, _)| *s == stem).map(|(_, h)| h)
    }
}

impl HandleFactory for ScriptedFactory {
    type Handle = ScriptedHandle;

    fn bind(&mut self, stem: StemKind, buffer: Arc<DecodedBuffer>) -> ScriptedHandle {
        let handle = ScriptedHandle::new(self.duration.unwrap_or_else(|| buffer.duration()));
        self.bound.push((stem, handle.clone()));
        handle
    }
}
