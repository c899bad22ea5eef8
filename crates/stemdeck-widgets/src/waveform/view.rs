//! Per-track scrolling waveform

use std::sync::Arc;

use stemdeck_core::handle::PlaybackHandle;
use stemdeck_core::track::Track;
use stemdeck_core::types::StemKind;
use stemdeck_core::waveform::WaveformEnvelope;

use super::render::render;
use super::surface::Surface;
use super::window::VisibleWindow;

/// Everything needed to redraw one Track's waveform on a position tick
///
/// Holds the Track's envelope (shared, never recomputed) and its own buffer
/// duration; the playhead comes in as session progress on every draw.
#[derive(Debug, Clone)]
pub struct WaveformView {
    stem: StemKind,
    envelope: Arc<WaveformEnvelope>,
    buffer_duration: f64,
    visible_duration: f64,
}

impl WaveformView {
    pub fn new(
        stem: StemKind,
        envelope: Arc<WaveformEnvelope>,
        buffer_duration: f64,
        visible_duration: f64,
    ) -> Self {
        Self {
            stem,
            envelope,
            buffer_duration,
            visible_duration,
        }
    }

    pub fn from_track<H: PlaybackHandle>(track: &Track<H>, visible_duration: f64) -> Self {
        log::debug!(
            "Waveform view for {}: {} buckets over {:.2}s",
            track.stem(),
            track.envelope().len(),
            track.buffer().duration()
        );
        Self::new(
            track.stem(),
            Arc::clone(track.envelope()),
            track.buffer().duration(),
            visible_duration,
        )
    }

    #[inline]
    pub fn stem(&self) -> StemKind {
        self.stem
    }

    /// Window shown at `progress`
    pub fn window(&self, progress: f64) -> VisibleWindow {
        VisibleWindow::tracking(progress, self.buffer_duration, self.visible_duration)
    }

    /// Redraw for the given session progress; returns bars drawn
    pub fn draw<S: Surface + ?Sized>(&self, surface: &mut S, progress: f64, muted: bool) -> usize {
        let window = self.window(progress);
        render(
            surface,
            &self.envelope,
            window.start,
            window.end,
            self.buffer_duration,
            muted,
        )
    }
}
