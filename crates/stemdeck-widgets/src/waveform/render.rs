//! Waveform renderer
//!
//! Draws the slice of a precomputed envelope that falls inside a time window.
//! Work is proportional to the window, never to the track length.

use stemdeck_core::waveform::WaveformEnvelope;

use crate::theme::waveform_fill;

use super::surface::Surface;
use super::window::index_range;

/// Draw `[window_start, window_end)` of `envelope` onto `surface`
///
/// One bar per visible bucket, spread evenly over the surface width. Each
/// bar spans `min..max` scaled to half the surface height, with a one unit
/// floor so silence stays visible. Returns the number of bars drawn.
pub fn render<S: Surface + ?Sized>(
    surface: &mut S,
    envelope: &WaveformEnvelope,
    window_start: f64,
    window_end: f64,
    buffer_duration: f64,
    muted: bool,
) -> usize {
    surface.clear();

    let range = index_range(window_start, window_end, buffer_duration, envelope.len());
    let visible = envelope.slice(range.start, range.end);
    if visible.is_empty() {
        return 0;
    }

    let amp = surface.height() / 2.0;
    let x_scale = surface.width() / visible.len() as f32;
    let color = waveform_fill(muted);

    for (i, bucket) in visible.iter().enumerate() {
        let x = i as f32 * x_scale;
        let y = (1.0 + bucket.min) * amp;
        let h = ((bucket.max - bucket.min) * amp).max(1.0);
        surface.fill_rect(x, y, x_scale, h, color);
    }
    visible.len()
}
