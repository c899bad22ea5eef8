//! Sliding time window that follows the playhead

use std::ops::Range;

/// Time span of a waveform that is currently drawn, in seconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibleWindow {
    pub start: f64,
    pub end: f64,
}

impl VisibleWindow {
    /// Window starting at the playhead and spanning up to `visible` seconds
    ///
    /// `start = progress * duration`, `end = min(duration, start + visible)`.
    /// Progress is clamped to [0, 1]; NaN counts as 0.
    pub fn tracking(progress: f64, duration: f64, visible: f64) -> Self {
        if !duration.is_finite() || duration <= 0.0 {
            return Self { start: 0.0, end: 0.0 };
        }
        let progress = if progress.is_nan() {
            0.0
        } else {
            progress.clamp(0.0, 1.0)
        };
        let visible = if visible.is_finite() { visible.max(0.0) } else { 0.0 };

        let start = progress * duration;
        let end = duration.min(start + visible);
        Self { start, end }
    }

    #[inline]
    pub fn len(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() <= 0.0
    }

    /// Envelope buckets covering this window
    ///
    /// `floor(start / duration * len) .. ceil(end / duration * len)`, clamped
    /// to `[0, len]`.
    pub fn index_range(&self, envelope_len: usize, duration: f64) -> Range<usize> {
        index_range(self.start, self.end, duration, envelope_len)
    }
}

/// Map a time window to envelope bucket indices
pub fn index_range(start: f64, end: f64, duration: f64, envelope_len: usize) -> Range<usize> {
    if envelope_len == 0 || !duration.is_finite() || duration <= 0.0 {
        return 0..0;
    }
    let len = envelope_len as f64;
    let to_index = |value: f64| -> usize {
        if value.is_nan() {
            0
        } else {
            value.clamp(0.0, len) as usize
        }
    };

    let first = to_index((start / duration * len).floor());
    let last = to_index((end / duration * len).ceil());
    first..last.max(first)
}
