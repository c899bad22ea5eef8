//! Playback tuning shared by every stemdeck front end

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Seconds of audio shown by each scrolling waveform
pub const DEFAULT_VISIBLE_DURATION: f64 = 5.0;

/// Session volume before the user touches it
pub const DEFAULT_VOLUME: f32 = 0.5;

/// Position tick cadence (media elements report roughly every 250 ms)
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 250;

/// Inter-track drift tolerated before tracks are re-seeked
pub const DEFAULT_DRIFT_TOLERANCE_MS: u64 = 50;

/// Fastest tick the player will run
const MIN_TICK_INTERVAL_MS: u64 = 10;

/// Playback configuration section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Width of the waveform time window, in seconds
    pub visible_duration: f64,
    /// Initial session volume in [0, 1]
    pub default_volume: f32,
    /// How often the reference position is sampled, in milliseconds
    pub tick_interval_ms: u64,
    /// Re-align tracks drifting further than this (ms); `None` disables it
    pub drift_tolerance_ms: Option<u64>,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            visible_duration: DEFAULT_VISIBLE_DURATION,
            default_volume: DEFAULT_VOLUME,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            drift_tolerance_ms: Some(DEFAULT_DRIFT_TOLERANCE_MS),
        }
    }
}

impl PlaybackConfig {
    /// Copy with every value forced into its valid range
    pub fn sanitized(&self) -> Self {
        let visible_duration = if self.visible_duration.is_finite() && self.visible_duration > 0.0 {
            self.visible_duration
        } else {
            DEFAULT_VISIBLE_DURATION
        };
        let default_volume = if self.default_volume.is_nan() {
            DEFAULT_VOLUME
        } else {
            self.default_volume.clamp(0.0, 1.0)
        };
        Self {
            visible_duration,
            default_volume,
            tick_interval_ms: self.tick_interval_ms.max(MIN_TICK_INTERVAL_MS),
            drift_tolerance_ms: self.drift_tolerance_ms,
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(MIN_TICK_INTERVAL_MS))
    }

    /// Drift tolerance in seconds
    pub fn drift_tolerance(&self) -> Option<f64> {
        self.drift_tolerance_ms.map(|ms| ms as f64 / 1000.0)
    }
}
