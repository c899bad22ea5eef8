//! Player configuration for stemdeck-player
//!
//! Configuration is stored as YAML in the user's config directory.
//! Default location: ~/.config/stemdeck/player.yaml

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use stemdeck_core::config::{default_archive_root, PlaybackConfig};

/// Config file name inside the stemdeck config directory
pub const CONFIG_FILENAME: &str = "player.yaml";

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Directory holding one sub-directory of stems per stem set
    /// Default: ~/Music/stemdeck
    pub archive_root: PathBuf,
    /// Transport and waveform timing
    pub playback: PlaybackConfig,
    /// Terminal rendering
    pub display: DisplayConfig,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            archive_root: default_archive_root(),
            playback: PlaybackConfig::default(),
            display: DisplayConfig::default(),
        }
    }
}

/// Display configuration section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Character columns per waveform
    pub waveform_columns: usize,
    /// Character rows per waveform
    pub waveform_rows: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            waveform_columns: 100,
            waveform_rows: 8,
        }
    }
}

/// Get the default config file path
///
/// Returns: ~/.config/stemdeck/player.yaml
pub fn default_config_path() -> PathBuf {
    stemdeck_core::config::default_config_path(CONFIG_FILENAME)
}
