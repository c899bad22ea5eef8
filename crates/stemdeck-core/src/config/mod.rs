//! Shared configuration for stemdeck applications
//!
//! - Generic YAML config loading/saving
//! - Default file locations
//! - Playback tuning (`PlaybackConfig`)
//!
//! # Usage
//!
//! ```ignore
//! use stemdeck_core::config::{load_config, save_config, default_config_path};
//!
//! let path = default_config_path("player.yaml");
//! let config: MyAppConfig = load_config(&path);
//! save_config(&config, &path)?;
//! ```

mod io;
mod paths;
mod playback;

pub use io::{load_config, save_config};
pub use paths::{default_archive_root, default_config_path};
pub use playback::{
    PlaybackConfig, DEFAULT_DRIFT_TOLERANCE_MS, DEFAULT_TICK_INTERVAL_MS, DEFAULT_VISIBLE_DURATION,
    DEFAULT_VOLUME,
};
