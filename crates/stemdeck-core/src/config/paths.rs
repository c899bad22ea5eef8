//! Standard locations for stemdeck files

use std::path::PathBuf;

/// Default stem archive root: `~/Music/stemdeck`
///
/// Each stem set lives in its own sub-directory, named by its id.
pub fn default_archive_root() -> PathBuf {
    dirs::audio_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join("Music")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("stemdeck")
}

/// Default config file path: `<config dir>/stemdeck/<filename>`
pub fn default_config_path(filename: &str) -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("stemdeck")
        .join(filename)
}
