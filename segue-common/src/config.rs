//! Configuration loading and config file resolution
//!
//! # Settings Sources Priority
//!
//! 1. Command-line argument (path to config file)
//! 2. Environment variable `SEGUE_CONFIG`
//! 3. User config file (`~/.config/segue/config.toml` on Linux)
//! 4. System config file (`/etc/segue/config.toml`, Linux only)
//! 5. Built-in defaults (code constants)
//!
//! A missing config file is not an error: a warning is logged and the
//! built-in defaults are used.

use crate::{Error, Result, CHUNK_SIZE};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "SEGUE_CONFIG";

/// Configuration loaded from TOML file
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
pub struct TomlConfig {
    /// Playback and crossfade settings
    #[serde(default)]
    pub playback: PlaybackConfig,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Playback buffer and crossfade settings
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PlaybackConfig {
    /// Fixed crossfade duration in seconds (0 disables crossfading)
    #[serde(default)]
    pub crossfade_seconds: f32,

    /// Loudness level (dB) at which MixRamp overlaps two songs
    #[serde(default)]
    pub mixramp_db: f32,

    /// Seconds subtracted from the MixRamp overlap
    ///
    /// Absent (or NaN) disables MixRamp and falls back to
    /// `crossfade_seconds`.
    #[serde(default)]
    pub mixramp_delay: Option<f32>,

    /// Size of the decoded chunk buffer in KiB
    #[serde(default = "default_audio_buffer_size_kib")]
    pub audio_buffer_size_kib: u32,

    /// Percentage of the buffer decoded before playback starts
    #[serde(default = "default_buffer_before_play_percent")]
    pub buffer_before_play_percent: f32,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

fn default_audio_buffer_size_kib() -> u32 {
    4096
}

fn default_buffer_before_play_percent() -> f32 {
    10.0
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            crossfade_seconds: 0.0,
            mixramp_db: 0.0,
            mixramp_delay: None,
            audio_buffer_size_kib: default_audio_buffer_size_kib(),
            buffer_before_play_percent: default_buffer_before_play_percent(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

impl PlaybackConfig {
    /// Check value ranges that serde cannot express
    pub fn validate(&self) -> Result<()> {
        if self.buffer_chunks() == 0 {
            return Err(Error::Config(format!(
                "audio_buffer_size_kib={} is smaller than one chunk ({} bytes)",
                self.audio_buffer_size_kib, CHUNK_SIZE
            )));
        }

        if !(0.0..=100.0).contains(&self.buffer_before_play_percent) {
            return Err(Error::Config(format!(
                "buffer_before_play_percent={} must be between 0 and 100",
                self.buffer_before_play_percent
            )));
        }

        if self.crossfade_seconds.is_nan() || self.crossfade_seconds < 0.0 {
            return Err(Error::Config(format!(
                "crossfade_seconds={} must not be negative",
                self.crossfade_seconds
            )));
        }

        Ok(())
    }

    /// Number of chunks the playback buffer holds
    pub fn buffer_chunks(&self) -> u32 {
        let bytes = self.audio_buffer_size_kib as usize * 1024;
        (bytes / CHUNK_SIZE) as u32
    }

    /// Number of chunks decoded before playback starts
    pub fn buffered_before_play(&self) -> u32 {
        let chunks = self.buffer_chunks();
        let before = (chunks as f32 * self.buffer_before_play_percent / 100.0) as u32;
        before.min(chunks)
    }

    /// Upper bound for a crossfade, in chunks
    ///
    /// The chunks reserved for pre-buffering the next song cannot take part
    /// in an overlap.
    pub fn max_crossfade_chunks(&self) -> u32 {
        self.buffer_chunks() - self.buffered_before_play()
    }

    /// MixRamp delay, or `None` when MixRamp is disabled
    pub fn effective_mixramp_delay(&self) -> Option<f32> {
        self.mixramp_delay.filter(|delay| !delay.is_nan())
    }
}

impl TomlConfig {
    /// Load and validate a config file
    pub fn load(path: &Path) -> Result<Self> {
        let toml_str = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config: TomlConfig = toml::from_str(&toml_str)
            .map_err(|e| Error::Config(format!("Failed to parse TOML {:?}: {}", path, e)))?;

        config.playback.validate()?;

        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Resolve the config file and load it, falling back to defaults
    ///
    /// An explicitly named file (CLI or environment) that cannot be loaded
    /// is an error; an absent default file is not.
    pub fn load_or_default(cli_arg: Option<&Path>) -> Result<Self> {
        match resolve_config_path(cli_arg) {
            Some(path) => Self::load(&path),
            None => {
                warn!("No config file found, using built-in defaults");
                Ok(Self::default())
            }
        }
    }
}

/// Locate the config file following the priority order above
///
/// CLI and environment paths are returned even if they do not exist, so
/// that loading them reports the problem. Default locations are only
/// returned when the file exists.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3/4: platform config locations
    default_config_paths().into_iter().find(|p| p.exists())
}

/// Platform config file locations, most specific first
pub fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("segue").join("config.toml"));
    }

    if cfg!(target_os = "linux") {
        paths.push(PathBuf::from("/etc/segue/config.toml"));
    }

    paths
}
