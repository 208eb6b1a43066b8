//! # Segue Common Library
//!
//! Shared code for the segue player crates:
//! - Audio format value types
//! - Configuration loading
//! - Logging bootstrap
//! - Common error types

pub mod audio_format;
pub mod config;
pub mod error;
pub mod logging;

pub use audio_format::{AudioFormat, SampleFormat};
pub use config::{LoggingConfig, PlaybackConfig, TomlConfig};
pub use error::{Error, Result};

/// Size of one PCM chunk in bytes
///
/// Chunks are the unit the decoder hands to the player; buffer capacity and
/// crossfade lengths are expressed as chunk counts.
pub const CHUNK_SIZE: usize = 4096;
