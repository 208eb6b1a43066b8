//! Error types for segue-player
//!
//! Defines module-specific error types using thiserror for clear error propagation.

use thiserror::Error;

/// Main error type for segue-player
#[derive(Error, Debug)]
pub enum Error {
    /// Errors from shared configuration/value types
    #[error(transparent)]
    Common(#[from] segue_common::Error),

    /// Song could not be decoded
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Invalid state for operation
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Decoder thread could not be spawned or joined
    #[error("Decoder thread error: {0}")]
    Thread(String),
}

/// Convenience Result type using segue-player Error
pub type Result<T> = std::result::Result<T, Error>;

/// Failure of a decode session before its first chunk
///
/// Stored in the decoder control while the state is
/// [`DecoderState::Error`](crate::DecoderState::Error). Cloneable so the
/// player can take a copy without clearing the state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// No decoder plugin accepted the song
    #[error("No decoder plugin for {uri}")]
    Unsupported { uri: String },

    /// The input could not be opened
    #[error("Failed to open {uri}: {reason}")]
    Open { uri: String, reason: String },

    /// The plugin gave up before producing audio
    #[error("Failed to decode {uri}: {reason}")]
    Failed { uri: String, reason: String },

    /// The plugin finished without reporting an audio format
    #[error("No audio found in {uri}")]
    NoAudio { uri: String },
}

impl DecodeError {
    /// URI of the song that failed
    pub fn uri(&self) -> &str {
        match self {
            DecodeError::Unsupported { uri }
            | DecodeError::Open { uri, .. }
            | DecodeError::Failed { uri, .. }
            | DecodeError::NoAudio { uri } => uri,
        }
    }
}
