//! Song handed from the player to the decoder
//!
//! The decoder control owns one `Song` per session. The player keeps its
//! own copy (e.g. in the playlist) and compares it against the running
//! session with [`ControlState::is_current_song`](crate::ControlState::is_current_song).

use std::fmt;

/// A song to be decoded, identified by its URI
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Song {
    uri: String,
}

impl Song {
    /// Create a song from a file path or stream URL
    pub fn new(uri: impl Into<String>) -> Self {
        Self { uri: uri.into() }
    }

    /// File path or stream URL
    pub fn uri(&self) -> &str {
        &self.uri
    }
}

impl fmt::Display for Song {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uri)
    }
}
