//! Decoder state and command types shared by both threads

use std::fmt;

/// What the decoder thread is doing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecoderState {
    /// Idle, no song loaded
    #[default]
    Stop,

    /// A song was handed over and is being opened
    Start,

    /// Producing chunks
    Decode,

    /// The last Start failed (I/O error, or no plugin could decode the
    /// song). Only reachable from `Start`; once a session reaches `Decode`
    /// it cannot end here.
    Error,
}

/// Request from the player thread to the decoder thread
///
/// The player sets it, the decoder thread resets it to `None` when the
/// work is done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecoderCommand {
    /// Nothing pending
    #[default]
    None,

    /// Begin decoding the song stored in the decoder control
    Start,

    /// Abort the current session
    Stop,

    /// Jump to `seek_where` in the current session
    Seek,
}

impl fmt::Display for DecoderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DecoderState::Stop => "stop",
            DecoderState::Start => "start",
            DecoderState::Decode => "decode",
            DecoderState::Error => "error",
        };
        f.write_str(s)
    }
}

impl fmt::Display for DecoderCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DecoderCommand::None => "none",
            DecoderCommand::Start => "start",
            DecoderCommand::Stop => "stop",
            DecoderCommand::Seek => "seek",
        };
        f.write_str(s)
    }
}
