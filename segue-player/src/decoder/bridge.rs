//! Decoder-thread side of the command handshake
//!
//! A [`DecoderPlugin`] receives a [`Decoder`] for each session. The plugin
//! reports the song's format through [`Decoder::initialized`], polls
//! [`Decoder::command`] between chunks, and answers Seek and Stop requests.
//! The codec work itself happens inside the plugin.

use crate::chunk::{ChunkBuffer, ChunkPipe, MusicChunk};
use crate::decoder::command::{DecoderCommand, DecoderState};
use crate::decoder::control::DecoderControl;
use crate::error::DecodeError;
use crate::song::Song;
use segue_common::AudioFormat;
use std::sync::Arc;
use tracing::{debug, warn};

/// Codec-specific decode loop
///
/// Implementations must call [`Decoder::initialized`] once the audio format
/// is known, then submit chunks until the song ends or a Stop command
/// arrives. Returning an error before `initialized` fails the session;
/// afterwards the error is only logged. A panic in `decode` is caught and
/// handled like a [`DecodeError::Failed`].
pub trait DecoderPlugin: Send + Sync {
    /// Plugin name for logs
    fn name(&self) -> &str;

    /// True if this plugin can decode `song`
    fn supports(&self, song: &Song) -> bool;

    /// Decode `song` into chunks
    fn decode(&self, decoder: &mut Decoder<'_>, song: &Song) -> Result<(), DecodeError>;
}

/// Handle given to a plugin for one decode session
pub struct Decoder<'a> {
    dc: &'a DecoderControl,
    buffer: Arc<dyn ChunkBuffer>,
    pipe: Arc<dyn ChunkPipe>,

    /// Set by [`initialized`](Self::initialized)
    initialized: bool,
}

impl<'a> Decoder<'a> {
    pub(crate) fn new(
        dc: &'a DecoderControl,
        buffer: Arc<dyn ChunkBuffer>,
        pipe: Arc<dyn ChunkPipe>,
    ) -> Self {
        Self {
            dc,
            buffer,
            pipe,
            initialized: false,
        }
    }

    /// True once the plugin has reported its format
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Report the song's format and move the session to Decode
    ///
    /// Acknowledges the Start command, which unblocks the player thread.
    ///
    /// # Arguments
    /// * `in_format` - Format of the song file
    /// * `out_format` - Format of the chunks this plugin will submit
    /// * `seekable` - Whether Seek commands can be honored
    /// * `total_time` - Song duration in seconds, 0 if unknown
    pub fn initialized(
        &mut self,
        in_format: AudioFormat,
        out_format: AudioFormat,
        seekable: bool,
        total_time: f32,
    ) {
        debug_assert!(!self.initialized);
        debug_assert!(out_format.is_valid());

        let mut state = self.dc.lock();
        debug_assert_eq!(state.state, DecoderState::Start);

        state.in_audio_format = in_format;
        state.out_audio_format = out_format;
        state.seekable = seekable;
        state.total_time = total_time;
        state.state = DecoderState::Decode;

        if state.command == DecoderCommand::Start {
            state.command = DecoderCommand::None;
        }

        self.initialized = true;
        self.dc.client_signal();

        debug!(
            "Decoder initialized: {} -> {}, seekable={}, {:.3}s",
            in_format, out_format, seekable, total_time
        );
    }

    /// Current command
    ///
    /// The Start command is internal to the handshake and reads as `None`.
    pub fn command(&self) -> DecoderCommand {
        match self.dc.lock().command {
            DecoderCommand::Start => DecoderCommand::None,
            command => command,
        }
    }

    /// Acknowledge the current command
    ///
    /// After a Seek, chunks from the old position still in the pipe are
    /// released.
    pub fn command_finished(&mut self) {
        let mut state = self.dc.lock();
        debug_assert!(state.command != DecoderCommand::None);

        if state.command == DecoderCommand::Seek {
            self.pipe.clear(self.buffer.as_ref());
        }

        state.command = DecoderCommand::None;
        self.dc.client_signal();
    }

    /// Requested seek target in seconds
    pub fn seek_where(&self) -> f64 {
        let state = self.dc.lock();
        debug_assert_eq!(state.command, DecoderCommand::Seek);

        state.seek_where
    }

    /// Mark the pending Seek failed and acknowledge it
    pub fn seek_error(&mut self) {
        let mut state = self.dc.lock();
        debug_assert_eq!(state.command, DecoderCommand::Seek);

        warn!("Seek to {:.3}s failed", state.seek_where);
        state.seek_error = true;
        state.command = DecoderCommand::None;
        self.dc.client_signal();
    }

    /// Session start position in milliseconds
    pub fn start_ms(&self) -> u32 {
        self.dc.lock().start_ms
    }

    /// Session stop position in milliseconds, 0 for end of file
    pub fn end_ms(&self) -> u32 {
        self.dc.lock().end_ms
    }

    /// Allocate an empty chunk
    ///
    /// Blocks while the pool is exhausted. Returns `None` when a command
    /// arrives in the meantime; the plugin should then check
    /// [`command`](Self::command).
    pub fn get_chunk(&mut self) -> Option<MusicChunk> {
        let mut state = self.dc.lock();

        loop {
            if !matches!(state.command, DecoderCommand::None | DecoderCommand::Start) {
                return None;
            }

            if let Some(chunk) = self.buffer.allocate() {
                return Some(chunk);
            }

            state = self.dc.wait(state);
        }
    }

    /// Hand a chunk to the player and return the current command
    ///
    /// Empty chunks go straight back to the pool. A chunk that starts at
    /// or after the session's stop position is dropped and `Stop` is
    /// returned.
    pub fn submit_chunk(&mut self, chunk: MusicChunk) -> DecoderCommand {
        let end_ms = self.end_ms();
        if end_ms > 0 && chunk.time * 1000.0 >= end_ms as f32 {
            self.buffer.release(chunk);
            return DecoderCommand::Stop;
        }

        if chunk.is_empty() {
            self.buffer.release(chunk);
        } else {
            self.pipe.push(chunk);
            let _state = self.dc.lock();
            self.dc.client_signal();
        }

        self.command()
    }

    /// Record the song's replay gain (dB)
    pub fn replay_gain(&mut self, db: f32) {
        self.dc.lock().replay_gain_db = db;
    }

    /// Record the song's replay gain and MixRamp curves
    pub fn mixramp(&mut self, replay_gain_db: f32, start: Option<String>, end: Option<String>) {
        let mut state = self.dc.lock();
        state.replay_gain_db = replay_gain_db;
        state.mixramp_start = start;
        state.mixramp_end = end;
    }
}
