//! Decoder control
//!
//! The one place where the player thread and the decoder thread share
//! mutable state. Everything lives behind a single mutex; two condition
//! variables hang off it:
//! - `cond`: the decoder thread waits here for commands (and for free
//!   chunks)
//! - `client_cond`: the player thread waits here for the decoder thread to
//!   acknowledge a command or report progress
//!
//! Commands are strictly serialized: the player waits for `command` to
//! return to `None` before sending the next one, and the decoder thread is
//! the only one that resets it. There are no timeouts; the decoder thread
//! polls for commands often enough that a synchronous command returns
//! promptly.
//!
//! Methods on [`ControlState`] require the lock (obtain it with
//! [`DecoderControl::lock`]); the `lock_*` methods on [`DecoderControl`]
//! take it themselves.

use crate::chunk::{ChunkBuffer, ChunkPipe};
use crate::crossfade::{CrossFadeSettings, Transition};
use crate::decoder::command::{DecoderCommand, DecoderState};
use crate::error::{DecodeError, Result};
use crate::song::Song;
use segue_common::AudioFormat;
use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use tracing::{debug, error, info};

/// Fields protected by the decoder control lock
pub struct ControlState {
    pub(crate) state: DecoderState,
    pub(crate) command: DecoderCommand,

    /// Set iff `state == Error`
    pub(crate) error: Option<DecodeError>,

    /// Set once; the decoder thread exits after its current command
    pub(crate) quit: bool,

    pub(crate) seekable: bool,
    pub(crate) seek_error: bool,
    pub(crate) seek_where: f64,

    /// Format of the song file
    pub(crate) in_audio_format: AudioFormat,

    /// Format of the chunks sent to the pipe
    pub(crate) out_audio_format: AudioFormat,

    /// Song of the current session, owned until replaced by the next Start
    pub(crate) song: Option<Song>,

    /// Initial position (ms), e.g. the start of a CUE sub-track
    pub(crate) start_ms: u32,

    /// Stop position (ms); 0 means decode to the end of the file
    pub(crate) end_ms: u32,

    pub(crate) total_time: f32,

    /// Chunk allocator and destination pipe, borrowed from the player for
    /// the session
    pub(crate) buffer: Option<Arc<dyn ChunkBuffer>>,
    pub(crate) pipe: Option<Arc<dyn ChunkPipe>>,

    pub(crate) replay_gain_db: f32,
    pub(crate) replay_gain_prev_db: f32,
    pub(crate) mixramp_start: Option<String>,
    pub(crate) mixramp_end: Option<String>,
    pub(crate) mixramp_prev_end: Option<String>,
}

impl Default for ControlState {
    fn default() -> Self {
        Self {
            state: DecoderState::Stop,
            command: DecoderCommand::None,
            error: None,
            quit: false,
            seekable: false,
            seek_error: false,
            seek_where: 0.0,
            in_audio_format: AudioFormat::undefined(),
            out_audio_format: AudioFormat::undefined(),
            song: None,
            start_ms: 0,
            end_ms: 0,
            total_time: 0.0,
            buffer: None,
            pipe: None,
            replay_gain_db: 0.0,
            replay_gain_prev_db: 0.0,
            mixramp_start: None,
            mixramp_end: None,
            mixramp_prev_end: None,
        }
    }
}

impl fmt::Debug for ControlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControlState")
            .field("state", &self.state)
            .field("command", &self.command)
            .field("error", &self.error)
            .field("quit", &self.quit)
            .field("seekable", &self.seekable)
            .field("song", &self.song)
            .field("out_audio_format", &self.out_audio_format)
            .field("total_time", &self.total_time)
            .finish_non_exhaustive()
    }
}

impl ControlState {
    pub fn state(&self) -> DecoderState {
        self.state
    }

    pub fn command(&self) -> DecoderCommand {
        self.command
    }

    /// True if the decoder thread has nothing loaded (stopped or failed)
    pub fn is_idle(&self) -> bool {
        matches!(self.state, DecoderState::Stop | DecoderState::Error)
    }

    pub fn is_starting(&self) -> bool {
        self.state == DecoderState::Start
    }

    /// True if the last Start failed
    ///
    /// Only meaningful while no command is pending.
    pub fn has_failed(&self) -> bool {
        debug_assert_eq!(self.command, DecoderCommand::None);

        self.state == DecoderState::Error
    }

    /// Copy of the error of the failed session, if any
    ///
    /// Must not be called while a command is pending.
    pub fn get_error(&self) -> Option<DecodeError> {
        debug_assert_eq!(self.command, DecoderCommand::None);
        debug_assert!(self.state != DecoderState::Error || self.error.is_some());

        if self.state == DecoderState::Error {
            self.error.clone()
        } else {
            None
        }
    }

    /// Like [`get_error`](Self::get_error), as a `Result`
    pub fn check_error(&self) -> Result<()> {
        match self.get_error() {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    /// Leave the Error state and drop the error payload
    pub fn clear_error(&mut self) {
        if self.state == DecoderState::Error {
            self.error = None;
            self.state = DecoderState::Stop;
        }
    }

    /// True if `song` is the song being started or decoded
    ///
    /// Always false while the decoder is stopped or failed.
    pub fn is_current_song(&self, song: &Song) -> bool {
        match self.state {
            DecoderState::Stop | DecoderState::Error => false,
            DecoderState::Start | DecoderState::Decode => self.song.as_ref() == Some(song),
        }
    }

    pub fn song(&self) -> Option<&Song> {
        self.song.as_ref()
    }

    pub fn start_ms(&self) -> u32 {
        self.start_ms
    }

    pub fn end_ms(&self) -> u32 {
        self.end_ms
    }

    pub fn seekable(&self) -> bool {
        self.seekable
    }

    pub fn seek_error(&self) -> bool {
        self.seek_error
    }

    pub fn seek_where(&self) -> f64 {
        self.seek_where
    }

    pub fn in_audio_format(&self) -> AudioFormat {
        self.in_audio_format
    }

    pub fn out_audio_format(&self) -> AudioFormat {
        self.out_audio_format
    }

    pub fn total_time(&self) -> f32 {
        self.total_time
    }

    pub fn replay_gain_db(&self) -> f32 {
        self.replay_gain_db
    }

    pub fn replay_gain_prev_db(&self) -> f32 {
        self.replay_gain_prev_db
    }

    pub fn mixramp_start(&self) -> Option<&str> {
        self.mixramp_start.as_deref()
    }

    pub fn mixramp_end(&self) -> Option<&str> {
        self.mixramp_end.as_deref()
    }

    pub fn mixramp_prev_end(&self) -> Option<&str> {
        self.mixramp_prev_end.as_deref()
    }

    pub fn set_mixramp_start(&mut self, mixramp_start: Option<String>) {
        self.mixramp_start = mixramp_start;
    }

    pub fn set_mixramp_end(&mut self, mixramp_end: Option<String>) {
        self.mixramp_end = mixramp_end;
    }

    pub fn set_mixramp_prev_end(&mut self, mixramp_prev_end: Option<String>) {
        self.mixramp_prev_end = mixramp_prev_end;
    }

    /// Crossfade length (chunks) from the current song to the one this
    /// decoder is producing
    ///
    /// # Arguments
    /// * `settings` - User crossfade preferences
    /// * `play_format` - Format of the song currently playing
    /// * `max_chunks` - Buffer capacity available for the overlap
    pub fn cross_fade_chunks(
        &self,
        settings: &CrossFadeSettings,
        play_format: AudioFormat,
        max_chunks: u32,
    ) -> u32 {
        let transition = Transition {
            total_time: self.total_time,
            replay_gain_db: self.replay_gain_db,
            replay_gain_prev_db: self.replay_gain_prev_db,
            mixramp_start: self.mixramp_start.as_deref(),
            mixramp_prev_end: self.mixramp_prev_end.as_deref(),
            format: self.out_audio_format,
            old_format: play_format,
        };

        settings.calculate(&transition, max_chunks)
    }

    /// Reset per-session fields and install the next song
    ///
    /// The ending session's end curve and replay gain become the "previous"
    /// values the crossfade calculation needs.
    fn begin_session(
        &mut self,
        song: Song,
        start_ms: u32,
        end_ms: u32,
        buffer: Arc<dyn ChunkBuffer>,
        pipe: Arc<dyn ChunkPipe>,
    ) {
        self.mixramp_prev_end = self.mixramp_end.take();
        self.mixramp_start = None;
        self.replay_gain_prev_db = self.replay_gain_db;
        self.replay_gain_db = 0.0;

        self.in_audio_format = AudioFormat::undefined();
        self.out_audio_format = AudioFormat::undefined();
        self.seekable = false;
        self.seek_error = false;
        self.seek_where = 0.0;
        self.total_time = 0.0;

        self.song = Some(song);
        self.start_ms = start_ms;
        self.end_ms = end_ms;
        self.buffer = Some(buffer);
        self.pipe = Some(pipe);
    }
}

/// Shared coordination object between the player thread and the decoder
/// thread
///
/// Created once per player and reused for every song. Call
/// [`quit`](Self::quit) before dropping the last reference: the decoder
/// thread holds one of its own.
pub struct DecoderControl {
    state: Mutex<ControlState>,

    /// Signalled after `command` changes (decoder thread waits)
    cond: Condvar,

    /// Signalled by the decoder thread (player thread waits)
    client_cond: Condvar,

    /// Handle of the decoder thread, `None` if not running
    pub(crate) thread: Mutex<Option<JoinHandle<()>>>,
}

impl Default for DecoderControl {
    fn default() -> Self {
        Self::new()
    }
}

impl DecoderControl {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ControlState::default()),
            cond: Condvar::new(),
            client_cond: Condvar::new(),
            thread: Mutex::new(None),
        }
    }

    /// Lock the object
    ///
    /// A poisoned lock is recovered: every update is a plain field
    /// assignment, so the state stays consistent.
    pub fn lock(&self) -> MutexGuard<'_, ControlState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Wake the decoder thread
    ///
    /// Call with the lock held, e.g. after releasing chunks so a decoder
    /// blocked on a full buffer can continue.
    pub fn signal(&self) {
        self.cond.notify_one();
    }

    /// Lock, wake the decoder thread, unlock
    pub fn lock_signal(&self) {
        let _guard = self.lock();
        self.signal();
    }

    /// Wake every player-side waiter (decoder thread only)
    pub(crate) fn client_signal(&self) {
        self.client_cond.notify_all();
    }

    /// Wait for a command (decoder thread only)
    pub(crate) fn wait<'a>(
        &'a self,
        guard: MutexGuard<'a, ControlState>,
    ) -> MutexGuard<'a, ControlState> {
        self.cond.wait(guard).unwrap_or_else(PoisonError::into_inner)
    }

    /// Wait for a signal from the decoder thread (player thread only)
    pub fn wait_for_decoder<'a>(
        &'a self,
        guard: MutexGuard<'a, ControlState>,
    ) -> MutexGuard<'a, ControlState> {
        self.client_cond
            .wait(guard)
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Wait until the decoder thread has finished the pending command
    fn wait_command_locked<'a>(
        &'a self,
        mut guard: MutexGuard<'a, ControlState>,
    ) -> MutexGuard<'a, ControlState> {
        while guard.command != DecoderCommand::None {
            guard = self.wait_for_decoder(guard);
        }
        guard
    }

    /// Send a command and wait for the decoder thread to finish it
    fn synchronous_command_locked<'a>(
        &'a self,
        mut guard: MutexGuard<'a, ControlState>,
        command: DecoderCommand,
    ) -> MutexGuard<'a, ControlState> {
        debug!("Decoder command: {}", command);
        guard.command = command;
        self.signal();
        self.wait_command_locked(guard)
    }

    /// Start decoding a song
    ///
    /// Takes ownership of `song`, replacing (and dropping) the previous
    /// session's song. Any error of the previous session is discarded.
    /// Returns once the decoder thread has opened the song (state
    /// `Decode`) or failed to (state `Error`).
    ///
    /// # Arguments
    /// * `song` - Song to decode
    /// * `start_ms` - Initial position in milliseconds
    /// * `end_ms` - Stop position in milliseconds, 0 for end of file
    /// * `buffer` - Chunk allocator for the session
    /// * `pipe` - Destination of decoded chunks (expected empty)
    pub fn start(
        &self,
        song: Song,
        start_ms: u32,
        end_ms: u32,
        buffer: Arc<dyn ChunkBuffer>,
        pipe: Arc<dyn ChunkPipe>,
    ) {
        debug_assert!(pipe.is_empty());

        let mut guard = self.wait_command_locked(self.lock());

        if !guard.is_idle() {
            guard = self.synchronous_command_locked(guard, DecoderCommand::Stop);
        }

        guard.clear_error();
        info!("Starting decoder: {} (start={}ms, end={}ms)", song, start_ms, end_ms);
        guard.begin_session(song, start_ms, end_ms, buffer, pipe);

        let guard = self.synchronous_command_locked(guard, DecoderCommand::Start);

        if let Some(e) = &guard.error {
            error!("Decoder failed to start: {}", e);
        }
    }

    /// Stop the current session
    ///
    /// A pending command is cancelled (replaced by Stop). Does nothing if
    /// the decoder is already idle with no command pending.
    pub fn stop(&self) {
        let mut guard = self.lock();

        if guard.command != DecoderCommand::None {
            // Too late to cancel if the decoder thread already picked up
            // the old command; then the check below stops it again.
            guard = self.synchronous_command_locked(guard, DecoderCommand::Stop);
        }

        if !guard.is_idle() {
            let _guard = self.synchronous_command_locked(guard, DecoderCommand::Stop);
        }
    }

    /// Seek the current session to `where_` seconds
    ///
    /// Waits for any pending command first. Returns false without
    /// contacting the decoder thread if no song is being decoded or it is
    /// not seekable; otherwise returns whether the decoder managed to
    /// seek. A failed seek leaves the position unchanged. A seek cancelled
    /// by a concurrent [`stop`](Self::stop) reports success.
    pub fn seek(&self, where_: f64) -> bool {
        debug_assert!(where_ >= 0.0);

        let mut guard = self.wait_command_locked(self.lock());

        if guard.state != DecoderState::Decode || !guard.seekable {
            debug!(
                "Seek rejected: state={}, seekable={}",
                guard.state, guard.seekable
            );
            return false;
        }

        guard.seek_where = where_;
        guard.seek_error = false;
        let guard = self.synchronous_command_locked(guard, DecoderCommand::Seek);

        !guard.seek_error
    }

    /// Stop the decoder thread and wait for it to exit
    ///
    /// The join happens after the lock is released.
    pub fn quit(&self) {
        let handle = self
            .thread
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        let mut guard = self.lock();
        guard.quit = true;

        let Some(handle) = handle else {
            debug!("Decoder quit without a running thread");
            return;
        };

        if guard.command != DecoderCommand::None || !guard.is_idle() {
            guard = self.synchronous_command_locked(guard, DecoderCommand::Stop);
        }

        self.signal();
        drop(guard);

        match handle.join() {
            Ok(()) => info!("Decoder thread joined"),
            Err(e) => error!("Decoder thread panicked: {:?}", e),
        }
    }

    /// Replace the MixRamp curve of the current song's start
    pub fn mixramp_start(&self, mixramp_start: Option<String>) {
        self.lock().set_mixramp_start(mixramp_start);
    }

    /// Replace the MixRamp curve of the current song's end
    pub fn mixramp_end(&self, mixramp_end: Option<String>) {
        self.lock().set_mixramp_end(mixramp_end);
    }

    /// Replace the MixRamp curve of the previous song's end
    pub fn mixramp_prev_end(&self, mixramp_prev_end: Option<String>) {
        self.lock().set_mixramp_prev_end(mixramp_prev_end);
    }

    pub fn lock_is_idle(&self) -> bool {
        self.lock().is_idle()
    }

    pub fn lock_is_starting(&self) -> bool {
        self.lock().is_starting()
    }

    pub fn lock_has_failed(&self) -> bool {
        self.lock().has_failed()
    }

    pub fn lock_get_error(&self) -> Option<DecodeError> {
        self.lock().get_error()
    }

    pub fn lock_clear_error(&self) {
        self.lock().clear_error();
    }

    pub fn lock_is_current_song(&self, song: &Song) -> bool {
        self.lock().is_current_song(song)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failed_state() -> ControlState {
        ControlState {
            state: DecoderState::Error,
            error: Some(DecodeError::NoAudio {
                uri: "silence.wav".to_string(),
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_initial_state_is_idle() {
        let dc = DecoderControl::new();

        assert!(dc.lock_is_idle());
        assert!(!dc.lock_is_starting());
        assert!(!dc.lock_has_failed());
        assert_eq!(dc.lock_get_error(), None);
        assert_eq!(dc.lock().command(), DecoderCommand::None);
    }

    #[test]
    fn test_get_error_only_in_error_state() {
        let state = failed_state();
        assert!(state.has_failed());
        assert_eq!(
            state.get_error(),
            Some(DecodeError::NoAudio {
                uri: "silence.wav".to_string()
            })
        );
        assert!(state.check_error().is_err());

        let state = ControlState {
            state: DecoderState::Decode,
            ..Default::default()
        };
        assert_eq!(state.get_error(), None);
        assert!(state.check_error().is_ok());
    }

    #[test]
    fn test_clear_error() {
        let mut state = failed_state();

        state.clear_error();

        assert_eq!(state.state(), DecoderState::Stop);
        assert_eq!(state.get_error(), None);
    }

    #[test]
    fn test_clear_error_leaves_other_states_alone() {
        let mut state = ControlState {
            state: DecoderState::Decode,
            ..Default::default()
        };

        state.clear_error();

        assert_eq!(state.state(), DecoderState::Decode);
    }

    #[test]
    fn test_is_current_song_false_when_idle() {
        let song = Song::new("a.flac");
        let mut state = ControlState {
            song: Some(song.clone()),
            ..Default::default()
        };

        assert!(!state.is_current_song(&song));

        state.state = DecoderState::Error;
        assert!(!state.is_current_song(&song));

        state.state = DecoderState::Start;
        assert!(state.is_current_song(&song));

        state.state = DecoderState::Decode;
        assert!(state.is_current_song(&song));
        assert!(!state.is_current_song(&Song::new("b.flac")));
    }

    #[test]
    fn test_mixramp_setters_replace() {
        let dc = DecoderControl::new();

        dc.mixramp_start(Some("-6 2.0".to_string()));
        dc.mixramp_start(Some("-3 4.0".to_string()));
        dc.mixramp_end(Some("-9 1.0".to_string()));
        dc.mixramp_prev_end(None);

        let state = dc.lock();
        assert_eq!(state.mixramp_start(), Some("-3 4.0"));
        assert_eq!(state.mixramp_end(), Some("-9 1.0"));
        assert_eq!(state.mixramp_prev_end(), None);
    }

    #[test]
    fn test_stop_when_idle_returns_immediately() {
        // No decoder thread exists; a synchronous command would hang
        let dc = DecoderControl::new();
        dc.stop();
        assert!(dc.lock_is_idle());
    }

    #[test]
    fn test_seek_rejected_when_not_decoding() {
        let dc = DecoderControl::new();
        assert!(!dc.seek(10.0));

        dc.lock().state = DecoderState::Decode;
        // Not seekable
        assert!(!dc.seek(10.0));
    }

    #[test]
    fn test_quit_without_thread() {
        let dc = DecoderControl::new();
        dc.quit();
        assert!(dc.lock().quit);
    }

    fn wait_for_command(dc: &DecoderControl, command: DecoderCommand) {
        while dc.lock().command != command {
            std::thread::sleep(std::time::Duration::from_millis(1));
        }
    }

    #[test]
    fn test_seek_cancelled_by_stop_reports_success() {
        let dc = Arc::new(DecoderControl::new());
        {
            let mut state = dc.lock();
            state.state = DecoderState::Decode;
            state.seekable = true;
        }

        let seeker = {
            let dc = Arc::clone(&dc);
            std::thread::spawn(move || dc.seek(3.0))
        };
        wait_for_command(&dc, DecoderCommand::Seek);

        let stopper = {
            let dc = Arc::clone(&dc);
            std::thread::spawn(move || dc.stop())
        };
        wait_for_command(&dc, DecoderCommand::Stop);

        // Play the decoder thread: the Stop replaced the Seek
        {
            let mut state = dc.lock();
            state.state = DecoderState::Stop;
            state.command = DecoderCommand::None;
            dc.client_signal();
        }

        stopper.join().unwrap();
        assert!(seeker.join().unwrap());
        assert!(!dc.lock().seek_error());
        assert!(dc.lock_is_idle());
    }
}
