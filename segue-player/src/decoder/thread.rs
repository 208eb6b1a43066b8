//! Decoder thread
//!
//! One thread per [`DecoderControl`]. It sleeps on the decoder condition
//! until a command arrives, runs a decode session for each Start, and
//! exits once `quit` is set with no command pending.

use crate::decoder::bridge::{Decoder, DecoderPlugin};
use crate::decoder::command::{DecoderCommand, DecoderState};
use crate::decoder::control::{ControlState, DecoderControl};
use crate::error::{DecodeError, Error, Result};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, MutexGuard, PoisonError};
use std::thread;
use tracing::{debug, error, info, warn};

impl DecoderControl {
    /// Spawn the decoder thread
    ///
    /// The thread keeps a reference to `self` until [`quit`](Self::quit)
    /// joins it. Fails if a decoder thread is already running.
    ///
    /// # Arguments
    /// * `plugins` - Decoder plugins, tried in order for each song
    pub fn spawn(self: &Arc<Self>, plugins: Vec<Box<dyn DecoderPlugin>>) -> Result<()> {
        let mut thread = self.thread.lock().unwrap_or_else(PoisonError::into_inner);

        if thread.is_some() {
            return Err(Error::InvalidState(
                "Decoder thread already running".to_string(),
            ));
        }

        self.lock().quit = false;

        let dc = Arc::clone(self);
        let handle = thread::Builder::new()
            .name("decoder".to_string())
            .spawn(move || decoder_task(&dc, &plugins))
            .map_err(|e| Error::Thread(format!("Failed to spawn decoder thread: {}", e)))?;

        *thread = Some(handle);
        info!("Decoder thread started");

        Ok(())
    }
}

/// Command loop of the decoder thread
fn decoder_task(dc: &DecoderControl, plugins: &[Box<dyn DecoderPlugin>]) {
    debug!(
        "Decoder thread running with {} plugin(s): {}",
        plugins.len(),
        plugins
            .iter()
            .map(|p| p.name())
            .collect::<Vec<_>>()
            .join(", ")
    );

    let mut state = dc.lock();

    loop {
        match state.command {
            DecoderCommand::Start => {
                state = run_session(dc, plugins, state);
            }

            DecoderCommand::Seek => {
                // The song ended before the command was seen
                debug!("Seek arrived after the session ended");
                state.seek_error = true;
                state.command = DecoderCommand::None;
                dc.client_signal();
            }

            DecoderCommand::Stop => {
                state.command = DecoderCommand::None;
                dc.client_signal();
            }

            DecoderCommand::None => {
                if state.quit {
                    break;
                }
                state = dc.wait(state);
            }
        }
    }

    info!("Decoder thread exiting");
}

/// Decode the song installed by the last Start
///
/// The lock is released while the plugin runs and held again on return.
fn run_session<'a>(
    dc: &'a DecoderControl,
    plugins: &[Box<dyn DecoderPlugin>],
    mut state: MutexGuard<'a, ControlState>,
) -> MutexGuard<'a, ControlState> {
    let (Some(song), Some(buffer), Some(pipe)) =
        (state.song.clone(), state.buffer.clone(), state.pipe.clone())
    else {
        warn!("Start without a song, ignoring");
        state.command = DecoderCommand::None;
        dc.client_signal();
        return state;
    };

    state.state = DecoderState::Start;
    drop(state);

    let (result, initialized) = match plugins.iter().find(|p| p.supports(&song)) {
        Some(plugin) => {
            debug!("Decoding {} with {}", song, plugin.name());
            let mut decoder = Decoder::new(dc, buffer, pipe);
            let result = catch_unwind(AssertUnwindSafe(|| plugin.decode(&mut decoder, &song)))
                .unwrap_or_else(|payload| {
                    Err(DecodeError::Failed {
                        uri: song.uri().to_string(),
                        reason: format!(
                            "{} plugin panicked: {}",
                            plugin.name(),
                            panic_message(&*payload)
                        ),
                    })
                });
            (result, decoder.is_initialized())
        }
        None => (
            Err(DecodeError::Unsupported {
                uri: song.uri().to_string(),
            }),
            false,
        ),
    };

    let mut state = dc.lock();
    let stopped = state.command == DecoderCommand::Stop;

    match (result, initialized) {
        (Ok(()), true) => {
            debug!("Finished decoding {}", song);
            state.state = DecoderState::Stop;
        }
        (Err(e), true) => {
            error!("Decoding {} aborted: {}", song, e);
            state.state = DecoderState::Stop;
        }
        (_, false) if stopped => {
            debug!("Decoding {} stopped before initialization", song);
            state.state = DecoderState::Stop;
        }
        (result, false) => {
            let e = result.err().unwrap_or_else(|| DecodeError::NoAudio {
                uri: song.uri().to_string(),
            });
            error!("Failed to decode {}: {}", song, e);
            state.error = Some(e);
            state.state = DecoderState::Error;
        }
    }

    if state.command == DecoderCommand::Start {
        state.command = DecoderCommand::None;
    }
    dc.client_signal();

    state
}

/// Text of a panic payload, for the session error
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic in decoder plugin".to_string()
    }
}
