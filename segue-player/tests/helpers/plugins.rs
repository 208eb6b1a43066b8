//! Scripted decoder plugins
//!
//! Each plugin claims songs by file suffix and produces silent CD-format
//! chunks (or fails) in a predictable way.

use segue_common::{AudioFormat, SampleFormat};
use segue_player::{DecodeError, Decoder, DecoderCommand, DecoderPlugin, Song, CHUNK_SIZE};
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::sync::Mutex;
use std::time::Duration;

pub const CD: AudioFormat = AudioFormat::new(44100, SampleFormat::S16, 2);

/// Duration reported by every tone plugin (seconds)
pub const TOTAL_TIME: f32 = 180.0;

/// MixRamp curve reported by the `.mix` plugin for both song edges
pub const MIXRAMP_CURVE: &str = "-6 2.0;-3 4.0";

pub enum Behavior {
    /// Report CD format, then produce up to `chunks` chunks
    Tone {
        chunks: usize,
        seekable: bool,
        fail_seek: bool,
        mixramp: Option<(f32, &'static str, &'static str)>,
    },

    /// Fail before reporting a format
    FailOpen,

    /// Return without reporting a format
    NoAudio,

    /// Give up on unreadable data before reporting a format
    Corrupt,

    /// Panic before reporting a format
    PanicOnOpen,

    /// Report CD format, produce `chunks` chunks, then panic
    PanicWhileDecoding { chunks: usize },

    /// Stay in the Start state until the gate opens (or Stop arrives)
    Gated {
        gate: Mutex<Receiver<()>>,
        seekable: bool,
    },
}

pub struct ScriptedPlugin {
    suffix: &'static str,
    behavior: Behavior,
}

impl ScriptedPlugin {
    pub fn new(suffix: &'static str, behavior: Behavior) -> Self {
        Self { suffix, behavior }
    }

    pub fn boxed(suffix: &'static str, behavior: Behavior) -> Box<dyn DecoderPlugin> {
        Box::new(Self::new(suffix, behavior))
    }
}

impl DecoderPlugin for ScriptedPlugin {
    fn name(&self) -> &str {
        self.suffix
    }

    fn supports(&self, song: &Song) -> bool {
        song.uri().ends_with(self.suffix)
    }

    fn decode(&self, decoder: &mut Decoder<'_>, song: &Song) -> Result<(), DecodeError> {
        match &self.behavior {
            Behavior::Tone {
                chunks,
                seekable,
                fail_seek,
                mixramp,
            } => {
                if let Some((gain, start, end)) = mixramp {
                    decoder.mixramp(*gain, Some(start.to_string()), Some(end.to_string()));
                }
                decoder.initialized(CD, CD, *seekable, TOTAL_TIME);
                play(decoder, *chunks, *fail_seek)
            }

            Behavior::FailOpen => Err(DecodeError::Open {
                uri: song.uri().to_string(),
                reason: "No such file or directory".to_string(),
            }),

            Behavior::NoAudio => Ok(()),

            Behavior::Corrupt => Err(DecodeError::Failed {
                uri: song.uri().to_string(),
                reason: "Invalid frame header".to_string(),
            }),

            Behavior::PanicOnOpen => panic!("Header parser overflow in {}", song),

            Behavior::PanicWhileDecoding { chunks } => {
                decoder.initialized(CD, CD, true, TOTAL_TIME);
                play(decoder, *chunks, false)?;
                panic!("Frame decoder overflow in {}", song)
            }

            Behavior::Gated { gate, seekable } => {
                let gate = gate.lock().unwrap();
                loop {
                    match gate.recv_timeout(Duration::from_millis(1)) {
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                        Err(RecvTimeoutError::Timeout) => {
                            if decoder.command() == DecoderCommand::Stop {
                                return Ok(());
                            }
                        }
                    }
                }
                decoder.initialized(CD, CD, *seekable, TOTAL_TIME);
                play(decoder, usize::MAX, false)
            }
        }
    }
}

/// Produce silent chunks, answering Seek and Stop between chunks
fn play(decoder: &mut Decoder<'_>, chunks: usize, fail_seek: bool) -> Result<(), DecodeError> {
    let chunks_per_second = CD.time_to_size() as f64 / CHUNK_SIZE as f64;
    let mut produced = (decoder.start_ms() as f64 / 1000.0 * chunks_per_second) as usize;

    while produced < chunks {
        match decoder.command() {
            DecoderCommand::Stop => return Ok(()),
            DecoderCommand::Seek => {
                if fail_seek {
                    decoder.seek_error();
                } else {
                    produced = (decoder.seek_where() * chunks_per_second) as usize;
                    decoder.command_finished();
                }
                continue;
            }
            DecoderCommand::None | DecoderCommand::Start => {}
        }

        let Some(mut chunk) = decoder.get_chunk() else {
            continue;
        };
        chunk.write(&[0u8; CHUNK_SIZE]);
        chunk.time = (produced as f64 / chunks_per_second) as f32;
        produced += 1;

        if decoder.submit_chunk(chunk) == DecoderCommand::Stop {
            return Ok(());
        }
    }

    Ok(())
}

/// One plugin per scripted behavior, claimed by suffix:
/// - `.tone`: endless, seekable
/// - `.stream`: endless, not seekable
/// - `.badseek`: endless, every seek fails
/// - `.short`: three chunks
/// - `.mix`: endless, with MixRamp tags
/// - `.broken`: fails to open
/// - `.empty`: no audio
/// - `.corrupt`: fails before the first chunk
/// - `.crash`: panics before reporting a format
/// - `.glitch`: panics after two chunks
pub fn standard_plugins() -> Vec<Box<dyn DecoderPlugin>> {
    let tone = |chunks, seekable, fail_seek| Behavior::Tone {
        chunks,
        seekable,
        fail_seek,
        mixramp: None,
    };

    vec![
        ScriptedPlugin::boxed(".tone", tone(usize::MAX, true, false)),
        ScriptedPlugin::boxed(".stream", tone(usize::MAX, false, false)),
        ScriptedPlugin::boxed(".badseek", tone(usize::MAX, true, true)),
        ScriptedPlugin::boxed(".short", tone(3, true, false)),
        ScriptedPlugin::boxed(
            ".mix",
            Behavior::Tone {
                chunks: usize::MAX,
                seekable: true,
                fail_seek: false,
                mixramp: Some((0.0, MIXRAMP_CURVE, MIXRAMP_CURVE)),
            },
        ),
        ScriptedPlugin::boxed(".broken", Behavior::FailOpen),
        ScriptedPlugin::boxed(".empty", Behavior::NoAudio),
        ScriptedPlugin::boxed(".corrupt", Behavior::Corrupt),
        ScriptedPlugin::boxed(".crash", Behavior::PanicOnOpen),
        ScriptedPlugin::boxed(".glitch", Behavior::PanicWhileDecoding { chunks: 2 }),
    ]
}
