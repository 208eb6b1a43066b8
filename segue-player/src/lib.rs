//! # Segue Player Library (segue-player)
//!
//! Synchronization core of a streaming audio player.
//!
//! **Purpose:** Hand songs, seek requests and failures between the player
//! thread and a single decoder thread, and decide how many chunks of two
//! adjacent songs to crossfade.
//!
//! **Architecture:** One [`DecoderControl`] per player, shared by the
//! player thread and the decoder thread it spawns. Decoded chunks travel
//! through a [`ChunkPipe`]; the chunk pool, the pipe and the codec decode
//! loop are supplied by the caller.

pub mod chunk;
pub mod crossfade;
pub mod decoder;
pub mod error;
pub mod song;

pub use chunk::{ChunkBuffer, ChunkPipe, MusicChunk, CHUNK_SIZE};
pub use crossfade::CrossFadeSettings;
pub use decoder::{
    ControlState, Decoder, DecoderCommand, DecoderControl, DecoderPlugin, DecoderState,
};
pub use error::{DecodeError, Error, Result};
pub use song::Song;
