//! Test helper modules for segue-player integration tests
//!
//! Provides reusable test infrastructure components:
//! - MemoryBuffer / MemoryPipe: in-memory chunk pool and queue
//! - ScriptedPlugin: decoder plugins with predictable behavior

#![allow(dead_code)]

pub mod chunks;
pub mod plugins;

pub use chunks::{MemoryBuffer, MemoryPipe};
pub use plugins::{standard_plugins, Behavior, ScriptedPlugin, CD};

use segue_player::{ChunkBuffer, ChunkPipe, DecoderControl, DecoderPlugin, Song};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Spawn a decoder thread with the given plugins
pub fn spawn_decoder(plugins: Vec<Box<dyn DecoderPlugin>>) -> Arc<DecoderControl> {
    let dc = Arc::new(DecoderControl::new());
    dc.spawn(plugins).expect("Failed to spawn decoder thread");
    dc
}

/// Start `uri` with a fresh pool of `chunks` chunks and an empty pipe
pub fn start_song(
    dc: &DecoderControl,
    uri: &str,
    chunks: usize,
) -> (Arc<MemoryBuffer>, Arc<MemoryPipe>) {
    start_range(dc, uri, chunks, 0, 0)
}

/// Like [`start_song`] with a start and stop position
pub fn start_range(
    dc: &DecoderControl,
    uri: &str,
    chunks: usize,
    start_ms: u32,
    end_ms: u32,
) -> (Arc<MemoryBuffer>, Arc<MemoryPipe>) {
    let buffer = Arc::new(MemoryBuffer::new(chunks));
    let pipe = Arc::new(MemoryPipe::default());

    dc.start(
        Song::new(uri),
        start_ms,
        end_ms,
        buffer.clone() as Arc<dyn ChunkBuffer>,
        pipe.clone() as Arc<dyn ChunkPipe>,
    );

    (buffer, pipe)
}

/// Poll `condition` until it holds, panicking after two seconds
pub fn wait_until(what: &str, mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(2);

    while !condition() {
        assert!(Instant::now() < deadline, "Timed out waiting for {}", what);
        thread::sleep(Duration::from_millis(1));
    }
}
