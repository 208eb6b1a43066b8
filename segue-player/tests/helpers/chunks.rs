//! In-memory chunk pool and pipe

use segue_player::{ChunkBuffer, ChunkPipe, MusicChunk};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Fixed-capacity chunk pool
pub struct MemoryBuffer {
    size: usize,
    in_use: Mutex<usize>,
}

impl MemoryBuffer {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            in_use: Mutex::new(0),
        }
    }

    /// Chunks currently handed out
    pub fn in_use(&self) -> usize {
        *self.in_use.lock().unwrap()
    }
}

impl ChunkBuffer for MemoryBuffer {
    fn allocate(&self) -> Option<MusicChunk> {
        let mut in_use = self.in_use.lock().unwrap();
        if *in_use >= self.size {
            return None;
        }
        *in_use += 1;
        Some(MusicChunk::new())
    }

    fn release(&self, _chunk: MusicChunk) {
        let mut in_use = self.in_use.lock().unwrap();
        assert!(*in_use > 0, "Released more chunks than allocated");
        *in_use -= 1;
    }
}

/// FIFO of decoded chunks
#[derive(Default)]
pub struct MemoryPipe {
    chunks: Mutex<VecDeque<MusicChunk>>,
}

impl MemoryPipe {
    /// Song positions of the queued chunks
    pub fn times(&self) -> Vec<f32> {
        self.chunks.lock().unwrap().iter().map(|c| c.time).collect()
    }
}

impl ChunkPipe for MemoryPipe {
    fn push(&self, chunk: MusicChunk) {
        self.chunks.lock().unwrap().push_back(chunk);
    }

    fn shift(&self) -> Option<MusicChunk> {
        self.chunks.lock().unwrap().pop_front()
    }

    fn len(&self) -> usize {
        self.chunks.lock().unwrap().len()
    }
}
