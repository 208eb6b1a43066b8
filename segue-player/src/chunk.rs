//! Decoded chunks and their collaborators
//!
//! The chunk pool ([`ChunkBuffer`]) and the decoder→player queue
//! ([`ChunkPipe`]) are supplied by the player. The decoder control only
//! holds them for the duration of a session and hands them to the decoder
//! thread.

pub use segue_common::CHUNK_SIZE;

/// Fixed-size unit of decoded PCM audio
#[derive(Debug, Clone)]
pub struct MusicChunk {
    data: Box<[u8; CHUNK_SIZE]>,
    length: usize,

    /// Song position (seconds) of the first sample in this chunk
    pub time: f32,
}

impl Default for MusicChunk {
    fn default() -> Self {
        Self::new()
    }
}

impl MusicChunk {
    /// Create an empty chunk
    pub fn new() -> Self {
        Self {
            data: Box::new([0u8; CHUNK_SIZE]),
            length: 0,
            time: 0.0,
        }
    }

    /// Filled portion of the chunk
    pub fn data(&self) -> &[u8] {
        &self.data[..self.length]
    }

    /// Number of bytes filled
    pub fn len(&self) -> usize {
        self.length
    }

    /// True if nothing has been written
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// True if no more bytes fit
    pub fn is_full(&self) -> bool {
        self.length == CHUNK_SIZE
    }

    /// Append as many bytes as fit, returning how many were taken
    pub fn write(&mut self, bytes: &[u8]) -> usize {
        let n = bytes.len().min(CHUNK_SIZE - self.length);
        self.data[self.length..self.length + n].copy_from_slice(&bytes[..n]);
        self.length += n;
        n
    }

    /// Empty the chunk for reuse
    pub fn reset(&mut self) {
        self.length = 0;
        self.time = 0.0;
    }
}

/// Pooled allocator of chunks
///
/// Implementations must be safe to call from the decoder thread (allocate)
/// and the player thread (release) concurrently.
pub trait ChunkBuffer: Send + Sync {
    /// Take a chunk from the pool, or `None` if all chunks are in use
    fn allocate(&self) -> Option<MusicChunk>;

    /// Return a chunk to the pool
    fn release(&self, chunk: MusicChunk);
}

/// Ordered hand-off queue from the decoder to the player (FIFO)
pub trait ChunkPipe: Send + Sync {
    /// Append a chunk (decoder thread)
    fn push(&self, chunk: MusicChunk);

    /// Remove the oldest chunk (player thread)
    fn shift(&self) -> Option<MusicChunk>;

    /// Number of queued chunks
    fn len(&self) -> usize;

    /// True if no chunks are queued
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Release every queued chunk back into `buffer`
    fn clear(&self, buffer: &dyn ChunkBuffer) {
        while let Some(chunk) = self.shift() {
            buffer.release(chunk);
        }
    }
}
