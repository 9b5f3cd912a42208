//! Content-defined chunk boundary detection.
//!
//! A gear rolling hash is fed one byte at a time; a boundary falls after
//! the byte where the hash's low bits are all zero, bounded below by
//! `min_size` and above by `max_size`. Boundaries depend only on the bytes,
//! so two writers fed the same stream cut it identically no matter how the
//! stream is split into reads.

use serde::{Deserialize, Serialize};

/// Chunk size parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub min_size: usize,
    /// Target average; rounded down to a power of two for the hash mask.
    pub avg_size: usize,
    pub max_size: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            min_size: 512 * 1024,
            avg_size: 1024 * 1024,
            max_size: 8 * 1024 * 1024,
        }
    }
}

impl ChunkingConfig {
    /// Small chunks, for tests that want many boundaries over little data.
    pub fn small() -> Self {
        Self {
            min_size: 64,
            avg_size: 256,
            max_size: 1024,
        }
    }

    /// Check the sizes are usable.
    pub fn validate(&self) -> Result<(), String> {
        if self.min_size == 0 || self.avg_size == 0 || self.max_size == 0 {
            return Err("chunk sizes must be non-zero".into());
        }
        if !(self.min_size <= self.avg_size && self.avg_size <= self.max_size) {
            return Err(format!(
                "chunk sizes must satisfy min <= avg <= max (got {} / {} / {})",
                self.min_size, self.avg_size, self.max_size
            ));
        }
        Ok(())
    }

    fn mask(&self) -> u64 {
        let bits = usize::BITS - 1 - self.avg_size.max(1).leading_zeros();
        (1u64 << bits) - 1
    }
}

const fn build_gear_table() -> [u64; 256] {
    // splitmix64 over the byte values
    let mut table = [0u64; 256];
    let mut state: u64 = 0x9E37_79B9_7F4A_7C15;
    let mut i = 0;
    while i < 256 {
        state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        table[i] = z ^ (z >> 31);
        i += 1;
    }
    table
}

static GEAR: [u64; 256] = build_gear_table();

/// Streaming boundary detector.
#[derive(Clone, Debug)]
pub struct Chunker {
    config: ChunkingConfig,
    mask: u64,
    hash: u64,
    /// Bytes seen since the last boundary.
    len: usize,
}

impl Chunker {
    pub fn new(config: ChunkingConfig) -> Self {
        Self {
            mask: config.mask(),
            config,
            hash: 0,
            len: 0,
        }
    }

    /// Scan `data`, returning the offset just past the first boundary in
    /// it, or `None` if all of `data` belongs to the current chunk.
    ///
    /// State carries across calls; after a boundary the detector starts a
    /// fresh chunk, so the caller resumes with `&data[n..]`.
    pub fn find_boundary(&mut self, data: &[u8]) -> Option<usize> {
        for (i, &byte) in data.iter().enumerate() {
            self.hash = (self.hash << 1).wrapping_add(GEAR[byte as usize]);
            self.len += 1;
            let at_mask = self.len >= self.config.min_size && self.hash & self.mask == 0;
            if at_mask || self.len >= self.config.max_size {
                self.reset();
                return Some(i + 1);
            }
        }
        None
    }

    /// Bytes accumulated in the current chunk.
    pub fn pending(&self) -> usize {
        self.len
    }

    /// Forget the current chunk (after the caller cut it at end of stream).
    pub fn reset(&mut self) {
        self.hash = 0;
        self.len = 0;
    }
}
