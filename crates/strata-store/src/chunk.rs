use serde::{Deserialize, Serialize};
use strata_crypto::ContentHasher;
use strata_types::ObjectId;

use crate::error::{StoreError, StoreResult};

/// zstd level used for stored payloads.
const COMPRESSION_LEVEL: i32 = 3;

/// The kind of chunk stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChunkKind {
    /// A slice of a layer's concatenated file content.
    Data,
    /// A serialized layer manifest (the layer's index entries).
    Manifest,
}

impl ChunkKind {
    fn hasher(self) -> &'static ContentHasher {
        match self {
            Self::Data => &ContentHasher::CHUNK,
            Self::Manifest => &ContentHasher::MANIFEST,
        }
    }
}

impl std::fmt::Display for ChunkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Data => write!(f, "data"),
            Self::Manifest => write!(f, "manifest"),
        }
    }
}

/// An uncompressed chunk: kind tag plus raw bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chunk {
    pub kind: ChunkKind,
    pub data: Vec<u8>,
}

impl Chunk {
    /// Create a data chunk.
    pub fn data(data: Vec<u8>) -> Self {
        Self {
            kind: ChunkKind::Data,
            data,
        }
    }

    /// Create a manifest chunk.
    pub fn manifest(data: Vec<u8>) -> Self {
        Self {
            kind: ChunkKind::Manifest,
            data,
        }
    }

    /// Compute the content-addressed id for this chunk.
    pub fn compute_id(&self) -> ObjectId {
        Self::id_for(self.kind, &self.data)
    }

    /// Id of a chunk with the given kind and bytes, without building one.
    pub fn id_for(kind: ChunkKind, data: &[u8]) -> ObjectId {
        kind.hasher().hash(data)
    }

    /// Compress into the at-rest representation.
    pub fn encode(&self) -> StoreResult<EncodedChunk> {
        let payload = zstd::encode_all(self.data.as_slice(), COMPRESSION_LEVEL)
            .map_err(|e| StoreError::Compression(e.to_string()))?;
        Ok(EncodedChunk {
            kind: self.kind,
            raw_size: self.data.len() as u64,
            crc32: crc32fast::hash(&payload),
            payload,
        })
    }
}

/// The at-rest representation of a chunk: compressed payload with a CRC.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedChunk {
    pub kind: ChunkKind,
    pub raw_size: u64,
    pub crc32: u32,
    pub payload: Vec<u8>,
}

impl EncodedChunk {
    /// Decompress and verify against the expected id.
    pub fn decode(&self, id: &ObjectId) -> StoreResult<Chunk> {
        if crc32fast::hash(&self.payload) != self.crc32 {
            return Err(StoreError::CrcMismatch { id: *id });
        }
        let data = zstd::decode_all(self.payload.as_slice()).map_err(|e| {
            StoreError::CorruptChunk {
                id: *id,
                reason: e.to_string(),
            }
        })?;
        if data.len() as u64 != self.raw_size {
            return Err(StoreError::CorruptChunk {
                id: *id,
                reason: format!("size mismatch: expected {}, got {}", self.raw_size, data.len()),
            });
        }
        let chunk = Chunk {
            kind: self.kind,
            data,
        };
        let computed = chunk.compute_id();
        if computed != *id {
            return Err(StoreError::HashMismatch { id: *id, computed });
        }
        Ok(chunk)
    }
}
