use std::fmt;

use serde::{Deserialize, Serialize};

/// Address of a stored chunk or layer manifest.
///
/// Chunk stores key everything by the BLAKE3 hash of the uncompressed
/// bytes, domain-separated by chunk kind (see `strata-crypto`). Because the
/// address is a pure function of content, a dry-run writer arrives at the
/// same ids a persisting writer would store under, and a layer's id is the
/// id of its manifest chunk.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId([u8; 32]);

impl ObjectId {
    /// Wrap a finished 32-byte digest.
    pub fn from_hash(hash: [u8; 32]) -> Self {
        Self(hash)
    }

    /// Plain BLAKE3 of `data`, with no domain tag. Never collides with a
    /// real chunk or manifest address, so it makes a safe placeholder for
    /// an id that is known not to be stored.
    pub fn from_bytes(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// The content hash of a tombstone, which has no content.
    pub const fn null() -> Self {
        Self([0u8; 32])
    }

    pub fn is_null(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Full lowercase hex. This is the form served as an object ETag.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// First four bytes in hex, for log lines.
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.short_hex())
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}
