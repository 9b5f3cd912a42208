//! Per-file index entries.

use serde::{Deserialize, Serialize};
use strata_types::ObjectId;

/// A byte range inside one data chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataRef {
    pub chunk: ObjectId,
    pub offset: u64,
    pub len: u64,
}

/// Where an index entry came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndexKind {
    /// Stored with a single layer; its data refs are relative to that
    /// layer's chunking.
    Provisional,
    /// Recomputed by streaming the merged bytes through the writer.
    Resolved,
}

/// Summary metadata for one file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    pub path: String,
    pub kind: IndexKind,
    /// Tombstone marker. A deleted entry has no content and no data refs.
    pub deleted: bool,
    pub size: u64,
    /// Domain-separated BLAKE3 hash of the content; null for tombstones.
    pub content_hash: ObjectId,
    pub content_type: String,
    pub data_refs: Vec<DataRef>,
}

impl Index {
    /// A tombstone for `path`.
    pub fn tombstone(path: impl Into<String>, kind: IndexKind) -> Self {
        Self {
            path: path.into(),
            kind,
            deleted: true,
            size: 0,
            content_hash: ObjectId::null(),
            content_type: String::new(),
            data_refs: Vec::new(),
        }
    }

    /// The ETag clients see: the hex content hash, empty for tombstones.
    pub fn etag(&self) -> String {
        if self.deleted {
            String::new()
        } else {
            self.content_hash.to_hex()
        }
    }

    /// Sum of the data ref lengths. Equals `size` for a well-formed entry.
    pub fn referenced_bytes(&self) -> u64 {
        self.data_refs.iter().map(|r| r.len).sum()
    }

    pub fn is_resolved(&self) -> bool {
        self.kind == IndexKind::Resolved
    }
}
