//! Layers: one commit's (or one write's) sorted file entries.
//!
//! A layer is persisted as a manifest chunk:
//!
//! ```text
//! "STLM" | version: u32 BE | crc32(body): u32 BE | body = bincode(Vec<Index>)
//! ```
//!
//! The layer id is the manifest chunk's content address, so identical
//! layers written twice share an id.

use std::sync::Arc;

use strata_store::{Chunk, ChunkKind};
use strata_types::ObjectId;

use crate::error::{FilesetError, FilesetResult};
use crate::index::Index;

const MANIFEST_MAGIC: &[u8; 4] = b"STLM";
const MANIFEST_VERSION: u32 = 1;
const HEADER_LEN: usize = 12;

/// An immutable, path-sorted sequence of index entries, tombstones included.
///
/// Cloning is cheap; entries are shared.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Layer {
    id: ObjectId,
    entries: Arc<Vec<Index>>,
}

impl Layer {
    /// Build a layer from sorted entries, returning it with its manifest chunk.
    pub fn build(entries: Vec<Index>) -> FilesetResult<(Self, Chunk)> {
        check_sorted(&entries).map_err(FilesetError::Serialization)?;
        let body =
            bincode::serialize(&entries).map_err(|e| FilesetError::Serialization(e.to_string()))?;
        let mut data = Vec::with_capacity(HEADER_LEN + body.len());
        data.extend_from_slice(MANIFEST_MAGIC);
        data.extend_from_slice(&MANIFEST_VERSION.to_be_bytes());
        data.extend_from_slice(&crc32fast::hash(&body).to_be_bytes());
        data.extend_from_slice(&body);

        let chunk = Chunk::manifest(data);
        let layer = Self {
            id: chunk.compute_id(),
            entries: Arc::new(entries),
        };
        Ok((layer, chunk))
    }

    /// Decode a manifest chunk previously produced by [`Layer::build`].
    pub fn decode(id: ObjectId, chunk: &Chunk) -> FilesetResult<Self> {
        let corrupt = |reason: String| FilesetError::CorruptManifest { id, reason };

        if chunk.kind != ChunkKind::Manifest {
            return Err(corrupt(format!("expected manifest chunk, got {}", chunk.kind)));
        }
        let data = &chunk.data;
        if data.len() < HEADER_LEN {
            return Err(corrupt("manifest too short".into()));
        }
        if &data[0..4] != MANIFEST_MAGIC {
            return Err(corrupt(format!(
                "bad magic {:?}",
                String::from_utf8_lossy(&data[0..4])
            )));
        }
        let version = u32::from_be_bytes([data[4], data[5], data[6], data[7]]);
        if version != MANIFEST_VERSION {
            return Err(corrupt(format!("unsupported manifest version {version}")));
        }
        let crc = u32::from_be_bytes([data[8], data[9], data[10], data[11]]);
        let body = &data[HEADER_LEN..];
        if crc32fast::hash(body) != crc {
            return Err(corrupt("manifest CRC mismatch".into()));
        }
        let entries: Vec<Index> =
            bincode::deserialize(body).map_err(|e| corrupt(e.to_string()))?;
        check_sorted(&entries).map_err(corrupt)?;

        Ok(Self {
            id,
            entries: Arc::new(entries),
        })
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn entries(&self) -> &[Index] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up the entry for `path`, tombstones included.
    pub fn get(&self, path: &str) -> Option<&Index> {
        self.entries
            .binary_search_by(|e| e.path.as_str().cmp(path))
            .ok()
            .map(|i| &self.entries[i])
    }

    /// Position of the first entry whose path is `>= start`.
    pub fn seek(&self, start: &str) -> usize {
        self.entries.partition_point(|e| e.path.as_str() < start)
    }
}

fn check_sorted(entries: &[Index]) -> Result<(), String> {
    match entries.windows(2).find(|w| w[0].path >= w[1].path) {
        Some(w) => Err(format!(
            "entries not strictly increasing: {:?} then {:?}",
            w[0].path, w[1].path
        )),
        None => Ok(()),
    }
}
