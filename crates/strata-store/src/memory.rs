use std::collections::HashMap;
use std::sync::RwLock;

use strata_types::ObjectId;

use crate::chunk::{Chunk, EncodedChunk};
use crate::error::{StoreError, StoreResult};
use crate::traits::ChunkStore;

/// In-memory, HashMap-based chunk store.
///
/// Intended for tests and embedding. Chunks are held compressed behind a
/// `RwLock`. Setting the store read-only makes every `put` fail, which is
/// how tests prove that a dry-run writer never uploads.
pub struct InMemoryChunkStore {
    chunks: RwLock<HashMap<ObjectId, EncodedChunk>>,
    read_only: bool,
}

impl InMemoryChunkStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            chunks: RwLock::new(HashMap::new()),
            read_only: false,
        }
    }

    /// Create a store that rejects writes.
    pub fn read_only() -> Self {
        Self {
            chunks: RwLock::new(HashMap::new()),
            read_only: true,
        }
    }

    /// Number of chunks currently stored.
    pub fn len(&self) -> usize {
        self.chunks.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.chunks.read().expect("lock poisoned").is_empty()
    }
}

impl Default for InMemoryChunkStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkStore for InMemoryChunkStore {
    fn get(&self, id: &ObjectId) -> StoreResult<Option<Chunk>> {
        let encoded = {
            let map = self.chunks.read().expect("lock poisoned");
            match map.get(id) {
                Some(encoded) => encoded.clone(),
                None => return Ok(None),
            }
        };
        encoded.decode(id).map(Some)
    }

    fn put(&self, chunk: &Chunk) -> StoreResult<ObjectId> {
        if self.read_only {
            return Err(StoreError::ReadOnly);
        }
        let id = chunk.compute_id();
        if id.is_null() {
            return Err(StoreError::NullObjectId);
        }
        if self.exists(&id)? {
            return Ok(id);
        }
        let encoded = chunk.encode()?;
        tracing::trace!(chunk = %id.short_hex(), kind = %chunk.kind, raw = encoded.raw_size, "stored chunk");
        let mut map = self.chunks.write().expect("lock poisoned");
        map.entry(id).or_insert(encoded);
        Ok(id)
    }

    fn exists(&self, id: &ObjectId) -> StoreResult<bool> {
        Ok(self.chunks.read().expect("lock poisoned").contains_key(id))
    }
}

impl std::fmt::Debug for InMemoryChunkStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryChunkStore")
            .field("chunk_count", &self.len())
            .field("read_only", &self.read_only)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_and_get() {
        let store = InMemoryChunkStore::new();
        let chunk = Chunk::data(b"hello world".to_vec());
        let id = store.put(&chunk).unwrap();
        assert_eq!(id, chunk.compute_id());
        assert_eq!(store.get(&id).unwrap(), Some(chunk));
    }

    #[test]
    fn put_is_idempotent() {
        let store = InMemoryChunkStore::new();
        let chunk = Chunk::data(b"dedup".to_vec());
        let id1 = store.put(&chunk).unwrap();
        let id2 = store.put(&chunk).unwrap();
        assert_eq!(id1, id2);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn missing_chunk() {
        let store = InMemoryChunkStore::new();
        let id = ObjectId::from_bytes(b"missing");
        assert!(store.get(&id).unwrap().is_none());
        assert!(!store.exists(&id).unwrap());
        assert!(matches!(store.require(&id), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn read_only_rejects_writes() {
        let store = InMemoryChunkStore::read_only();
        let err = store.put(&Chunk::data(b"x".to_vec())).unwrap_err();
        assert!(matches!(err, StoreError::ReadOnly));
        assert!(store.is_empty());
    }

    #[test]
    fn concurrent_reads_are_safe() {
        use std::sync::Arc;
        use std::thread;

        let store = Arc::new(InMemoryChunkStore::new());
        let id = store.put(&Chunk::data(b"shared".to_vec())).unwrap();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    let chunk = store.get(&id).unwrap().unwrap();
                    assert_eq!(chunk.compute_id(), id);
                })
            })
            .collect();
        for h in handles {
            h.join().expect("thread should not panic");
        }
    }
}
