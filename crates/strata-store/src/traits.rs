use strata_types::ObjectId;

use crate::chunk::Chunk;
use crate::error::StoreResult;

/// Content-addressed chunk store.
///
/// This is the interface through which Strata consumes its durable
/// storage. Implementations must satisfy:
/// - Chunks are immutable once written; the same bytes always produce the
///   same id, so writing twice is a no-op.
/// - Concurrent reads and writes are safe; the store does its own
///   concurrency control.
/// - All I/O errors are propagated.
pub trait ChunkStore: Send + Sync {
    /// Read a chunk by id. Returns `Ok(None)` if it does not exist.
    fn get(&self, id: &ObjectId) -> StoreResult<Option<Chunk>>;

    /// Write a chunk and return its content-addressed id.
    fn put(&self, chunk: &Chunk) -> StoreResult<ObjectId>;

    /// Check whether a chunk exists.
    fn exists(&self, id: &ObjectId) -> StoreResult<bool>;

    /// Read a chunk that must exist.
    fn require(&self, id: &ObjectId) -> StoreResult<Chunk> {
        self.get(id)?.ok_or(crate::error::StoreError::NotFound(*id))
    }
}
