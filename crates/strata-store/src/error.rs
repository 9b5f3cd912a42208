use strata_types::ObjectId;

/// Errors from chunk store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested chunk was not found.
    #[error("chunk not found: {0}")]
    NotFound(ObjectId),

    /// Content hash mismatch on read (data corruption).
    #[error("hash mismatch for {id}: computed {computed}")]
    HashMismatch { id: ObjectId, computed: ObjectId },

    /// CRC of the stored payload does not match.
    #[error("CRC32 mismatch for chunk {id}")]
    CrcMismatch { id: ObjectId },

    /// Compressing a chunk failed.
    #[error("compression failed: {0}")]
    Compression(String),

    /// Decompressing a chunk failed or produced the wrong size.
    #[error("corrupt chunk {id}: {reason}")]
    CorruptChunk { id: ObjectId, reason: String },

    /// Attempted to write a null object ID.
    #[error("cannot store chunk with null ID")]
    NullObjectId,

    /// Storage backend is read-only or otherwise unavailable.
    #[error("store is read-only")]
    ReadOnly,

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
