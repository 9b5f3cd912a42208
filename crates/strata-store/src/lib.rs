//! Content-addressed chunk storage for Strata.
//!
//! The chunk store is the durable bottom of the system: filesets are cut
//! into chunks, each stored immutably under the BLAKE3 hash of its
//! uncompressed bytes (domain-separated by kind). Layer manifests are
//! stored the same way, which makes a layer id a content address too.
//!
//! # Storage Backends
//!
//! All backends implement the [`ChunkStore`] trait:
//!
//! - [`InMemoryChunkStore`] -- `HashMap`-based store for tests and embedding
//!
//! # Design Rules
//!
//! 1. Chunks are immutable once written (content-addressing guarantees this).
//! 2. Stored bytes are zstd-compressed and CRC-checked; ids are computed
//!    over the uncompressed bytes.
//! 3. Concurrent reads are always safe.
//! 4. The store never interprets chunk contents.
//! 5. All errors are propagated, never silently ignored.

pub mod chunk;
pub mod error;
pub mod memory;
pub mod traits;

pub use chunk::{Chunk, ChunkKind, EncodedChunk};
pub use error::{StoreError, StoreResult};
pub use memory::InMemoryChunkStore;
pub use traits::ChunkStore;
