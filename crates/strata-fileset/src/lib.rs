//! Fileset engine for Strata.
//!
//! A fileset is a stack of immutable, path-sorted layers. This crate writes
//! layers ([`FilesetWriter`]), merges stacks of them into one deterministic
//! view ([`MergeReader`]), and recomputes authoritative per-file metadata
//! over the merged bytes ([`IndexResolver`]).
//!
//! # Merge rules
//!
//! 1. Output paths are strictly increasing.
//! 2. For a path present in several layers, the newest layer's entry wins.
//! 3. A winning tombstone hides the path; no older entry is surfaced.
//!
//! Merge order is a pure function of the layer contents. The resolver
//! relies on that: it runs two readers side by side and fails with
//! [`FilesetError::MergeIntegrity`] if they ever disagree.

pub mod chunker;
pub mod error;
pub mod file;
pub mod index;
pub mod layer;
pub mod merge;
pub mod resolver;
pub mod sniff;
pub mod source;
pub mod storage;
pub mod writer;

pub use chunker::{Chunker, ChunkingConfig};
pub use error::{FilesetError, FilesetResult};
pub use file::{File, FileReader};
pub use index::{DataRef, Index, IndexKind};
pub use layer::Layer;
pub use merge::MergeReader;
pub use resolver::IndexResolver;
pub use source::{FileSource, LayerSource, MergeSource, PathRange};
pub use storage::Storage;
pub use writer::{FilesetWriter, IndexHook};

pub use tokio_util::sync::CancellationToken;
