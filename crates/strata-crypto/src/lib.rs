//! Hashing primitives for Strata.
//!
//! Provides domain-separated BLAKE3 hashing, both one-shot and streaming.
//! Chunk ids, layer ids and file ETags all go through [`ContentHasher`] so
//! that a dry-run pass computes exactly what a persisting pass would.

pub mod hasher;

pub use hasher::{ContentHasher, StreamingHasher};
