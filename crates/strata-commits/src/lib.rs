//! Commit metadata for Strata.
//!
//! Repositories hold branches; a branch points at its newest commit. A
//! commit starts open, collects layers, and is sealed by
//! [`CommitService::finish_commit`], which compacts everything it sees into
//! a single finalized layer. Only finalized layers are visible to readers.
//!
//! # Modules
//!
//! - [`error`] — [`CommitError`] and the result alias
//! - [`types`] — [`CommitInfo`], [`CommitState`], [`BranchInfo`]
//! - [`traits`] — the [`CommitService`] interface
//! - [`memory`] — [`InMemoryCommitService`] for tests and local use

pub mod error;
pub mod memory;
pub mod traits;
pub mod types;

pub use error::{CommitError, CommitResult};
pub use memory::InMemoryCommitService;
pub use traits::CommitService;
pub use types::{BranchInfo, CommitInfo, CommitState};
