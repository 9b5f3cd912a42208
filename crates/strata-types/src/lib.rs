//! Foundation types for Strata.
//!
//! Every other Strata crate depends on `strata-types`.
//!
//! # Key Types
//!
//! - [`ObjectId`] — Content-addressed identifier (BLAKE3 hash) for chunks and layers
//! - [`CommitId`] — UUID v7 commit identifier, time-ordered
//! - [`names`] — validation for repository, branch, bucket names and file paths

pub mod commit;
pub mod error;
pub mod names;
pub mod object;

pub use commit::CommitId;
pub use error::TypeError;
pub use object::ObjectId;
