//! Error types for commit operations.

use strata_fileset::FilesetError;
use strata_types::{CommitId, TypeError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CommitError {
    #[error("repository not found: {0}")]
    RepoNotFound(String),

    #[error("repository already exists: {0}")]
    RepoExists(String),

    #[error("branch not found: {repo}@{branch}")]
    BranchNotFound { repo: String, branch: String },

    #[error("branch already exists: {repo}@{branch}")]
    BranchExists { repo: String, branch: String },

    #[error("commit not found: {repo}@{commit}")]
    CommitNotFound { repo: String, commit: CommitId },

    /// The commit no longer accepts writes.
    #[error("commit {0} is finished")]
    CommitFinished(CommitId),

    /// A new commit was started on a branch whose head is still open.
    #[error("commit {0} on this branch is still open")]
    ParentOpen(CommitId),

    #[error(transparent)]
    Fileset(#[from] FilesetError),

    #[error("invalid name: {0}")]
    Type(#[from] TypeError),
}

/// Convenience alias for commit operations.
pub type CommitResult<T> = Result<T, CommitError>;
