//! The [`CommitService`] trait: repository, branch and commit metadata.

use std::io::Read;

use strata_fileset::{CancellationToken, FileSource, Storage};
use strata_types::{CommitId, ObjectId};
use tracing::debug;

use crate::error::{CommitError, CommitResult};
use crate::types::{BranchInfo, CommitInfo};

/// Metadata service for versioned filesets.
///
/// Implementations must be thread-safe. Layer content lives in the
/// service's [`Storage`]; the service only tracks which layers belong to
/// which commit.
pub trait CommitService: Send + Sync {
    /// The storage that commit layers are written to.
    fn storage(&self) -> &Storage;

    fn create_repo(&self, repo: &str) -> CommitResult<()>;

    /// All repository names, sorted.
    fn list_repos(&self) -> CommitResult<Vec<String>>;

    /// Create `branch` in `repo`, pointing at `from` (or at nothing).
    fn create_branch(&self, repo: &str, branch: &str, from: Option<CommitId>)
        -> CommitResult<()>;

    fn list_branches(&self, repo: &str) -> CommitResult<Vec<BranchInfo>>;

    /// Start a new open commit on `branch`, based on the branch head's
    /// finalized layers. The branch head moves to the new commit.
    fn start_commit(&self, repo: &str, branch: &str) -> CommitResult<CommitId>;

    /// Add a layer on top of an open commit.
    fn append_layer(&self, repo: &str, commit: CommitId, layer: ObjectId) -> CommitResult<()>;

    /// Seal an open commit, compacting its base and appended layers into one
    /// finalized layer.
    fn finish_commit(
        &self,
        repo: &str,
        commit: CommitId,
        cancel: &CancellationToken,
    ) -> CommitResult<CommitInfo>;

    fn inspect_commit(&self, repo: &str, commit: CommitId) -> CommitResult<CommitInfo>;

    /// Write `path` into an open commit as a new single-file layer.
    ///
    /// Returns the number of bytes written. Nothing becomes part of the
    /// commit unless the whole body was written.
    fn put_file(
        &self,
        repo: &str,
        commit: CommitId,
        path: &str,
        reader: &mut dyn Read,
        cancel: &CancellationToken,
    ) -> CommitResult<u64> {
        require_open(&self.inspect_commit(repo, commit)?)?;
        let mut writer = self.storage().writer().with_cancellation(cancel.clone());
        let written = writer.append(path, reader)?;
        let layer = writer.finish()?;
        self.append_layer(repo, commit, layer.id())?;
        debug!(%repo, %commit, %path, bytes = written, "file written");
        Ok(written)
    }

    /// Record a deletion of `path` in an open commit. Deleting a path that
    /// does not exist is not an error.
    fn delete_file(&self, repo: &str, commit: CommitId, path: &str) -> CommitResult<()> {
        require_open(&self.inspect_commit(repo, commit)?)?;
        let mut writer = self.storage().writer();
        writer.delete(path)?;
        let layer = writer.finish()?;
        self.append_layer(repo, commit, layer.id())?;
        debug!(%repo, %commit, %path, "file deleted");
        Ok(())
    }

    /// A merge source over the commit's finalized layers.
    fn commit_source(&self, repo: &str, commit: CommitId) -> CommitResult<FileSource> {
        let info = self.inspect_commit(repo, commit)?;
        Ok(self.storage().merge_source(info.layers))
    }
}

pub(crate) fn require_open(info: &CommitInfo) -> CommitResult<()> {
    if info.is_open() {
        Ok(())
    } else {
        Err(CommitError::CommitFinished(info.id))
    }
}
