//! In-memory commit service for tests and single-process use.
//!
//! [`InMemoryCommitService`] keeps all metadata in a `BTreeMap` behind a
//! `RwLock`. Layer content goes to the wrapped [`Storage`]. Metadata is lost
//! when the service is dropped.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use strata_fileset::{CancellationToken, Storage};
use strata_types::names::{validate_branch_name, validate_repo_name};
use strata_types::{CommitId, ObjectId};
use tracing::{debug, info, warn};

use crate::error::{CommitError, CommitResult};
use crate::traits::{require_open, CommitService};
use crate::types::{BranchInfo, CommitInfo, CommitState};

#[derive(Debug, Default)]
struct Repo {
    branches: BTreeMap<String, Option<CommitId>>,
    commits: HashMap<CommitId, CommitRecord>,
}

#[derive(Debug, Clone)]
struct CommitRecord {
    branch: String,
    parent: Option<CommitId>,
    state: CommitState,
    /// Finalized layers of the parent at start time.
    base: Vec<ObjectId>,
    pending: Vec<ObjectId>,
    /// Set once finished.
    finalized: Vec<ObjectId>,
}

impl CommitRecord {
    fn info(&self, repo: &str, id: CommitId) -> CommitInfo {
        CommitInfo {
            id,
            repo: repo.to_string(),
            branch: self.branch.clone(),
            parent: self.parent,
            state: self.state,
            layers: self.finalized.clone(),
            pending_layers: self.pending.len(),
        }
    }
}

pub struct InMemoryCommitService {
    storage: Storage,
    repos: RwLock<BTreeMap<String, Repo>>,
}

impl InMemoryCommitService {
    pub fn new(storage: Storage) -> Self {
        Self {
            storage,
            repos: RwLock::new(BTreeMap::new()),
        }
    }

    fn with_commit<T>(
        &self,
        repo: &str,
        commit: CommitId,
        f: impl FnOnce(&mut CommitRecord) -> CommitResult<T>,
    ) -> CommitResult<T> {
        let mut repos = self.repos.write().expect("lock poisoned");
        let r = repos
            .get_mut(repo)
            .ok_or_else(|| CommitError::RepoNotFound(repo.to_string()))?;
        let record = r.commits.get_mut(&commit).ok_or_else(|| CommitError::CommitNotFound {
            repo: repo.to_string(),
            commit,
        })?;
        f(record)
    }
}

impl std::fmt::Debug for InMemoryCommitService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let repos = self.repos.read().expect("lock poisoned");
        f.debug_struct("InMemoryCommitService")
            .field("repos", &repos.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl CommitService for InMemoryCommitService {
    fn storage(&self) -> &Storage {
        &self.storage
    }

    fn create_repo(&self, repo: &str) -> CommitResult<()> {
        validate_repo_name(repo)?;
        let mut repos = self.repos.write().expect("lock poisoned");
        if repos.contains_key(repo) {
            return Err(CommitError::RepoExists(repo.to_string()));
        }
        repos.insert(repo.to_string(), Repo::default());
        info!(%repo, "repository created");
        Ok(())
    }

    fn list_repos(&self) -> CommitResult<Vec<String>> {
        let repos = self.repos.read().expect("lock poisoned");
        Ok(repos.keys().cloned().collect())
    }

    fn create_branch(
        &self,
        repo: &str,
        branch: &str,
        from: Option<CommitId>,
    ) -> CommitResult<()> {
        validate_branch_name(branch)?;
        let mut repos = self.repos.write().expect("lock poisoned");
        let r = repos
            .get_mut(repo)
            .ok_or_else(|| CommitError::RepoNotFound(repo.to_string()))?;
        if r.branches.contains_key(branch) {
            return Err(CommitError::BranchExists {
                repo: repo.to_string(),
                branch: branch.to_string(),
            });
        }
        if let Some(commit) = from {
            if !r.commits.contains_key(&commit) {
                return Err(CommitError::CommitNotFound {
                    repo: repo.to_string(),
                    commit,
                });
            }
        }
        r.branches.insert(branch.to_string(), from);
        debug!(%repo, %branch, "branch created");
        Ok(())
    }

    fn list_branches(&self, repo: &str) -> CommitResult<Vec<BranchInfo>> {
        let repos = self.repos.read().expect("lock poisoned");
        let r = repos
            .get(repo)
            .ok_or_else(|| CommitError::RepoNotFound(repo.to_string()))?;
        Ok(r
            .branches
            .iter()
            .map(|(name, head)| BranchInfo {
                name: name.clone(),
                head: *head,
            })
            .collect())
    }

    fn start_commit(&self, repo: &str, branch: &str) -> CommitResult<CommitId> {
        let mut repos = self.repos.write().expect("lock poisoned");
        let r = repos
            .get_mut(repo)
            .ok_or_else(|| CommitError::RepoNotFound(repo.to_string()))?;
        let head = *r.branches.get(branch).ok_or_else(|| CommitError::BranchNotFound {
            repo: repo.to_string(),
            branch: branch.to_string(),
        })?;

        let base = match head.and_then(|id| r.commits.get(&id).map(|c| (id, c))) {
            Some((id, parent)) if parent.state != CommitState::Finished => {
                return Err(CommitError::ParentOpen(id));
            }
            Some((_, parent)) => parent.finalized.clone(),
            None => Vec::new(),
        };

        let id = CommitId::new();
        r.commits.insert(
            id,
            CommitRecord {
                branch: branch.to_string(),
                parent: head,
                state: CommitState::Open,
                base,
                pending: Vec::new(),
                finalized: Vec::new(),
            },
        );
        r.branches.insert(branch.to_string(), Some(id));
        info!(%repo, %branch, commit = %id, "commit started");
        Ok(id)
    }

    fn append_layer(&self, repo: &str, commit: CommitId, layer: ObjectId) -> CommitResult<()> {
        self.with_commit(repo, commit, |record| {
            if record.state != CommitState::Open {
                warn!(%repo, %commit, "layer rejected: commit is not open");
                return Err(CommitError::CommitFinished(commit));
            }
            record.pending.push(layer);
            Ok(())
        })
    }

    fn finish_commit(
        &self,
        repo: &str,
        commit: CommitId,
        cancel: &CancellationToken,
    ) -> CommitResult<CommitInfo> {
        // Seal first so no layer slips in while compacting.
        let stack = self.with_commit(repo, commit, |record| {
            require_open(&record.info(repo, commit))?;
            record.state = CommitState::Finishing;
            let mut stack = record.base.clone();
            stack.extend_from_slice(&record.pending);
            Ok(stack)
        })?;

        let compacted = if stack.is_empty() {
            Ok(Vec::new())
        } else {
            self.storage.compact(&stack, cancel).map(|layer| vec![layer.id()])
        };

        self.with_commit(repo, commit, |record| match compacted {
            Ok(layers) => {
                record.state = CommitState::Finished;
                record.finalized = layers;
                record.pending.clear();
                info!(
                    %repo,
                    %commit,
                    inputs = stack.len(),
                    "commit finished"
                );
                Ok(record.info(repo, commit))
            }
            Err(e) => {
                record.state = CommitState::Open;
                Err(e.into())
            }
        })
    }

    fn inspect_commit(&self, repo: &str, commit: CommitId) -> CommitResult<CommitInfo> {
        let repos = self.repos.read().expect("lock poisoned");
        let r = repos
            .get(repo)
            .ok_or_else(|| CommitError::RepoNotFound(repo.to_string()))?;
        r.commits
            .get(&commit)
            .map(|record| record.info(repo, commit))
            .ok_or_else(|| CommitError::CommitNotFound {
                repo: repo.to_string(),
                commit,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use strata_fileset::{ChunkingConfig, FilesetError};
    use strata_store::InMemoryChunkStore;

    fn service() -> InMemoryCommitService {
        let storage = Storage::new(Arc::new(InMemoryChunkStore::new()), ChunkingConfig::small());
        InMemoryCommitService::new(storage)
    }

    fn put(svc: &InMemoryCommitService, repo: &str, commit: CommitId, path: &str, data: &str) {
        svc.put_file(repo, commit, path, &mut data.as_bytes(), &CancellationToken::new())
            .unwrap();
    }

    fn read(svc: &InMemoryCommitService, repo: &str, commit: CommitId) -> Vec<(String, String)> {
        let mut out = Vec::new();
        svc.commit_source(repo, commit)
            .unwrap()
            .iterate(
                &CancellationToken::new(),
                |f| {
                    out.push((f.path().to_string(), String::from_utf8(f.read_all()?).unwrap()));
                    Ok(())
                },
                None,
            )
            .unwrap();
        out
    }

    #[test]
    fn repos_are_listed_sorted() {
        let svc = service();
        svc.create_repo("zeta").unwrap();
        svc.create_repo("alpha").unwrap();
        assert_eq!(svc.list_repos().unwrap(), vec!["alpha", "zeta"]);
        assert!(matches!(svc.create_repo("alpha"), Err(CommitError::RepoExists(_))));
        assert!(matches!(svc.create_repo("Bad Name"), Err(CommitError::Type(_))));
    }

    #[test]
    fn branch_requires_repo_and_known_commit() {
        let svc = service();
        assert!(matches!(
            svc.create_branch("nope", "master", None),
            Err(CommitError::RepoNotFound(_))
        ));
        svc.create_repo("r").unwrap();
        svc.create_branch("r", "master", None).unwrap();
        assert!(matches!(
            svc.create_branch("r", "master", None),
            Err(CommitError::BranchExists { .. })
        ));
        assert!(matches!(
            svc.create_branch("r", "other", Some(CommitId::new())),
            Err(CommitError::CommitNotFound { .. })
        ));
        assert_eq!(svc.list_branches("r").unwrap()[0].head, None);
    }

    #[test]
    fn open_commit_has_no_visible_layers() {
        let svc = service();
        svc.create_repo("r").unwrap();
        svc.create_branch("r", "master", None).unwrap();
        let c = svc.start_commit("r", "master").unwrap();
        put(&svc, "r", c, "file", "content");
        let info = svc.inspect_commit("r", c).unwrap();
        assert!(info.is_open());
        assert!(info.layers.is_empty());
        assert_eq!(info.pending_layers, 1);
        assert!(read(&svc, "r", c).is_empty());
    }

    #[test]
    fn finish_compacts_into_one_layer() {
        let svc = service();
        svc.create_repo("r").unwrap();
        svc.create_branch("r", "master", None).unwrap();
        let c = svc.start_commit("r", "master").unwrap();
        put(&svc, "r", c, "b", "2");
        put(&svc, "r", c, "a", "1");
        put(&svc, "r", c, "a", "again");
        svc.delete_file("r", c, "b").unwrap();
        svc.delete_file("r", c, "missing").unwrap();

        let info = svc.finish_commit("r", c, &CancellationToken::new()).unwrap();
        assert!(info.is_finished());
        assert_eq!(info.layers.len(), 1);
        assert_eq!(info.pending_layers, 0);
        assert_eq!(read(&svc, "r", c), vec![("a".into(), "again".into())]);
    }

    #[test]
    fn finished_commit_rejects_writes() {
        let svc = service();
        svc.create_repo("r").unwrap();
        svc.create_branch("r", "master", None).unwrap();
        let c = svc.start_commit("r", "master").unwrap();
        svc.finish_commit("r", c, &CancellationToken::new()).unwrap();

        let err = svc
            .put_file("r", c, "f", &mut &b"x"[..], &CancellationToken::new())
            .unwrap_err();
        assert!(matches!(err, CommitError::CommitFinished(id) if id == c));
        assert!(matches!(svc.delete_file("r", c, "f"), Err(CommitError::CommitFinished(_))));
        assert!(matches!(
            svc.finish_commit("r", c, &CancellationToken::new()),
            Err(CommitError::CommitFinished(_))
        ));
        assert!(svc.inspect_commit("r", c).unwrap().layers.is_empty());
    }

    #[test]
    fn child_commit_builds_on_parent() {
        let svc = service();
        svc.create_repo("r").unwrap();
        svc.create_branch("r", "master", None).unwrap();
        let c1 = svc.start_commit("r", "master").unwrap();
        put(&svc, "r", c1, "keep", "k");
        put(&svc, "r", c1, "old", "o");

        assert!(matches!(
            svc.start_commit("r", "master"),
            Err(CommitError::ParentOpen(id)) if id == c1
        ));
        svc.finish_commit("r", c1, &CancellationToken::new()).unwrap();

        let c2 = svc.start_commit("r", "master").unwrap();
        assert_eq!(svc.inspect_commit("r", c2).unwrap().parent, Some(c1));
        svc.delete_file("r", c2, "old").unwrap();
        put(&svc, "r", c2, "new", "n");
        svc.finish_commit("r", c2, &CancellationToken::new()).unwrap();

        assert_eq!(
            read(&svc, "r", c2),
            vec![("keep".into(), "k".into()), ("new".into(), "n".into())]
        );
        assert_eq!(read(&svc, "r", c1).len(), 2);
    }

    #[test]
    fn cancelled_put_is_not_visible() {
        let svc = service();
        svc.create_repo("r").unwrap();
        svc.create_branch("r", "master", None).unwrap();
        let c = svc.start_commit("r", "master").unwrap();
        let token = CancellationToken::new();
        token.cancel();
        let err = svc.put_file("r", c, "f", &mut &b"x"[..], &token).unwrap_err();
        assert!(matches!(err, CommitError::Fileset(FilesetError::Cancelled)));
        assert_eq!(svc.inspect_commit("r", c).unwrap().pending_layers, 0);
    }

    #[test]
    fn cancelled_finish_reopens_commit() {
        let svc = service();
        svc.create_repo("r").unwrap();
        svc.create_branch("r", "master", None).unwrap();
        let c = svc.start_commit("r", "master").unwrap();
        put(&svc, "r", c, "f", "x");
        let token = CancellationToken::new();
        token.cancel();
        assert!(svc.finish_commit("r", c, &token).is_err());
        assert!(svc.inspect_commit("r", c).unwrap().is_open());
        svc.finish_commit("r", c, &CancellationToken::new()).unwrap();
    }

    #[test]
    fn unknown_commit() {
        let svc = service();
        svc.create_repo("r").unwrap();
        assert!(matches!(
            svc.inspect_commit("r", CommitId::new()),
            Err(CommitError::CommitNotFound { .. })
        ));
        assert!(matches!(
            svc.start_commit("r", "nope"),
            Err(CommitError::BranchNotFound { .. })
        ));
    }
}
