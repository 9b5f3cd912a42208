//! Buckets: names bound to commits, with a read or read-write role.

use std::str::FromStr;

use serde::Serialize;
use strata_commits::CommitService;
use strata_types::CommitId;
use tracing::info;

use crate::config::{BucketConfig, GatewayConfig};
use crate::error::{GatewayError, GatewayResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BucketRole {
    /// Immutable view of a closed commit.
    Input,
    /// Writable while its commit is open.
    Output,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bucket {
    pub name: String,
    pub repo: String,
    pub commit: CommitId,
    pub role: BucketRole,
}

impl Bucket {
    pub fn is_output(&self) -> bool {
        self.role == BucketRole::Output
    }
}

/// Resolve every configured bucket against the commit service.
///
/// Input buckets come first, in configuration order, then the output.
pub fn resolve_buckets(
    config: &GatewayConfig,
    service: &dyn CommitService,
) -> GatewayResult<Vec<Bucket>> {
    let inputs = config
        .inputs
        .iter()
        .map(|b| (b, BucketRole::Input));
    let output = config.output.iter().map(|b| (b, BucketRole::Output));

    let mut buckets = Vec::new();
    for (cfg, role) in inputs.chain(output) {
        let commit = resolve_commit(cfg, service)?;
        info!(bucket = %cfg.name, repo = %cfg.repo, %commit, ?role, "bucket bound");
        buckets.push(Bucket {
            name: cfg.name.clone(),
            repo: cfg.repo.clone(),
            commit,
            role,
        });
    }
    Ok(buckets)
}

fn resolve_commit(cfg: &BucketConfig, service: &dyn CommitService) -> GatewayResult<CommitId> {
    if let Ok(id) = CommitId::from_str(&cfg.commit) {
        service.inspect_commit(&cfg.repo, id)?;
        return Ok(id);
    }
    let branches = service.list_branches(&cfg.repo)?;
    let branch = branches
        .iter()
        .find(|b| b.name == cfg.commit)
        .ok_or_else(|| {
            GatewayError::Config(format!(
                "bucket {:?}: {:?} is neither a commit nor a branch of {:?}",
                cfg.name, cfg.commit, cfg.repo
            ))
        })?;
    branch.head.ok_or_else(|| {
        GatewayError::Config(format!(
            "bucket {:?}: branch {:?} of {:?} has no commits",
            cfg.name, cfg.commit, cfg.repo
        ))
    })
}
