//! Seed data for a self-contained in-memory gateway.
//!
//! ```toml
//! [[seed]]
//! repo = "inputs"
//! branch = "master"
//! finish = true
//! files = { "file" = "foo", "dir/readme.txt" = "hello" }
//! ```

use std::collections::BTreeMap;

use anyhow::Context;
use serde::Deserialize;
use strata_commits::{CommitError, CommitService};
use strata_fileset::CancellationToken;
use tracing::info;

#[derive(Clone, Debug, Default, Deserialize)]
struct SeedFile {
    #[serde(default)]
    seed: Vec<SeedConfig>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct SeedConfig {
    pub repo: String,
    #[serde(default = "default_branch")]
    pub branch: String,
    /// Path to inline content.
    #[serde(default)]
    pub files: BTreeMap<String, String>,
    /// Finish the commit so it can back an input bucket.
    #[serde(default = "default_finish")]
    pub finish: bool,
}

fn default_branch() -> String {
    "master".into()
}

fn default_finish() -> bool {
    true
}

/// Read the `[[seed]]` entries of a configuration file's contents.
pub fn parse_seeds(contents: &str) -> anyhow::Result<Vec<SeedConfig>> {
    let file: SeedFile = toml::from_str(contents).context("invalid [[seed]] section")?;
    Ok(file.seed)
}

/// Create the seeded repositories, branches and commits.
pub fn apply_seeds(service: &dyn CommitService, seeds: &[SeedConfig]) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    for seed in seeds {
        match service.create_repo(&seed.repo) {
            Ok(()) | Err(CommitError::RepoExists(_)) => {}
            Err(e) => return Err(e).context(format!("creating repo {}", seed.repo)),
        }
        match service.create_branch(&seed.repo, &seed.branch, None) {
            Ok(()) | Err(CommitError::BranchExists { .. }) => {}
            Err(e) => return Err(e).context(format!("creating branch {}", seed.branch)),
        }
        let commit = service
            .start_commit(&seed.repo, &seed.branch)
            .with_context(|| format!("starting commit on {}@{}", seed.repo, seed.branch))?;
        for (path, content) in &seed.files {
            service
                .put_file(&seed.repo, commit, path, &mut content.as_bytes(), &cancel)
                .with_context(|| format!("seeding {}/{path}", seed.repo))?;
        }
        if seed.finish {
            service.finish_commit(&seed.repo, commit, &cancel)?;
        }
        info!(
            repo = %seed.repo,
            branch = %seed.branch,
            %commit,
            files = seed.files.len(),
            finished = seed.finish,
            "seeded"
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use strata_commits::InMemoryCommitService;
    use strata_fileset::{ChunkingConfig, Storage};
    use strata_store::InMemoryChunkStore;

    const SEEDS: &str = r#"
[[inputs]]
name = "in1"
repo = "inputs"
commit = "master"

[[seed]]
repo = "inputs"
files = { "file" = "foo" }

[[seed]]
repo = "outputs"
finish = false
"#;

    #[test]
    fn parses_with_defaults() {
        let seeds = parse_seeds(SEEDS).unwrap();
        assert_eq!(seeds.len(), 2);
        assert_eq!(seeds[0].branch, "master");
        assert!(seeds[0].finish);
        assert_eq!(seeds[0].files["file"], "foo");
        assert!(!seeds[1].finish);
        assert!(seeds[1].files.is_empty());
        assert!(parse_seeds("").unwrap().is_empty());
    }

    #[test]
    fn applies_seeds() {
        let svc = InMemoryCommitService::new(Storage::new(
            Arc::new(InMemoryChunkStore::new()),
            ChunkingConfig::small(),
        ));
        apply_seeds(&svc, &parse_seeds(SEEDS).unwrap()).unwrap();
        assert_eq!(svc.list_repos().unwrap(), vec!["inputs", "outputs"]);

        let head = svc.list_branches("outputs").unwrap()[0].head.unwrap();
        assert!(svc.inspect_commit("outputs", head).unwrap().is_open());
        let head = svc.list_branches("inputs").unwrap()[0].head.unwrap();
        assert!(svc.inspect_commit("inputs", head).unwrap().is_finished());
    }
}
