//! Gateway configuration, loaded from TOML.
//!
//! ```toml
//! bind_addr = "127.0.0.1:9000"
//!
//! [chunking]
//! min_size = 524288
//! avg_size = 1048576
//! max_size = 8388608
//!
//! [[inputs]]
//! name = "in1"
//! repo = "images"
//! commit = "master"
//!
//! [output]
//! name = "out"
//! repo = "results"
//! commit = "master"
//! ```
//!
//! `commit` is either a commit id or a branch name, resolved to the
//! branch head when the gateway starts.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::Path;

use serde::{Deserialize, Serialize};
use strata_fileset::ChunkingConfig;
use strata_types::names::{validate_bucket_name, validate_repo_name};

use crate::error::{GatewayError, GatewayResult};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub bind_addr: SocketAddr,
    pub chunking: ChunkingConfig,
    /// Read-only buckets over closed commits.
    pub inputs: Vec<BucketConfig>,
    /// The single writable bucket over an open commit.
    pub output: Option<BucketConfig>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketConfig {
    pub name: String,
    pub repo: String,
    /// Commit id, or a branch name resolved to its head.
    pub commit: String,
}

impl BucketConfig {
    pub fn new(name: impl Into<String>, repo: impl Into<String>, commit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            repo: repo.into(),
            commit: commit.into(),
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 9000)),
            chunking: ChunkingConfig::default(),
            inputs: Vec::new(),
            output: None,
        }
    }
}

impl GatewayConfig {
    pub fn from_toml_str(s: &str) -> GatewayResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| GatewayError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> GatewayResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| GatewayError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&contents)
    }

    pub fn to_toml_string(&self) -> GatewayResult<String> {
        toml::to_string_pretty(self).map_err(|e| GatewayError::Config(e.to_string()))
    }

    /// Every configured bucket, inputs first.
    pub fn buckets(&self) -> impl Iterator<Item = &BucketConfig> {
        self.inputs.iter().chain(self.output.iter())
    }

    /// Check bucket names are well formed and unique, repositories are
    /// named, and chunk sizes are usable.
    pub fn validate(&self) -> GatewayResult<()> {
        self.chunking.validate().map_err(GatewayError::Config)?;
        let mut seen = HashSet::new();
        for bucket in self.buckets() {
            validate_bucket_name(&bucket.name).map_err(|e| GatewayError::Config(e.to_string()))?;
            validate_repo_name(&bucket.repo).map_err(|e| GatewayError::Config(e.to_string()))?;
            if bucket.commit.is_empty() {
                return Err(GatewayError::Config(format!(
                    "bucket {:?} has no commit",
                    bucket.name
                )));
            }
            if !seen.insert(bucket.name.as_str()) {
                return Err(GatewayError::Config(format!(
                    "bucket {:?} configured twice",
                    bucket.name
                )));
            }
        }
        Ok(())
    }
}
