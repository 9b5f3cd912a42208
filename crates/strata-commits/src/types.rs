//! Commit and branch records.

use serde::{Deserialize, Serialize};
use strata_types::{CommitId, ObjectId};

/// Lifecycle of a commit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitState {
    /// Accepting layers.
    Open,
    /// Being compacted; no longer accepts layers.
    Finishing,
    /// Sealed. `layers` holds the finalized view.
    Finished,
}

impl std::fmt::Display for CommitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Open => "open",
            Self::Finishing => "finishing",
            Self::Finished => "finished",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitInfo {
    pub id: CommitId,
    pub repo: String,
    pub branch: String,
    pub parent: Option<CommitId>,
    pub state: CommitState,
    /// Finalized layers, oldest first. Empty until the commit is finished.
    pub layers: Vec<ObjectId>,
    /// Layers appended while open and not yet compacted.
    pub pending_layers: usize,
}

impl CommitInfo {
    pub fn is_open(&self) -> bool {
        self.state == CommitState::Open
    }

    pub fn is_finished(&self) -> bool {
        self.state == CommitState::Finished
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchInfo {
    pub name: String,
    pub head: Option<CommitId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&CommitState::Finishing).unwrap(), "\"finishing\"");
        assert_eq!(CommitState::Open.to_string(), "open");
    }
}
