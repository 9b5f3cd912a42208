use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid commit id: {0}")]
    InvalidCommitId(String),

    #[error("invalid {what} {name:?}: {reason}")]
    InvalidName {
        what: &'static str,
        name: String,
        reason: String,
    },
}

impl TypeError {
    pub(crate) fn name(what: &'static str, name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidName {
            what,
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}
