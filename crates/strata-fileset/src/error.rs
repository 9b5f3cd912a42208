use strata_types::{ObjectId, TypeError};

/// Errors from fileset operations.
#[derive(Debug, thiserror::Error)]
pub enum FilesetError {
    /// The shadow pass and its paired reader disagreed on which file comes
    /// next. Fatal: it means the merge order was not deterministic.
    #[error("merge integrity violation: resolved index for {resolved:?} paired with file {paired:?}")]
    MergeIntegrity {
        resolved: Option<String>,
        paired: Option<String>,
    },

    /// Index resolution was requested for a source kind that cannot be resolved.
    #[error("cannot resolve indexes for a {0} source")]
    Unresolvable(&'static str),

    /// A writer received paths that were not strictly increasing.
    #[error("path {path:?} written after {previous:?}; paths must be strictly increasing")]
    OutOfOrder { previous: String, path: String },

    /// A layer manifest could not be decoded.
    #[error("corrupt layer manifest {id}: {reason}")]
    CorruptManifest { id: ObjectId, reason: String },

    /// The layer id does not resolve to a stored manifest.
    #[error("layer not found: {0}")]
    LayerNotFound(ObjectId),

    /// A no-upload writer was asked for a layer it never builds.
    #[error("a no-upload writer does not produce a layer")]
    NoLayer,

    /// The operation observed a cancellation signal.
    #[error("operation cancelled")]
    Cancelled,

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("invalid name: {0}")]
    Type(#[from] TypeError),

    #[error("store error: {0}")]
    Store(#[from] strata_store::StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FilesetError {
    /// Returns `true` for errors that indicate a correctness violation
    /// rather than a missing or unavailable resource.
    pub fn is_integrity_violation(&self) -> bool {
        matches!(
            self,
            Self::MergeIntegrity { .. } | Self::Unresolvable(_) | Self::CorruptManifest { .. }
        )
    }
}

/// Result alias for fileset operations.
pub type FilesetResult<T> = Result<T, FilesetError>;
