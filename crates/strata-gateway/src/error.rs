//! Gateway errors and their S3 codes.

use strata_commits::CommitError;
use strata_fileset::FilesetError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("bucket not found: {0}")]
    NoSuchBucket(String),

    #[error("key not found: {bucket}/{key}")]
    NoSuchKey { bucket: String, key: String },

    /// Disallowed by bucket policy, or not offered at all.
    #[error("not implemented: {0}")]
    NotImplemented(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Fileset(#[from] FilesetError),

    #[error(transparent)]
    Commit(#[from] CommitError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl GatewayError {
    /// The S3 error code clients see.
    pub fn s3_code(&self) -> &'static str {
        match self {
            Self::NoSuchBucket(_) => "NoSuchBucket",
            Self::NoSuchKey { .. } => "NoSuchKey",
            Self::NotImplemented(_) => "NotImplemented",
            Self::InvalidArgument(_) => "InvalidArgument",
            Self::Config(_) | Self::Fileset(_) | Self::Commit(_) | Self::Io(_) => "InternalError",
        }
    }

    /// HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NoSuchBucket(_) | Self::NoSuchKey { .. } => 404,
            Self::NotImplemented(_) => 501,
            Self::InvalidArgument(_) => 400,
            _ => 500,
        }
    }

    /// A merge-integrity failure from index resolution. Never downgraded.
    pub fn is_integrity_violation(&self) -> bool {
        match self {
            Self::Fileset(e) | Self::Commit(CommitError::Fileset(e)) => e.is_integrity_violation(),
            _ => false,
        }
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;
