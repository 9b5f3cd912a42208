//! The worker driver: S3 verb semantics over bucket-bound commits.
//!
//! | Verb | Input bucket | Output bucket |
//! |---|---|---|
//! | get / stat | resolved view of the finalized commit | not found while the commit is open |
//! | put | not implemented | new top layer in the open commit |
//! | remove | not implemented | tombstone, idempotent |
//!
//! Make and remove bucket are never offered; the bucket set comes from
//! configuration alone.

use std::fs;
use std::io::{self, Read};
use std::path::Path;
use std::sync::Arc;

use strata_commits::{CommitError, CommitService};
use strata_fileset::{CancellationToken, FileReader, Index};
use strata_types::names::validate_path;
use tracing::{error, info, warn};

use crate::bucket::{resolve_buckets, Bucket, BucketRole};
use crate::config::GatewayConfig;
use crate::error::{GatewayError, GatewayResult};

/// Metadata returned by stat and get.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectInfo {
    pub key: String,
    pub size: u64,
    pub etag: String,
    pub content_type: String,
}

impl ObjectInfo {
    fn from_index(index: &Index) -> Self {
        Self {
            key: index.path.clone(),
            size: index.size,
            etag: index.etag(),
            content_type: index.content_type.clone(),
        }
    }
}

/// Answers object-store requests for a fixed set of buckets.
///
/// Cheap to clone; every request can hold its own copy.
#[derive(Clone)]
pub struct WorkerDriver {
    service: Arc<dyn CommitService>,
    buckets: Arc<Vec<Bucket>>,
}

impl WorkerDriver {
    pub fn new(service: Arc<dyn CommitService>, buckets: Vec<Bucket>) -> Self {
        Self {
            service,
            buckets: Arc::new(buckets),
        }
    }

    /// Resolve the configured buckets and build a driver over them.
    pub fn from_config(
        service: Arc<dyn CommitService>,
        config: &GatewayConfig,
    ) -> GatewayResult<Self> {
        config.validate()?;
        let buckets = resolve_buckets(config, service.as_ref())?;
        Ok(Self::new(service, buckets))
    }

    /// The configured buckets, and nothing else.
    pub fn list_buckets(&self) -> &[Bucket] {
        &self.buckets
    }

    pub fn bucket_exists(&self, name: &str) -> bool {
        self.buckets.iter().any(|b| b.name == name)
    }

    pub fn make_bucket(&self, name: &str) -> GatewayResult<()> {
        warn!(bucket = %name, "make bucket rejected");
        Err(GatewayError::NotImplemented(format!(
            "buckets are fixed by configuration; cannot create {name:?}"
        )))
    }

    pub fn remove_bucket(&self, name: &str) -> GatewayResult<()> {
        warn!(bucket = %name, "remove bucket rejected");
        Err(GatewayError::NotImplemented(format!(
            "buckets are fixed by configuration; cannot remove {name:?}"
        )))
    }

    pub fn bucket(&self, name: &str) -> GatewayResult<&Bucket> {
        self.buckets
            .iter()
            .find(|b| b.name == name)
            .ok_or_else(|| GatewayError::NoSuchBucket(name.to_string()))
    }

    pub fn stat_object(
        &self,
        bucket: &str,
        key: &str,
        cancel: &CancellationToken,
    ) -> GatewayResult<ObjectInfo> {
        let (info, _) = self.open_object(bucket, key, cancel)?;
        Ok(info)
    }

    /// Resolve `key` and return its metadata with a streaming reader.
    pub fn get_object(
        &self,
        bucket: &str,
        key: &str,
        cancel: &CancellationToken,
    ) -> GatewayResult<(ObjectInfo, FileReader)> {
        self.open_object(bucket, key, cancel)
    }

    /// Write `key` into the output bucket's open commit. Returns the
    /// number of bytes written.
    ///
    /// The stored content type is always sniffed from the bytes;
    /// `content_type` is only recorded in the log.
    pub fn put_object(
        &self,
        bucket: &str,
        key: &str,
        reader: &mut dyn Read,
        content_type: Option<&str>,
        cancel: &CancellationToken,
    ) -> GatewayResult<u64> {
        let b = self.writable(bucket, "put object")?;
        validate_path(key).map_err(|e| GatewayError::InvalidArgument(e.to_string()))?;
        let written = self
            .service
            .put_file(&b.repo, b.commit, key, reader, cancel)
            .map_err(|e| finished_to_not_implemented(e, b))?;
        info!(
            bucket = %b.name,
            %key,
            bytes = written,
            declared_type = content_type.unwrap_or(""),
            "object written"
        );
        Ok(written)
    }

    /// Stream `key` into a local file at `dest`. A partially written file
    /// is removed on failure.
    pub fn fget_object(
        &self,
        bucket: &str,
        key: &str,
        dest: &Path,
        cancel: &CancellationToken,
    ) -> GatewayResult<ObjectInfo> {
        let (info, mut reader) = self.open_object(bucket, key, cancel)?;
        let mut out = fs::File::create(dest)?;
        if let Err(e) = io::copy(&mut reader, &mut out).and_then(|_| out.sync_all()) {
            drop(out);
            let _ = fs::remove_file(dest);
            return Err(e.into());
        }
        Ok(info)
    }

    /// [`put_object`](Self::put_object) with the body read from a local file.
    pub fn fput_object(
        &self,
        bucket: &str,
        key: &str,
        src: &Path,
        content_type: Option<&str>,
        cancel: &CancellationToken,
    ) -> GatewayResult<u64> {
        // checked before `src` is opened
        self.writable(bucket, "put object")?;
        let mut file = fs::File::open(src)?;
        self.put_object(bucket, key, &mut file, content_type, cancel)
    }

    /// Delete `key` from the output bucket's open commit. Removing an
    /// absent key succeeds.
    pub fn remove_object(&self, bucket: &str, key: &str) -> GatewayResult<()> {
        let b = self.writable(bucket, "remove object")?;
        validate_path(key).map_err(|e| GatewayError::InvalidArgument(e.to_string()))?;
        self.service
            .delete_file(&b.repo, b.commit, key)
            .map_err(|e| finished_to_not_implemented(e, b))?;
        info!(bucket = %b.name, %key, "object removed");
        Ok(())
    }

    fn writable(&self, bucket: &str, verb: &str) -> GatewayResult<&Bucket> {
        let b = self.bucket(bucket)?;
        if b.role == BucketRole::Input {
            warn!(bucket = %b.name, verb, "write to input bucket rejected");
            return Err(GatewayError::NotImplemented(format!(
                "{verb} on input bucket {:?}",
                b.name
            )));
        }
        let info = self.service.inspect_commit(&b.repo, b.commit)?;
        if !info.is_open() {
            warn!(bucket = %b.name, verb, "write to finished output commit rejected");
            return Err(GatewayError::NotImplemented(format!(
                "{verb} on bucket {:?}: commit {} is {}",
                b.name, b.commit, info.state
            )));
        }
        Ok(b)
    }

    fn open_object(
        &self,
        bucket: &str,
        key: &str,
        cancel: &CancellationToken,
    ) -> GatewayResult<(ObjectInfo, FileReader)> {
        let b = self.bucket(bucket)?;
        let not_found = || GatewayError::NoSuchKey {
            bucket: bucket.to_string(),
            key: key.to_string(),
        };
        if validate_path(key).is_err() {
            return Err(not_found());
        }
        let commit = self.service.inspect_commit(&b.repo, b.commit)?;
        if commit.layers.is_empty() {
            // open commits have no finalized layers to read
            return Err(not_found());
        }
        let source = self
            .service
            .storage()
            .merge_source(commit.layers)
            .resolved()?;
        let file = source.lookup(cancel, key).map_err(|e| {
            if e.is_integrity_violation() {
                error!(bucket = %b.name, %key, error = %e, "index resolution failed");
            }
            GatewayError::Fileset(e)
        })?;
        let file = file.ok_or_else(not_found)?;
        Ok((ObjectInfo::from_index(file.index()), file.reader()))
    }
}

/// A commit that finished between the policy check and the write.
fn finished_to_not_implemented(e: CommitError, bucket: &Bucket) -> GatewayError {
    match e {
        CommitError::CommitFinished(id) => GatewayError::NotImplemented(format!(
            "bucket {:?}: commit {id} is finished",
            bucket.name
        )),
        other => other.into(),
    }
}

impl std::fmt::Debug for WorkerDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerDriver")
            .field("buckets", &self.buckets)
            .finish_non_exhaustive()
    }
}
