//! Index resolution by shadow pass.
//!
//! Two merge readers are opened on the same specification. The first is
//! streamed through a no-upload writer, which recomputes each file's index
//! over the merged byte stream. Every index the writer finalizes is paired
//! with the next file from the second reader, after checking that both
//! name the same path. Any disagreement is a [`FilesetError::MergeIntegrity`]
//! and is never retried here.

use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::error::{FilesetError, FilesetResult};
use crate::file::File;
use crate::index::Index;
use crate::merge::MergeReader;
use crate::source::{FileSource, MergeSource, PathRange};

/// Wraps a merge source so that every emitted file carries a resolved index.
#[derive(Clone)]
pub struct IndexResolver {
    source: MergeSource,
}

impl IndexResolver {
    pub fn new(source: FileSource) -> FilesetResult<Self> {
        match source {
            FileSource::Merge(source) => Ok(Self { source }),
            other => {
                error!(kind = other.kind(), "index resolution requested for unsupported source");
                Err(FilesetError::Unresolvable(other.kind()))
            }
        }
    }

    pub fn source(&self) -> &MergeSource {
        &self.source
    }

    pub(crate) fn with_range(&self, range: PathRange) -> Self {
        Self {
            source: self.source.clone().with_range(range),
        }
    }

    /// Emit every file of the merged view, in path order, with its resolved
    /// index attached. Nothing is cached: each call opens fresh readers.
    pub fn iterate(
        &self,
        cancel: &CancellationToken,
        cb: &mut dyn FnMut(File) -> FilesetResult<()>,
        stop_before: Option<&str>,
    ) -> FilesetResult<()> {
        let spec = self.source.narrowed(stop_before);
        let mut shadow = MergeReader::open(&spec)?;
        let mut paired = MergeReader::open(&spec)?;

        let mut emitted = 0u64;
        {
            let hook = |resolved: &Index| -> FilesetResult<()> {
                let mut file = pair(&mut paired, resolved)?;
                file.attach_resolved(resolved.clone())?;
                emitted += 1;
                cb(file)
            };
            let mut writer = spec
                .storage()
                .no_upload_writer(Box::new(hook))
                .with_cancellation(cancel.clone());
            shadow.write_to(&mut writer, cancel)?;
            writer.close()?;
        }

        ensure_drained(&mut paired)?;
        debug!(files = emitted, "resolved merged view");
        Ok(())
    }
}

/// After the shadow pass the paired reader must have nothing left.
fn ensure_drained(paired: &mut MergeReader) -> FilesetResult<()> {
    match paired.next_file()? {
        None => Ok(()),
        Some(extra) => {
            error!(path = extra.path(), "paired reader outlived the shadow pass");
            Err(FilesetError::MergeIntegrity {
                resolved: None,
                paired: Some(extra.path().to_string()),
            })
        }
    }
}

/// Pull the next file from `paired` and check it is the one `resolved` describes.
fn pair(paired: &mut MergeReader, resolved: &Index) -> FilesetResult<File> {
    match paired.next_file()? {
        Some(file) if file.path() == resolved.path => Ok(file),
        other => {
            let actual = other.map(|f| f.path().to_string());
            error!(
                resolved = %resolved.path,
                paired = ?actual,
                "shadow pass and paired reader diverged"
            );
            Err(FilesetError::MergeIntegrity {
                resolved: Some(resolved.path.clone()),
                paired: actual,
            })
        }
    }
}
