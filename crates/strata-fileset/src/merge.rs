//! Deterministic k-way merge of layers.
//!
//! One cursor per layer, kept in priority order (newest first). Each step
//! takes the smallest current path across cursors; on a tie the first
//! cursor in priority order wins and every other cursor at that path is
//! advanced past it. A winning tombstone suppresses the path entirely.
//!
//! The output depends only on the layer contents, so two readers opened on
//! the same specification always yield the same sequence.

use std::sync::Arc;

use strata_store::ChunkStore;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{FilesetError, FilesetResult};
use crate::file::File;
use crate::index::Index;
use crate::layer::Layer;
use crate::source::{MergeSource, PathRange};
use crate::writer::FilesetWriter;

struct Cursor {
    layer: Layer,
    pos: usize,
}

impl Cursor {
    fn peek(&self) -> Option<&Index> {
        self.layer.entries().get(self.pos)
    }
}

/// A single pass over a merge specification.
pub struct MergeReader {
    store: Arc<dyn ChunkStore>,
    /// Newest layer first.
    cursors: Vec<Cursor>,
    range: PathRange,
}

impl MergeReader {
    pub fn open(source: &MergeSource) -> FilesetResult<Self> {
        let storage = source.storage();
        let range = source.range().clone();
        let mut cursors = Vec::with_capacity(source.layers().len());
        for id in source.layers().iter().rev() {
            let layer = storage.open_layer(*id)?;
            let pos = range.start.as_deref().map_or(0, |s| layer.seek(s));
            cursors.push(Cursor { layer, pos });
        }
        debug!(layers = cursors.len(), "merge reader opened");
        Ok(Self {
            store: Arc::clone(storage.store()),
            cursors,
            range,
        })
    }

    /// The next visible file, or `None` when the view is exhausted.
    pub fn next_file(&mut self) -> FilesetResult<Option<File>> {
        loop {
            let mut winner: Option<(usize, &str)> = None;
            for (i, cursor) in self.cursors.iter().enumerate() {
                if let Some(entry) = cursor.peek() {
                    match winner {
                        Some((_, best)) if entry.path.as_str() >= best => {}
                        _ => winner = Some((i, entry.path.as_str())),
                    }
                }
            }
            let Some((w, path)) = winner else {
                return Ok(None);
            };
            if self.range.is_past(path) {
                return Ok(None);
            }
            let entry = match self.cursors[w].peek() {
                Some(entry) => entry.clone(),
                None => return Ok(None),
            };

            for cursor in self.cursors.iter_mut() {
                if cursor.peek().is_some_and(|e| e.path == entry.path) {
                    cursor.pos += 1;
                }
            }
            if entry.deleted {
                continue;
            }
            return Ok(Some(File::new(entry, Arc::clone(&self.store))));
        }
    }

    /// Stream every remaining file into `writer`. Returns the content bytes copied.
    pub fn write_to(
        &mut self,
        writer: &mut FilesetWriter<'_>,
        cancel: &CancellationToken,
    ) -> FilesetResult<u64> {
        let mut total = 0;
        while let Some(file) = self.next_file()? {
            if cancel.is_cancelled() {
                return Err(FilesetError::Cancelled);
            }
            total += writer.append_file(&file)?;
        }
        Ok(total)
    }
}
