//! Files emitted by sources, and streaming access to their content.

use std::io::{self, Read};
use std::sync::Arc;

use strata_store::{ChunkStore, StoreError};
use strata_types::ObjectId;

use crate::error::{FilesetError, FilesetResult};
use crate::index::{DataRef, Index};

/// A logical file in a view.
///
/// Content is always read through the index of the layer that supplied
/// the file. A resolver may attach a resolved index, which then becomes
/// the file's authoritative metadata.
pub struct File {
    source: Index,
    resolved: Option<Index>,
    store: Arc<dyn ChunkStore>,
}

impl File {
    pub(crate) fn new(source: Index, store: Arc<dyn ChunkStore>) -> Self {
        Self {
            source,
            resolved: None,
            store,
        }
    }

    pub fn path(&self) -> &str {
        &self.source.path
    }

    /// The authoritative index: the resolved one if attached.
    pub fn index(&self) -> &Index {
        self.resolved.as_ref().unwrap_or(&self.source)
    }

    /// The index stored with the contributing layer.
    pub fn source_index(&self) -> &Index {
        &self.source
    }

    pub fn resolved_index(&self) -> Option<&Index> {
        self.resolved.as_ref()
    }

    /// Attach a resolved index computed for this file.
    ///
    /// Fails with [`FilesetError::MergeIntegrity`] if the index belongs to
    /// a different path.
    pub fn attach_resolved(&mut self, index: Index) -> FilesetResult<()> {
        if index.path != self.source.path {
            return Err(FilesetError::MergeIntegrity {
                resolved: Some(index.path),
                paired: Some(self.source.path.clone()),
            });
        }
        self.resolved = Some(index);
        Ok(())
    }

    /// Open a streaming reader over the content.
    pub fn reader(&self) -> FileReader {
        FileReader::new(Arc::clone(&self.store), self.source.data_refs.clone())
    }

    /// Read the whole content into memory. Intended for small files and tests.
    pub fn read_all(&self) -> FilesetResult<Vec<u8>> {
        let mut out = Vec::with_capacity(self.source.size as usize);
        let mut reader = self.reader();
        while let Some(slice) = reader.next_slice()? {
            out.extend_from_slice(slice);
        }
        Ok(out)
    }
}

impl std::fmt::Debug for File {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("File")
            .field("path", &self.source.path)
            .field("size", &self.index().size)
            .field("resolved", &self.resolved.is_some())
            .finish()
    }
}

/// Streams a file's bytes one data ref at a time, holding at most one
/// chunk in memory.
pub struct FileReader {
    store: Arc<dyn ChunkStore>,
    refs: std::vec::IntoIter<DataRef>,
    current: Option<DataRef>,
    consumed: usize,
    chunk: Option<(ObjectId, Vec<u8>)>,
}

impl FileReader {
    fn new(store: Arc<dyn ChunkStore>, refs: Vec<DataRef>) -> Self {
        Self {
            store,
            refs: refs.into_iter(),
            current: None,
            consumed: 0,
            chunk: None,
        }
    }

    /// The next run of content bytes, or `None` at end of file.
    ///
    /// Store errors are returned unchanged.
    pub fn next_slice(&mut self) -> FilesetResult<Option<&[u8]>> {
        let Some((start, end)) = self.fill()? else {
            return Ok(None);
        };
        self.consumed += end - start;
        Ok(self.chunk.as_ref().map(|(_, data)| &data[start..end]))
    }

    /// Position on the next unread byte range, loading its chunk if needed.
    /// Returns the range's bounds within the loaded chunk.
    fn fill(&mut self) -> FilesetResult<Option<(usize, usize)>> {
        let r = loop {
            match self.current {
                Some(r) if (self.consumed as u64) < r.len => break r,
                _ => match self.refs.next() {
                    Some(next) => {
                        self.current = Some(next);
                        self.consumed = 0;
                    }
                    None => return Ok(None),
                },
            }
        };

        let len = match &self.chunk {
            Some((id, data)) if *id == r.chunk => data.len(),
            _ => {
                let chunk = self.store.require(&r.chunk)?;
                let len = chunk.data.len();
                self.chunk = Some((r.chunk, chunk.data));
                len
            }
        };
        let end = (r.offset + r.len) as usize;
        if end > len {
            return Err(FilesetError::Store(StoreError::CorruptChunk {
                id: r.chunk,
                reason: format!("data ref {}..{end} beyond chunk of {len} bytes", r.offset),
            }));
        }
        Ok(Some((r.offset as usize + self.consumed, end)))
    }
}

impl Read for FileReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let Some((start, end)) = self.fill().map_err(io::Error::other)? else {
            return Ok(0);
        };
        let n = buf.len().min(end - start);
        if let Some((_, data)) = &self.chunk {
            buf[..n].copy_from_slice(&data[start..start + n]);
        }
        self.consumed += n;
        Ok(n)
    }
}
