//! Streaming layer writer.
//!
//! Files are appended in strictly increasing path order and their bytes
//! form one continuous stream. The stream is cut by the content-defined
//! [`Chunker`], so a chunk may hold the tail of one file and the head of
//! the next. A file's index is finalized once the chunk holding its last
//! byte has been cut.
//!
//! In no-upload mode the writer runs the exact same chunking and hashing
//! but never touches the chunk store; each finalized index is handed to a
//! hook instead.

use std::collections::VecDeque;
use std::io::{ErrorKind, Read};
use std::sync::Arc;

use strata_crypto::{ContentHasher, StreamingHasher};
use strata_store::{Chunk, ChunkKind, ChunkStore};
use strata_types::names::validate_path;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::chunker::{Chunker, ChunkingConfig};
use crate::error::{FilesetError, FilesetResult};
use crate::file::File;
use crate::index::{DataRef, Index, IndexKind};
use crate::layer::Layer;
use crate::sniff::{detect_content_type, SNIFF_LEN};

const READ_BUF: usize = 64 * 1024;

/// Callback receiving each index as a no-upload writer finalizes it.
pub type IndexHook<'a> = Box<dyn FnMut(&Index) -> FilesetResult<()> + 'a>;

enum Sink<'a> {
    Upload(Arc<dyn ChunkStore>),
    NoUpload(IndexHook<'a>),
}

/// A file whose index is not finalized yet.
struct Pending {
    index: Index,
    /// Stream offset of the first byte.
    start: u64,
    /// Stream offset past the last byte, once the file is complete.
    end: Option<u64>,
}

/// In-progress content of the file being appended.
struct Progress {
    hasher: StreamingHasher,
    head: Vec<u8>,
}

/// Writes one layer.
pub struct FilesetWriter<'a> {
    sink: Sink<'a>,
    chunker: Chunker,
    buffer: Vec<u8>,
    /// Stream offset of `buffer[0]`; everything before it is in cut chunks.
    buffer_start: u64,
    pending: VecDeque<Pending>,
    entries: Vec<Index>,
    last_path: Option<String>,
    cancel: Option<CancellationToken>,
    chunks_cut: u64,
    finalized: u64,
}

impl<'a> FilesetWriter<'a> {
    /// A writer that stores chunks and the layer manifest in `store`.
    pub fn upload(store: Arc<dyn ChunkStore>, chunking: ChunkingConfig) -> Self {
        Self::with_sink(Sink::Upload(store), chunking)
    }

    /// A writer that stores nothing and reports each resolved index to `hook`.
    pub fn no_upload(chunking: ChunkingConfig, hook: IndexHook<'a>) -> Self {
        Self::with_sink(Sink::NoUpload(hook), chunking)
    }

    fn with_sink(sink: Sink<'a>, chunking: ChunkingConfig) -> Self {
        Self {
            sink,
            chunker: Chunker::new(chunking),
            buffer: Vec::new(),
            buffer_start: 0,
            pending: VecDeque::new(),
            entries: Vec::new(),
            last_path: None,
            cancel: None,
            chunks_cut: 0,
            finalized: 0,
        }
    }

    /// Abort appends with [`FilesetError::Cancelled`] once `token` fires.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn is_no_upload(&self) -> bool {
        matches!(self.sink, Sink::NoUpload(_))
    }

    /// Total content bytes appended so far.
    pub fn bytes_written(&self) -> u64 {
        self.buffer_start + self.buffer.len() as u64
    }

    /// Append a file, reading its content from `reader` until EOF.
    ///
    /// Returns the number of content bytes written.
    pub fn append(&mut self, path: &str, reader: &mut dyn Read) -> FilesetResult<u64> {
        let mut progress = self.begin(path)?;
        let mut buf = vec![0u8; READ_BUF];
        loop {
            self.check_cancelled()?;
            let n = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            self.write_piece(&mut progress, &buf[..n])?;
        }
        self.end(progress)
    }

    /// Append the content of a file emitted by a source, under its own path.
    pub fn append_file(&mut self, file: &File) -> FilesetResult<u64> {
        let mut progress = self.begin(file.path())?;
        let mut reader = file.reader();
        loop {
            self.check_cancelled()?;
            match reader.next_slice()? {
                Some(slice) => self.write_piece(&mut progress, slice)?,
                None => break,
            }
        }
        self.end(progress)
    }

    /// Record a tombstone for `path`.
    pub fn delete(&mut self, path: &str) -> FilesetResult<()> {
        self.check_cancelled()?;
        self.check_path(path)?;
        let at = self.bytes_written();
        let kind = self.index_kind();
        self.pending.push_back(Pending {
            index: Index::tombstone(path, kind),
            start: at,
            end: Some(at),
        });
        self.drain_ready()
    }

    /// Flush the final chunk, store the manifest and return the layer.
    ///
    /// A no-upload writer keeps no entries and fails with
    /// [`FilesetError::NoLayer`]; use [`FilesetWriter::close`] instead.
    pub fn finish(mut self) -> FilesetResult<Layer> {
        self.flush()?;
        let Sink::Upload(store) = &self.sink else {
            return Err(FilesetError::NoLayer);
        };
        let entries = std::mem::take(&mut self.entries);
        let (layer, manifest) = Layer::build(entries)?;
        store.put(&manifest)?;
        debug!(
            layer = %layer.id().short_hex(),
            files = self.finalized,
            bytes = self.buffer_start,
            chunks = self.chunks_cut,
            "layer written"
        );
        Ok(layer)
    }

    /// Flush the final chunk so every remaining index reaches the hook.
    /// Returns the number of files finalized over the writer's lifetime.
    pub fn close(mut self) -> FilesetResult<u64> {
        self.flush()?;
        debug!(
            files = self.finalized,
            bytes = self.buffer_start,
            chunks = self.chunks_cut,
            no_upload = self.is_no_upload(),
            "writer closed"
        );
        Ok(self.finalized)
    }

    fn flush(&mut self) -> FilesetResult<()> {
        self.check_cancelled()?;
        self.cut()?;
        self.chunker.reset();
        self.drain_ready()?;
        debug_assert!(self.pending.is_empty());
        Ok(())
    }

    fn index_kind(&self) -> IndexKind {
        match self.sink {
            Sink::Upload(_) => IndexKind::Provisional,
            Sink::NoUpload(_) => IndexKind::Resolved,
        }
    }

    fn check_cancelled(&self) -> FilesetResult<()> {
        match &self.cancel {
            Some(token) if token.is_cancelled() => Err(FilesetError::Cancelled),
            _ => Ok(()),
        }
    }

    fn check_path(&mut self, path: &str) -> FilesetResult<()> {
        validate_path(path)?;
        if let Some(previous) = &self.last_path {
            if path <= previous.as_str() {
                return Err(FilesetError::OutOfOrder {
                    previous: previous.clone(),
                    path: path.to_string(),
                });
            }
        }
        self.last_path = Some(path.to_string());
        Ok(())
    }

    fn begin(&mut self, path: &str) -> FilesetResult<Progress> {
        self.check_cancelled()?;
        self.check_path(path)?;
        let kind = self.index_kind();
        let start = self.bytes_written();
        self.pending.push_back(Pending {
            index: Index {
                path: path.to_string(),
                kind,
                deleted: false,
                size: 0,
                content_hash: strata_types::ObjectId::null(),
                content_type: String::new(),
                data_refs: Vec::new(),
            },
            start,
            end: None,
        });
        Ok(Progress {
            hasher: ContentHasher::FILE.streaming(),
            head: Vec::with_capacity(SNIFF_LEN),
        })
    }

    fn write_piece(&mut self, progress: &mut Progress, data: &[u8]) -> FilesetResult<()> {
        progress.hasher.update(data);
        if progress.head.len() < SNIFF_LEN {
            let take = (SNIFF_LEN - progress.head.len()).min(data.len());
            progress.head.extend_from_slice(&data[..take]);
        }

        let mut rest = data;
        while !rest.is_empty() {
            match self.chunker.find_boundary(rest) {
                Some(n) => {
                    self.buffer.extend_from_slice(&rest[..n]);
                    self.cut()?;
                    rest = &rest[n..];
                }
                None => {
                    self.buffer.extend_from_slice(rest);
                    break;
                }
            }
        }
        Ok(())
    }

    fn end(&mut self, progress: Progress) -> FilesetResult<u64> {
        let end = self.bytes_written();
        let file = self
            .pending
            .back_mut()
            .ok_or_else(|| FilesetError::Serialization("no file in progress".into()))?;
        file.end = Some(end);
        file.index.size = progress.hasher.content_len();
        file.index.content_hash = progress.hasher.finalize();
        file.index.content_type = detect_content_type(&progress.head).to_string();
        let size = file.index.size;
        self.drain_ready()?;
        Ok(size)
    }

    /// Cut the buffered bytes into a chunk and assign the overlapping
    /// ranges to pending files.
    fn cut(&mut self) -> FilesetResult<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let chunk_start = self.buffer_start;
        let chunk_end = chunk_start + self.buffer.len() as u64;
        let data = std::mem::take(&mut self.buffer);
        let id = match &self.sink {
            Sink::Upload(store) => store.put(&Chunk::data(data))?,
            Sink::NoUpload(_) => Chunk::id_for(ChunkKind::Data, &data),
        };

        for file in self.pending.iter_mut() {
            let from = file.start.max(chunk_start);
            let to = file.end.unwrap_or(chunk_end).min(chunk_end);
            if from < to {
                file.index.data_refs.push(DataRef {
                    chunk: id,
                    offset: from - chunk_start,
                    len: to - from,
                });
            }
        }

        self.buffer_start = chunk_end;
        self.chunks_cut += 1;
        self.drain_ready()
    }

    /// Finalize files, in order, whose bytes are all in cut chunks. Only an
    /// upload writer keeps the indexes; a no-upload writer hands them off.
    fn drain_ready(&mut self) -> FilesetResult<()> {
        while let Some(front) = self.pending.front() {
            match front.end {
                Some(end) if end <= self.buffer_start => {}
                _ => break,
            }
            let Some(file) = self.pending.pop_front() else {
                break;
            };
            match &mut self.sink {
                Sink::NoUpload(hook) => hook(&file.index)?,
                Sink::Upload(_) => self.entries.push(file.index),
            }
            self.finalized += 1;
        }
        Ok(())
    }
}
