//! File sources: producers of path-ordered [`File`] sequences.

use std::sync::Arc;

use strata_store::ChunkStore;
use strata_types::ObjectId;
use tokio_util::sync::CancellationToken;

use crate::error::{FilesetError, FilesetResult};
use crate::file::File;
use crate::layer::Layer;
use crate::merge::MergeReader;
use crate::resolver::IndexResolver;
use crate::storage::Storage;

/// A half-open path interval `[start, stop_before)`; `None` is unbounded.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PathRange {
    pub start: Option<String>,
    pub stop_before: Option<String>,
}

impl PathRange {
    pub fn all() -> Self {
        Self::default()
    }

    /// The range holding only `path`. Paths never contain NUL, so
    /// `path + "\0"` is its immediate successor.
    pub fn exact(path: &str) -> Self {
        Self {
            start: Some(path.to_string()),
            stop_before: Some(format!("{path}\0")),
        }
    }

    pub fn contains(&self, path: &str) -> bool {
        self.start.as_deref().map_or(true, |s| path >= s) && !self.is_past(path)
    }

    /// Whether `path` is at or beyond the upper bound.
    pub fn is_past(&self, path: &str) -> bool {
        self.stop_before.as_deref().is_some_and(|stop| path >= stop)
    }

    /// This range further bounded above by `stop_before`.
    pub fn narrowed(&self, stop_before: Option<&str>) -> Self {
        let stop = match (self.stop_before.as_deref(), stop_before) {
            (Some(a), Some(b)) => Some(a.min(b).to_string()),
            (a, b) => a.or(b).map(str::to_string),
        };
        Self {
            start: self.start.clone(),
            stop_before: stop,
        }
    }
}

/// One layer read on its own. Tombstones are not surfaced.
#[derive(Clone)]
pub struct LayerSource {
    store: Arc<dyn ChunkStore>,
    layer: Layer,
    range: PathRange,
}

impl LayerSource {
    pub(crate) fn new(store: Arc<dyn ChunkStore>, layer: Layer) -> Self {
        Self {
            store,
            layer,
            range: PathRange::all(),
        }
    }

    pub fn with_range(mut self, range: PathRange) -> Self {
        self.range = range;
        self
    }

    pub fn layer(&self) -> &Layer {
        &self.layer
    }

    fn iterate(
        &self,
        cancel: &CancellationToken,
        cb: &mut dyn FnMut(File) -> FilesetResult<()>,
        stop_before: Option<&str>,
    ) -> FilesetResult<()> {
        let range = self.range.narrowed(stop_before);
        let from = range.start.as_deref().map_or(0, |s| self.layer.seek(s));
        for entry in &self.layer.entries()[from..] {
            if range.is_past(&entry.path) {
                break;
            }
            if cancel.is_cancelled() {
                return Err(FilesetError::Cancelled);
            }
            if entry.deleted {
                continue;
            }
            cb(File::new(entry.clone(), Arc::clone(&self.store)))?;
        }
        Ok(())
    }
}

/// A merge specification: layers ordered oldest to newest.
#[derive(Clone)]
pub struct MergeSource {
    storage: Storage,
    layers: Vec<ObjectId>,
    range: PathRange,
}

impl MergeSource {
    pub(crate) fn new(storage: Storage, layers: Vec<ObjectId>) -> Self {
        Self {
            storage,
            layers,
            range: PathRange::all(),
        }
    }

    pub fn with_range(mut self, range: PathRange) -> Self {
        self.range = range;
        self
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Layer ids, oldest first.
    pub fn layers(&self) -> &[ObjectId] {
        &self.layers
    }

    pub fn range(&self) -> &PathRange {
        &self.range
    }

    /// Open a fresh reader over this specification.
    pub fn open(&self) -> FilesetResult<MergeReader> {
        MergeReader::open(self)
    }

    pub(crate) fn narrowed(&self, stop_before: Option<&str>) -> Self {
        Self {
            storage: self.storage.clone(),
            layers: self.layers.clone(),
            range: self.range.narrowed(stop_before),
        }
    }
}

/// The closed set of source kinds.
pub enum FileSource {
    Layer(LayerSource),
    Merge(MergeSource),
    Resolved(IndexResolver),
}

impl FileSource {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Layer(_) => "layer",
            Self::Merge(_) => "merge",
            Self::Resolved(_) => "resolved",
        }
    }

    /// Wrap this source so every file carries a resolved index.
    ///
    /// Only merge sources can be resolved; anything else fails with
    /// [`FilesetError::Unresolvable`].
    pub fn resolved(self) -> FilesetResult<Self> {
        Ok(Self::Resolved(IndexResolver::new(self)?))
    }

    /// Call `cb` once per file in strictly increasing path order, stopping
    /// before `stop_before` if given. The first error from `cb` or from the
    /// underlying layers ends iteration and is returned unchanged.
    pub fn iterate<F>(
        &self,
        cancel: &CancellationToken,
        mut cb: F,
        stop_before: Option<&str>,
    ) -> FilesetResult<()>
    where
        F: FnMut(File) -> FilesetResult<()>,
    {
        match self {
            Self::Layer(source) => source.iterate(cancel, &mut cb, stop_before),
            Self::Merge(source) => {
                let mut reader = MergeReader::open(&source.narrowed(stop_before))?;
                while let Some(file) = reader.next_file()? {
                    if cancel.is_cancelled() {
                        return Err(FilesetError::Cancelled);
                    }
                    cb(file)?;
                }
                Ok(())
            }
            Self::Resolved(resolver) => resolver.iterate(cancel, &mut cb, stop_before),
        }
    }

    /// The first file at `path` exactly, if the view has one.
    pub fn lookup(&self, cancel: &CancellationToken, path: &str) -> FilesetResult<Option<File>> {
        let mut found = None;
        let exact = PathRange::exact(path);
        let narrowed = match self {
            Self::Layer(s) => Self::Layer(s.clone().with_range(exact)),
            Self::Merge(s) => Self::Merge(s.clone().with_range(exact)),
            Self::Resolved(r) => Self::Resolved(r.with_range(exact)),
        };
        narrowed.iterate(
            cancel,
            |file| {
                if file.path() == path {
                    found = Some(file);
                }
                Ok(())
            },
            None,
        )?;
        Ok(found)
    }
}

impl std::fmt::Debug for FileSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("FileSource").field(&self.kind()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunker::ChunkingConfig;
    use strata_store::InMemoryChunkStore;

    fn storage() -> Storage {
        Storage::new(Arc::new(InMemoryChunkStore::new()), ChunkingConfig::small())
    }

    fn layer(storage: &Storage, files: &[(&str, Option<&str>)]) -> ObjectId {
        let mut w = storage.writer();
        for (path, content) in files {
            match content {
                Some(c) => {
                    w.append(path, &mut c.as_bytes()).unwrap();
                }
                None => w.delete(path).unwrap(),
            }
        }
        w.finish().unwrap().id()
    }

    fn collect(source: &FileSource, stop: Option<&str>) -> Vec<(String, String)> {
        let mut out = Vec::new();
        source
            .iterate(
                &CancellationToken::new(),
                |f| {
                    let body = String::from_utf8(f.read_all()?).unwrap();
                    out.push((f.path().to_string(), body));
                    Ok(())
                },
                stop,
            )
            .unwrap();
        out
    }

    #[test]
    fn path_range_bounds() {
        let r = PathRange::exact("a/b");
        assert!(r.contains("a/b"));
        assert!(!r.contains("a/b/c"));
        assert!(!r.contains("a/a"));
        assert!(PathRange::all().contains("anything"));
        let n = PathRange::all().narrowed(Some("m"));
        assert!(n.is_past("m"));
        assert!(!n.is_past("l"));
        assert_eq!(r.narrowed(Some("z")), r);
    }

    #[test]
    fn layer_source_skips_tombstones() {
        let s = storage();
        let id = layer(&s, &[("a", Some("1")), ("b", None), ("c", Some("3"))]);
        let src = s.layer_source(id).unwrap();
        let got = collect(&src, None);
        assert_eq!(got, vec![("a".into(), "1".into()), ("c".into(), "3".into())]);
    }

    #[test]
    fn stop_before_bounds_iteration() {
        let s = storage();
        let id = layer(&s, &[("a", Some("1")), ("b", Some("2")), ("c", Some("3"))]);
        let merged = s.merge_source(vec![id]);
        let got = collect(&merged, Some("c"));
        assert_eq!(got.len(), 2);
        let got = collect(&s.layer_source(id).unwrap(), Some("b"));
        assert_eq!(got.len(), 1);
    }

    #[test]
    fn callback_error_propagates_unchanged() {
        let s = storage();
        let id = layer(&s, &[("a", Some("1")), ("b", Some("2"))]);
        let src = s.merge_source(vec![id]);
        let mut calls = 0;
        let err = src
            .iterate(
                &CancellationToken::new(),
                |_| {
                    calls += 1;
                    Err(FilesetError::Serialization("stop".into()))
                },
                None,
            )
            .unwrap_err();
        assert!(matches!(err, FilesetError::Serialization(ref m) if m == "stop"));
        assert_eq!(calls, 1);
    }

    #[test]
    fn cancelled_iteration() {
        let s = storage();
        let id = layer(&s, &[("a", Some("1"))]);
        let token = CancellationToken::new();
        token.cancel();
        let err = s.merge_source(vec![id]).iterate(&token, |_| Ok(()), None);
        assert!(matches!(err, Err(FilesetError::Cancelled)));
    }

    #[test]
    fn lookup_finds_exact_path_only() {
        let s = storage();
        let id = layer(&s, &[("a", Some("1")), ("a/b", Some("2"))]);
        let src = s.merge_source(vec![id]).resolved().unwrap();
        let cancel = CancellationToken::new();
        let f = src.lookup(&cancel, "a").unwrap().unwrap();
        assert_eq!(f.read_all().unwrap(), b"1");
        assert!(src.lookup(&cancel, "a/").unwrap().is_none());
        assert!(src.lookup(&cancel, "zzz").unwrap().is_none());
    }

    #[test]
    fn only_merge_sources_resolve() {
        let s = storage();
        let id = layer(&s, &[("a", Some("1"))]);
        let err = s.layer_source(id).unwrap().resolved().unwrap_err();
        assert!(matches!(err, FilesetError::Unresolvable("layer")));
        let resolved = s.merge_source(vec![id]).resolved().unwrap();
        let err = resolved.resolved().unwrap_err();
        assert!(matches!(err, FilesetError::Unresolvable("resolved")));
        assert!(err.is_integrity_violation());
    }
}
