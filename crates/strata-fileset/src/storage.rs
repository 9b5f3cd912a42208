//! The storage facade: a chunk store plus the chunking parameters every
//! writer over it must share.

use std::sync::Arc;

use strata_store::ChunkStore;
use strata_types::ObjectId;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::chunker::ChunkingConfig;
use crate::error::{FilesetError, FilesetResult};
use crate::layer::Layer;
use crate::source::{FileSource, LayerSource, MergeSource};
use crate::writer::{FilesetWriter, IndexHook};

#[derive(Clone)]
pub struct Storage {
    store: Arc<dyn ChunkStore>,
    chunking: ChunkingConfig,
}

impl Storage {
    pub fn new(store: Arc<dyn ChunkStore>, chunking: ChunkingConfig) -> Self {
        Self { store, chunking }
    }

    pub fn store(&self) -> &Arc<dyn ChunkStore> {
        &self.store
    }

    pub fn chunking(&self) -> ChunkingConfig {
        self.chunking
    }

    /// A persisting writer for a new layer.
    pub fn writer(&self) -> FilesetWriter<'static> {
        FilesetWriter::upload(Arc::clone(&self.store), self.chunking)
    }

    /// A dry-run writer using the same chunking as [`Storage::writer`].
    pub fn no_upload_writer<'a>(&self, hook: IndexHook<'a>) -> FilesetWriter<'a> {
        FilesetWriter::no_upload(self.chunking, hook)
    }

    pub fn open_layer(&self, id: ObjectId) -> FilesetResult<Layer> {
        match self.store.get(&id)? {
            Some(chunk) => Layer::decode(id, &chunk),
            None => Err(FilesetError::LayerNotFound(id)),
        }
    }

    pub fn layer_source(&self, id: ObjectId) -> FilesetResult<FileSource> {
        let layer = self.open_layer(id)?;
        Ok(FileSource::Layer(LayerSource::new(
            Arc::clone(&self.store),
            layer,
        )))
    }

    /// A merge specification over `layers`, oldest first.
    pub fn merge_spec(&self, layers: Vec<ObjectId>) -> MergeSource {
        MergeSource::new(self.clone(), layers)
    }

    pub fn merge_source(&self, layers: Vec<ObjectId>) -> FileSource {
        FileSource::Merge(self.merge_spec(layers))
    }

    /// Merge `layers` (oldest first) into one new stored layer.
    ///
    /// Tombstones do not survive: nothing older remains for them to hide.
    pub fn compact(&self, layers: &[ObjectId], cancel: &CancellationToken) -> FilesetResult<Layer> {
        let mut reader = self.merge_spec(layers.to_vec()).open()?;
        let mut writer = self.writer().with_cancellation(cancel.clone());
        let bytes = reader.write_to(&mut writer, cancel)?;
        let layer = writer.finish()?;
        debug!(
            inputs = layers.len(),
            layer = %layer.id().short_hex(),
            files = layer.len(),
            bytes,
            "compacted layers"
        );
        Ok(layer)
    }
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage")
            .field("chunking", &self.chunking)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_store::InMemoryChunkStore;

    fn storage() -> Storage {
        Storage::new(Arc::new(InMemoryChunkStore::new()), ChunkingConfig::small())
    }

    #[test]
    fn open_missing_layer() {
        let s = storage();
        let id = ObjectId::from_bytes(b"missing");
        assert!(matches!(s.open_layer(id), Err(FilesetError::LayerNotFound(_))));
    }

    #[test]
    fn data_chunk_is_not_a_layer() {
        let store = Arc::new(InMemoryChunkStore::new());
        let id = store.put(&strata_store::Chunk::data(b"hi".to_vec())).unwrap();
        let s = Storage::new(store, ChunkingConfig::small());
        let err = s.open_layer(id).unwrap_err();
        assert!(matches!(err, FilesetError::CorruptManifest { .. }));
    }

    #[test]
    fn compact_flattens_and_drops_tombstones() {
        let s = storage();
        let mut w = s.writer();
        w.append("a", &mut &b"1"[..]).unwrap();
        w.append("b", &mut &b"2"[..]).unwrap();
        let l1 = w.finish().unwrap().id();
        let mut w = s.writer();
        w.delete("a").unwrap();
        w.append("c", &mut &b"3"[..]).unwrap();
        let l2 = w.finish().unwrap().id();

        let compacted = s.compact(&[l1, l2], &CancellationToken::new()).unwrap();
        let paths: Vec<_> = compacted.entries().iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["b", "c"]);
        assert!(compacted.entries().iter().all(|e| !e.deleted));

        let reopened = s.open_layer(compacted.id()).unwrap();
        assert_eq!(reopened, compacted);
    }

    #[test]
    fn identical_layers_share_an_id() {
        let s = storage();
        let write = || {
            let mut w = s.writer();
            w.append("same", &mut &b"content"[..]).unwrap();
            w.finish().unwrap().id()
        };
        assert_eq!(write(), write());
    }

    #[test]
    fn compact_cancelled() {
        let s = storage();
        let mut w = s.writer();
        w.append("a", &mut &b"1"[..]).unwrap();
        let l = w.finish().unwrap().id();
        let token = CancellationToken::new();
        token.cancel();
        assert!(matches!(s.compact(&[l], &token), Err(FilesetError::Cancelled)));
    }
}
