use strata_types::ObjectId;

/// Domain-separated BLAKE3 content hasher.
///
/// Each hasher carries a domain tag (e.g. `"strata-chunk-v1"`) that is
/// prepended to every hash computation, so a chunk and a file with
/// identical bytes produce different ids.
pub struct ContentHasher {
    domain: &'static str,
}

impl ContentHasher {
    /// Hasher for data chunks.
    pub const CHUNK: Self = Self {
        domain: "strata-chunk-v1",
    };
    /// Hasher for layer manifests.
    pub const MANIFEST: Self = Self {
        domain: "strata-manifest-v1",
    };
    /// Hasher for whole-file content (ETags).
    pub const FILE: Self = Self {
        domain: "strata-file-v1",
    };

    /// Hash raw bytes with domain separation.
    pub fn hash(&self, data: &[u8]) -> ObjectId {
        let mut hasher = self.streaming();
        hasher.update(data);
        hasher.finalize()
    }

    /// Start an incremental hash for content that arrives in pieces.
    pub fn streaming(&self) -> StreamingHasher {
        let mut inner = blake3::Hasher::new();
        inner.update(self.domain.as_bytes());
        inner.update(b":");
        StreamingHasher { inner, len: 0 }
    }

}

/// Incremental domain-separated hash.
///
/// Feeding the same bytes in any split produces the same id as
/// [`ContentHasher::hash`] over the concatenation.
#[derive(Clone)]
pub struct StreamingHasher {
    inner: blake3::Hasher,
    len: u64,
}

impl StreamingHasher {
    /// Absorb more content.
    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
        self.len += data.len() as u64;
    }

    /// Number of content bytes absorbed so far (the domain tag excluded).
    pub fn content_len(&self) -> u64 {
        self.len
    }

    /// Finish and return the id.
    pub fn finalize(&self) -> ObjectId {
        ObjectId::from_hash(*self.inner.finalize().as_bytes())
    }
}

impl std::fmt::Debug for StreamingHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingHasher").field("len", &self.len).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic() {
        assert_eq!(ContentHasher::CHUNK.hash(b"abc"), ContentHasher::CHUNK.hash(b"abc"));
    }

    #[test]
    fn different_domains_produce_different_hashes() {
        let data = b"same content";
        let chunk = ContentHasher::CHUNK.hash(data);
        let manifest = ContentHasher::MANIFEST.hash(data);
        let file = ContentHasher::FILE.hash(data);
        assert_ne!(chunk, manifest);
        assert_ne!(chunk, file);
        assert_ne!(manifest, file);
    }

    #[test]
    fn streaming_matches_one_shot_for_any_split() {
        let data = b"no tv and no beer make homer something something.\n";
        let expected = ContentHasher::FILE.hash(data);
        for split in 0..data.len() {
            let mut h = ContentHasher::FILE.streaming();
            h.update(&data[..split]);
            h.update(&data[split..]);
            assert_eq!(h.finalize(), expected, "split at {split}");
            assert_eq!(h.content_len(), data.len() as u64);
        }
    }

    #[test]
    fn empty_stream() {
        let h = ContentHasher::FILE.streaming();
        assert_eq!(h.content_len(), 0);
        assert_eq!(h.finalize(), ContentHasher::FILE.hash(b""));
    }

    #[test]
    fn domain_separation_is_not_plain_blake3() {
        let plain = ObjectId::from_bytes(b"x");
        assert_ne!(ContentHasher::CHUNK.hash(b"x"), plain);
        assert_ne!(ContentHasher::FILE.hash(b"x"), plain);
    }
}
