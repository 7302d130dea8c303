//! Result of one chunk preparation.
//!
//! Sub-chunk buffers are stored once per distinct content and referenced by
//! hash, so a flat chunk with many identical layers compresses each of them
//! once. Hash collisions are not detected.

use std::hash::Hasher;

use rustc_hash::{FxHashMap, FxHasher};

use crate::compression::{CompressionError, Compressor};

/// 64-bit content hash used to key cached buffers.
pub fn content_hash(bytes: &[u8]) -> u64 {
    let mut hasher = FxHasher::default();
    hasher.write(bytes);
    hasher.finish()
}

/// A serialized buffer and its compressed form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedBlob {
    pub raw: Vec<u8>,
    pub compressed: Vec<u8>,
}

impl CachedBlob {
    fn new(raw: Vec<u8>, compressor: &dyn Compressor) -> Result<Self, CompressionError> {
        let compressed = compressor.compress(&raw)?;
        Ok(Self { raw, compressed })
    }
}

/// Hash-keyed buffers for one chunk, ready to send.
#[derive(Debug, Clone, Default)]
pub struct CachedChunk {
    sub_chunk_hashes: Vec<u64>,
    blobs: FxHashMap<u64, CachedBlob>,
    biome_hash: u64,
    biomes: Option<CachedBlob>,
    chunk_data: Vec<u8>,
}

impl CachedChunk {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the next sub-chunk (bottom up), compressing it only if its
    /// content has not been seen in this chunk yet.
    pub fn add_sub_chunk(&mut self, bytes: Vec<u8>, compressor: &dyn Compressor) -> Result<u64, CompressionError> {
        let hash = content_hash(&bytes);
        if !self.blobs.contains_key(&hash) {
            self.blobs.insert(hash, CachedBlob::new(bytes, compressor)?);
        }
        self.sub_chunk_hashes.push(hash);
        Ok(hash)
    }

    pub fn set_biomes(&mut self, bytes: Vec<u8>, compressor: &dyn Compressor) -> Result<u64, CompressionError> {
        self.biome_hash = content_hash(&bytes);
        self.biomes = Some(CachedBlob::new(bytes, compressor)?);
        Ok(self.biome_hash)
    }

    /// Stores the already compressed chunk-data section.
    pub fn set_compressed_chunk_data(&mut self, compressed: Vec<u8>) {
        self.chunk_data = compressed;
    }

    /// Hashes of the transmitted sub-chunks, bottom up.
    pub fn sub_chunk_hashes(&self) -> &[u64] {
        &self.sub_chunk_hashes
    }

    pub fn sub_chunk_count(&self) -> usize {
        self.sub_chunk_hashes.len()
    }

    pub fn blob(&self, hash: u64) -> Option<&CachedBlob> {
        self.blobs.get(&hash)
    }

    /// Distinct sub-chunk buffers.
    pub fn blob_count(&self) -> usize {
        self.blobs.len()
    }

    /// Sub-chunk buffers in transmission order, duplicates included.
    pub fn sub_chunks(&self) -> impl Iterator<Item = &CachedBlob> {
        self.sub_chunk_hashes.iter().filter_map(|hash| self.blobs.get(hash))
    }

    pub fn biome_hash(&self) -> u64 {
        self.biome_hash
    }

    pub fn biomes(&self) -> Option<&CachedBlob> {
        self.biomes.as_ref()
    }

    pub fn compressed_chunk_data(&self) -> &[u8] {
        &self.chunk_data
    }

    /// Total compressed bytes held, counting each distinct blob once.
    pub fn compressed_size(&self) -> usize {
        self.blobs.values().map(|b| b.compressed.len()).sum::<usize>()
            + self.biomes.as_ref().map_or(0, |b| b.compressed.len())
            + self.chunk_data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compression::Lz4Compressor;

    #[test]
    fn test_content_hash_is_stable() {
        assert_eq!(content_hash(&[8, 0]), content_hash(&[8, 0]));
        assert_ne!(content_hash(&[8, 0]), content_hash(&[8, 1]));
    }

    #[test]
    fn test_identical_sub_chunks_stored_once() {
        let mut cached = CachedChunk::new();
        let a = cached.add_sub_chunk(vec![8, 1, 2, 3], &Lz4Compressor).unwrap();
        let b = cached.add_sub_chunk(vec![8, 0], &Lz4Compressor).unwrap();
        let c = cached.add_sub_chunk(vec![8, 1, 2, 3], &Lz4Compressor).unwrap();

        assert_eq!(a, c);
        assert_ne!(a, b);
        assert_eq!(cached.sub_chunk_hashes(), &[a, b, a]);
        assert_eq!(cached.blob_count(), 2);
        let raws: Vec<_> = cached.sub_chunks().map(|b| b.raw.clone()).collect();
        assert_eq!(raws, vec![vec![8, 1, 2, 3], vec![8, 0], vec![8, 1, 2, 3]]);
    }

    #[test]
    fn test_blob_holds_compressed_form() {
        let mut cached = CachedChunk::new();
        let hash = cached.add_sub_chunk(vec![8, 0], &Lz4Compressor).unwrap();
        let blob = cached.blob(hash).unwrap();
        assert_eq!(Lz4Compressor.decompress(&blob.compressed).unwrap(), blob.raw);
    }

    #[test]
    fn test_biomes_and_chunk_data() {
        let mut cached = CachedChunk::new();
        assert!(cached.biomes().is_none());
        let hash = cached.set_biomes(vec![1, 2], &Lz4Compressor).unwrap();
        cached.set_compressed_chunk_data(vec![9, 9, 9]);

        assert_eq!(cached.biome_hash(), hash);
        assert_eq!(cached.biomes().unwrap().raw, vec![1, 2]);
        assert_eq!(cached.compressed_chunk_data(), &[9, 9, 9]);
        assert_eq!(
            cached.compressed_size(),
            cached.biomes().unwrap().compressed.len() + 3
        );
    }
}
