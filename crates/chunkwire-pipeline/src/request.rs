//! A chunk preparation request and the work it performs.

use std::fmt;
use std::sync::Arc;

use chunkwire_codec::ChunkSerializer;
use chunkwire_mapping::{LegacyBiomeIdMap, ProtocolTables};
use chunkwire_world::{Chunk, Dimension, deserialize_terrain, serialize_terrain};

use crate::cached_chunk::CachedChunk;
use crate::compression::Compressor;
use crate::PrepError;

/// Everything a worker needs to prepare one chunk for one protocol bucket.
///
/// Holds a copied snapshot of the terrain and the pre-serialized tile
/// section, never the live chunk.
#[derive(Clone)]
pub struct ChunkPrepRequest {
    pub chunk_x: i32,
    pub chunk_z: i32,
    pub dimension_id: i32,
    tables: Arc<ProtocolTables>,
    biome_ids: Arc<LegacyBiomeIdMap>,
    terrain: Vec<u8>,
    tiles: Vec<u8>,
}

impl fmt::Debug for ChunkPrepRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChunkPrepRequest")
            .field("chunk_x", &self.chunk_x)
            .field("chunk_z", &self.chunk_z)
            .field("dimension_id", &self.dimension_id)
            .field("bucket", &self.tables.bucket)
            .field("snapshot_len", &self.snapshot_len())
            .finish()
    }
}

impl ChunkPrepRequest {
    /// Snapshots `chunk` on the calling thread.
    pub fn new(
        chunk_x: i32,
        chunk_z: i32,
        dimension_id: i32,
        chunk: &Chunk,
        tables: Arc<ProtocolTables>,
        biome_ids: Arc<LegacyBiomeIdMap>,
    ) -> Result<Self, PrepError> {
        Ok(Self {
            chunk_x,
            chunk_z,
            dimension_id,
            tables,
            biome_ids,
            terrain: serialize_terrain(chunk)?,
            tiles: ChunkSerializer::serialize_tiles(chunk)?,
        })
    }

    pub fn tables(&self) -> &Arc<ProtocolTables> {
        &self.tables
    }

    /// Size of the copied terrain and tile snapshots.
    pub fn snapshot_len(&self) -> usize {
        self.terrain.len() + self.tiles.len()
    }

    /// Compacts, serializes, hashes and compresses the snapshot.
    pub fn run(&self, compressor: &dyn Compressor) -> Result<CachedChunk, PrepError> {
        let dimension = Dimension::from_id(self.dimension_id)?;
        let mut chunk = deserialize_terrain(&self.terrain)?;
        chunk.collect_garbage();
        let serializer = ChunkSerializer::new(&self.tables.blocks, &self.biome_ids);

        let mut cached = CachedChunk::new();
        for sub_chunk in serializer.serialize_sub_chunks(&chunk, dimension)? {
            cached.add_sub_chunk(sub_chunk, compressor)?;
        }
        cached.set_biomes(serializer.serialize_biomes(&chunk), compressor)?;

        let chunk_data = ChunkSerializer::serialize_chunk_data(&self.tiles);
        cached.set_compressed_chunk_data(compressor.compress(&chunk_data)?);
        Ok(cached)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compression::{DeflateCompressor, Lz4Compressor};
    use crate::test_support;
    use chunkwire_codec::{SUB_CHUNK_VERSION, decode_sub_chunk};
    use chunkwire_nbt::{ByteReader, CompoundTag, NbtFlavor, Tag};
    use chunkwire_world::{PalettedBlockArray, SubChunk, Tile, full_block_id};

    fn request(chunk: &Chunk, dimension: Dimension) -> ChunkPrepRequest {
        ChunkPrepRequest::new(
            0,
            0,
            dimension.id(),
            chunk,
            test_support::tables(),
            test_support::biomes(),
        )
        .unwrap()
    }

    #[test]
    fn test_all_air_chunk() {
        let mut chunk = Chunk::for_dimension(Dimension::Overworld);
        chunk.set_full_block(4, 100, 4, full_block_id(1, 0)).unwrap();
        chunk.set_full_block(4, 100, 4, 0).unwrap();
        let compressor = DeflateCompressor::default();
        let cached = request(&chunk, Dimension::Overworld).run(&compressor).unwrap();

        assert_eq!(cached.sub_chunk_count(), 0);
        assert_eq!(cached.blob_count(), 0);
        assert!(cached.biomes().is_some());
        assert_eq!(
            compressor.decompress(cached.compressed_chunk_data()).unwrap(),
            vec![0]
        );
    }

    #[test]
    fn test_overwritten_layer_is_compacted() {
        let mut chunk = Chunk::for_dimension(Dimension::Overworld);
        for x in 0..16 {
            for y in -64..-48 {
                for z in 0..16 {
                    chunk.set_full_block(x, y, z, full_block_id(1, 0)).unwrap();
                }
            }
        }
        // air stays in the palette until compaction
        assert!(chunk.sub_chunk(-4).unwrap().layers()[0].palette().len() > 1);

        let cached = request(&chunk, Dimension::Overworld).run(&Lz4Compressor).unwrap();
        assert_eq!(cached.sub_chunk_count(), 1);
        let blob = cached.blob(cached.sub_chunk_hashes()[0]).unwrap();
        let decoded = decode_sub_chunk(&mut ByteReader::new(&blob.raw)).unwrap();
        assert_eq!(decoded.layers.len(), 1);
        assert_eq!(decoded.layers[0].bits_per_block, 0);
        assert_eq!(decoded.layers[0].palette.len(), 1);
    }

    #[test]
    fn test_debug_skips_buffers() {
        let chunk = Chunk::for_dimension(Dimension::Nether);
        let text = format!("{:?}", request(&chunk, Dimension::Nether));
        assert!(text.contains("dimension_id: 1"));
        assert!(text.contains("snapshot_len"));
    }

    #[test]
    fn test_flat_chunk_dedupes_layers() {
        let mut chunk = Chunk::for_dimension(Dimension::Overworld);
        for y in -4..0 {
            let stone = PalettedBlockArray::new(full_block_id(1, 0));
            chunk.set_sub_chunk(y, SubChunk::new(0, vec![stone])).unwrap();
        }
        // index -2 left empty inside the transmitted range
        chunk.set_sub_chunk(-2, SubChunk::empty(0)).unwrap();

        let cached = request(&chunk, Dimension::Overworld).run(&Lz4Compressor).unwrap();
        assert_eq!(cached.sub_chunk_count(), 4);
        assert_eq!(cached.blob_count(), 2);
        let hashes = cached.sub_chunk_hashes();
        assert_eq!(hashes[0], hashes[1]);
        assert_eq!(hashes[1], hashes[3]);
        assert_eq!(cached.blob(hashes[2]).unwrap().raw, vec![SUB_CHUNK_VERSION, 0]);
        assert!(cached.biomes().is_some());
    }

    #[test]
    fn test_tiles_travel_in_snapshot() {
        let mut chunk = Chunk::for_dimension(Dimension::Nether);
        chunk.add_tile(Tile::spawnable(
            1,
            2,
            3,
            "Sign",
            CompoundTag::new().with("Text", Tag::string("hello")),
        ));
        let request = request(&chunk, Dimension::Nether);
        // later edits to the live chunk are not observed
        chunk.remove_tile(1, 2, 3);

        let cached = request.run(&Lz4Compressor).unwrap();
        let data = Lz4Compressor.decompress(cached.compressed_chunk_data()).unwrap();
        assert_eq!(data[0], 0);
        let tiles = chunkwire_nbt::read_multiple(&data[1..], NbtFlavor::Network).unwrap();
        assert_eq!(tiles.len(), 1);
        assert_eq!(tiles[0].get_string("Text"), Some("hello"));
    }

    #[test]
    fn test_unknown_dimension_fails() {
        let chunk = Chunk::for_dimension(Dimension::Overworld);
        let mut request = request(&chunk, Dimension::Overworld);
        request.dimension_id = 7;
        assert!(matches!(request.run(&Lz4Compressor), Err(PrepError::World(_))));
    }
}
