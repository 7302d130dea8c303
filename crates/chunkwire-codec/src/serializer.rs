//! Full chunk payload assembly.
//!
//! A payload is, in order: the sub-chunk stack from the dimension's lowest
//! index up to the highest non-empty one, the biome section repeated once per
//! vertical biome section, and the chunk-data section (border blocks + tiles).

use chunkwire_mapping::{LegacyBiomeIdMap, RuntimeBlockMapping};
use chunkwire_nbt::NbtFlavor;
use chunkwire_world::paletted::EDGE;
use chunkwire_world::{Chunk, Dimension, PalettedBlockArray, SubChunk};

use crate::CodecError;
use crate::palette::{PaletteEncoding, encode_biome_palette, encode_block_layer};

/// Sub-chunk format version written before every sub-chunk.
pub const SUB_CHUNK_VERSION: u8 = 8;

/// Vertical biome sections in a chunk payload.
pub const BIOME_SECTION_COUNT: usize = 24;

/// Substituted for biome ids clients do not know.
pub const OCEAN_BIOME_ID: u8 = 0;

/// Serializes chunks for one protocol bucket.
#[derive(Clone, Copy)]
pub struct ChunkSerializer<'a> {
    blocks: &'a RuntimeBlockMapping,
    biome_ids: &'a LegacyBiomeIdMap,
    encoding: PaletteEncoding,
}

impl<'a> ChunkSerializer<'a> {
    /// A serializer writing runtime-id palettes.
    pub fn new(blocks: &'a RuntimeBlockMapping, biome_ids: &'a LegacyBiomeIdMap) -> Self {
        Self {
            blocks,
            biome_ids,
            encoding: PaletteEncoding::Runtime,
        }
    }

    /// Switches block palettes to the given encoding.
    pub fn with_encoding(mut self, encoding: PaletteEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Number of sub-chunks to send: from the dimension's lowest index up to
    /// and including the highest one holding anything but air. 0 when all
    /// are empty.
    pub fn sub_chunk_count(chunk: &Chunk, dimension: Dimension) -> usize {
        let range = dimension.sub_chunk_range();
        range
            .iter()
            .rev()
            .find(|&y| chunk.sub_chunk(y).is_some_and(|sub| !sub.is_empty_authoritative()))
            .map_or(0, |top| (top - range.min() + 1) as usize)
    }

    /// Appends one sub-chunk: version, layer count, layers.
    ///
    /// Layers are written as they are; run [`Chunk::collect_garbage`] first
    /// for minimal palettes and widths.
    pub fn serialize_sub_chunk(&self, sub: &SubChunk, out: &mut Vec<u8>) -> Result<(), CodecError> {
        let count = sub.layers().len();
        let layer_count = u8::try_from(count).map_err(|_| CodecError::TooManyLayers(count))?;
        out.push(SUB_CHUNK_VERSION);
        out.push(layer_count);
        for layer in sub.layers() {
            encode_block_layer(out, layer, self.blocks, self.encoding)?;
        }
        Ok(())
    }

    /// One buffer per transmitted sub-chunk, bottom up.
    pub fn serialize_sub_chunks(&self, chunk: &Chunk, dimension: Dimension) -> Result<Vec<Vec<u8>>, CodecError> {
        let count = Self::sub_chunk_count(chunk, dimension);
        let range = dimension.sub_chunk_range();
        let empty = SubChunk::empty(chunkwire_world::AIR);
        range
            .iter()
            .take(count)
            .map(|y| {
                let mut out = Vec::new();
                self.serialize_sub_chunk(chunk.sub_chunk(y).unwrap_or(&empty), &mut out)?;
                Ok(out)
            })
            .collect()
    }

    /// The biome section: each column's biome stretched over 16 blocks of
    /// height, encoded once and repeated for every biome section.
    pub fn serialize_biomes(&self, chunk: &Chunk) -> Vec<u8> {
        let known = |biome: u8| {
            if self.biome_ids.legacy_to_string(u32::from(biome)).is_some() {
                biome
            } else {
                OCEAN_BIOME_ID
            }
        };

        let mut palette = PalettedBlockArray::new(u32::from(known(chunk.biome_id(0, 0))));
        for x in 0..EDGE {
            for z in 0..EDGE {
                let biome = u32::from(known(chunk.biome_id(x, z)));
                for y in 0..EDGE {
                    palette.set(x, y, z, biome);
                }
            }
        }

        let mut section = Vec::new();
        encode_biome_palette(&mut section, &palette);
        section.repeat(BIOME_SECTION_COUNT)
    }

    /// Network NBT spawn compounds of every spawnable tile, in chunk order.
    pub fn serialize_tiles(chunk: &Chunk) -> Result<Vec<u8>, CodecError> {
        let mut out = Vec::new();
        for compound in chunk.tiles().iter().filter_map(|tile| tile.spawn_compound()) {
            chunkwire_nbt::write_root(&mut out, compound, NbtFlavor::Network)?;
        }
        Ok(out)
    }

    /// Border block count (always 0) followed by pre-serialized tiles.
    pub fn serialize_chunk_data(tiles: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(1 + tiles.len());
        out.push(0);
        out.extend_from_slice(tiles);
        out
    }

    /// Sub-chunks, biomes and chunk data concatenated. `tiles` defaults to
    /// [`serialize_tiles`](Self::serialize_tiles) of `chunk`.
    pub fn serialize_full_chunk(
        &self,
        chunk: &Chunk,
        dimension: Dimension,
        tiles: Option<&[u8]>,
    ) -> Result<Vec<u8>, CodecError> {
        let mut out = Vec::new();
        for sub in self.serialize_sub_chunks(chunk, dimension)? {
            out.extend_from_slice(&sub);
        }
        out.extend_from_slice(&self.serialize_biomes(chunk));
        match tiles {
            Some(tiles) => out.extend_from_slice(&Self::serialize_chunk_data(tiles)),
            None => out.extend_from_slice(&Self::serialize_chunk_data(&Self::serialize_tiles(chunk)?)),
        }
        Ok(out)
    }
}

// ---- Tests ----

#[cfg(test)]
mod tests {
    use super::*;
    use crate::palette::{DecodedPalette, decode_biome_palette, decode_sub_chunk};
    use crate::test_support;
    use chunkwire_nbt::{ByteReader, CompoundTag, Tag};
    use chunkwire_world::{Tile, full_block_id};

    const STONE: u32 = 1 << 4;
    const DIRT: u32 = 3 << 4;

    fn checkerboard_sub_chunk() -> SubChunk {
        let mut sub = SubChunk::empty(0);
        for x in 0..16 {
            for y in 0..16 {
                for z in 0..16 {
                    let block = if (x + y + z) % 2 == 0 { STONE } else { DIRT };
                    sub.set_full_block(x, y, z, block);
                }
            }
        }
        sub.collect_garbage();
        sub
    }

    // ---- sub-chunk count ----

    #[test]
    fn test_empty_chunk_count_is_zero() {
        let chunk = Chunk::for_dimension(Dimension::Overworld);
        assert_eq!(ChunkSerializer::sub_chunk_count(&chunk, Dimension::Overworld), 0);
    }

    #[test]
    fn test_only_bottom_sub_chunk_counts_one() {
        let mut chunk = Chunk::for_dimension(Dimension::Overworld);
        chunk.set_full_block(0, -64, 0, STONE).unwrap();
        assert_eq!(ChunkSerializer::sub_chunk_count(&chunk, Dimension::Overworld), 1);
    }

    #[test]
    fn test_count_spans_to_highest_non_empty() {
        let mut chunk = Chunk::for_dimension(Dimension::Overworld);
        chunk.set_full_block(0, -64, 0, STONE).unwrap();
        chunk.set_full_block(0, 40, 0, STONE).unwrap();
        // highest non-empty index is 2, lowest is -4
        let count = ChunkSerializer::sub_chunk_count(&chunk, Dimension::Overworld);
        assert_eq!(count, 7);
        assert_eq!(ChunkSerializer::sub_chunk_count(&chunk, Dimension::Overworld), count);
    }

    #[test]
    fn test_overwritten_with_air_does_not_count() {
        let mut chunk = Chunk::for_dimension(Dimension::Overworld);
        chunk.set_full_block(0, 100, 0, STONE).unwrap();
        chunk.set_full_block(0, 100, 0, 0).unwrap();
        // layer still present until compaction
        assert!(!chunk.sub_chunk(6).unwrap().is_empty_fast());
        assert_eq!(ChunkSerializer::sub_chunk_count(&chunk, Dimension::Overworld), 0);
    }

    #[test]
    fn test_too_many_layers_rejected() {
        let blocks = test_support::blocks();
        let biomes = test_support::biomes();
        let serializer = ChunkSerializer::new(&blocks, &biomes);
        let sub = SubChunk::new(0, vec![PalettedBlockArray::new(STONE); 256]);
        let mut out = Vec::new();
        assert!(matches!(
            serializer.serialize_sub_chunk(&sub, &mut out),
            Err(CodecError::TooManyLayers(256))
        ));
    }

    #[test]
    fn test_nether_count() {
        let mut chunk = Chunk::for_dimension(Dimension::Nether);
        chunk.set_full_block(0, 127, 0, STONE).unwrap();
        assert_eq!(ChunkSerializer::sub_chunk_count(&chunk, Dimension::Nether), 8);
    }

    // ---- sub-chunks ----

    #[test]
    fn test_checkerboard_sub_chunk() {
        let blocks = test_support::blocks();
        let biomes = test_support::biomes();
        let serializer = ChunkSerializer::new(&blocks, &biomes);
        let sub = checkerboard_sub_chunk();

        let mut first = Vec::new();
        serializer.serialize_sub_chunk(&sub, &mut first).unwrap();
        let mut second = Vec::new();
        serializer.serialize_sub_chunk(&sub, &mut second).unwrap();
        assert_eq!(first, second);

        assert_eq!(first[0], SUB_CHUNK_VERSION);
        assert_eq!(first[1], 1);
        let decoded = decode_sub_chunk(&mut ByteReader::new(&first)).unwrap();
        assert_eq!(decoded.layers.len(), 1);
        assert_eq!(decoded.layers[0].bits_per_block, 1);
        assert_eq!(decoded.layers[0].palette.len(), 2);
        assert_eq!(decoded.layers[0].block_layer(&blocks).unwrap(), sub.layers()[0]);
    }

    #[test]
    fn test_interior_empty_sub_chunk_is_placeholder() {
        let blocks = test_support::blocks();
        let biomes = test_support::biomes();
        let serializer = ChunkSerializer::new(&blocks, &biomes);

        let mut chunk = Chunk::for_dimension(Dimension::End);
        chunk.set_full_block(0, 0, 0, STONE).unwrap();
        chunk.set_full_block(0, 32, 0, DIRT).unwrap();

        let subs = serializer.serialize_sub_chunks(&chunk, Dimension::End).unwrap();
        assert_eq!(subs.len(), 3);
        assert_eq!(subs[1], vec![SUB_CHUNK_VERSION, 0]);
        assert_eq!(subs[0][1], 1);
    }

    #[test]
    fn test_all_air_chunk_sends_no_sub_chunks() {
        let blocks = test_support::blocks();
        let biomes = test_support::biomes();
        let serializer = ChunkSerializer::new(&blocks, &biomes);
        let chunk = Chunk::for_dimension(Dimension::Overworld);
        assert!(serializer.serialize_sub_chunks(&chunk, Dimension::Overworld).unwrap().is_empty());
    }

    // ---- biomes ----

    #[test]
    fn test_single_biome_has_no_words() {
        let blocks = test_support::blocks();
        let biomes = test_support::biomes();
        let serializer = ChunkSerializer::new(&blocks, &biomes);
        let mut chunk = Chunk::for_dimension(Dimension::Overworld);
        chunk.set_biome_ids([1; 256]);

        let bytes = serializer.serialize_biomes(&chunk);
        // header (0 << 1 | 1) and one entry varuint(1 << 1), 24 times
        assert_eq!(bytes, [1u8, 2].repeat(BIOME_SECTION_COUNT));
    }

    #[test]
    fn test_unknown_biome_becomes_ocean() {
        let blocks = test_support::blocks();
        let biomes = test_support::biomes();
        let serializer = ChunkSerializer::new(&blocks, &biomes);
        let mut chunk = Chunk::for_dimension(Dimension::Overworld);
        chunk.set_biome_ids([200; 256]);
        chunk.set_biome_id(3, 4, 2);

        let bytes = serializer.serialize_biomes(&chunk);
        let section_len = bytes.len() / BIOME_SECTION_COUNT;
        let section = &bytes[..section_len];
        assert!(bytes.chunks(section_len).all(|c| c == section));

        let layer = decode_biome_palette(&mut ByteReader::new(section)).unwrap();
        assert_eq!(layer.palette(), &[OCEAN_BIOME_ID as u32, 2]);
        assert_eq!(layer.bits_per_block(), 1);
        for y in 0..16 {
            assert_eq!(layer.get(3, y, 4), 2);
            assert_eq!(layer.get(0, y, 0), 0);
        }
    }

    // ---- chunk data ----

    #[test]
    fn test_chunk_data_only_includes_spawnable_tiles() {
        let mut chunk = Chunk::for_dimension(Dimension::Overworld);
        chunk.add_tile(Tile::new(0, 0, 0));
        let sign = CompoundTag::new().with("Text", Tag::string("hi"));
        chunk.add_tile(Tile::spawnable(1, 2, 3, "Sign", sign));

        let tiles = ChunkSerializer::serialize_tiles(&chunk).unwrap();
        let data = ChunkSerializer::serialize_chunk_data(&tiles);
        assert_eq!(data[0], 0);
        let roots = chunkwire_nbt::read_multiple(&data[1..], NbtFlavor::Network).unwrap();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].get_string("id"), Some("Sign"));
    }

    #[test]
    fn test_chunk_data_without_tiles() {
        assert_eq!(ChunkSerializer::serialize_chunk_data(&[]), vec![0]);
    }

    // ---- full chunk ----

    #[test]
    fn test_full_chunk_is_concatenation() {
        let blocks = test_support::blocks();
        let biomes = test_support::biomes();
        let serializer = ChunkSerializer::new(&blocks, &biomes);

        let mut chunk = Chunk::for_dimension(Dimension::Overworld);
        for x in 0..16 {
            for z in 0..16 {
                chunk.set_full_block(x, -64, z, full_block_id(1, 0)).unwrap();
            }
        }
        chunk.add_tile(Tile::spawnable(0, -63, 0, "Chest", CompoundTag::new()));

        let full = serializer
            .serialize_full_chunk(&chunk, Dimension::Overworld, None)
            .unwrap();
        let mut expected = Vec::new();
        for sub in serializer.serialize_sub_chunks(&chunk, Dimension::Overworld).unwrap() {
            expected.extend(sub);
        }
        expected.extend(serializer.serialize_biomes(&chunk));
        expected.extend(ChunkSerializer::serialize_chunk_data(
            &ChunkSerializer::serialize_tiles(&chunk).unwrap(),
        ));
        assert_eq!(full, expected);

        let with_pre_serialized = serializer
            .serialize_full_chunk(&chunk, Dimension::Overworld, Some(&[]))
            .unwrap();
        assert!(with_pre_serialized.len() < full.len());
        assert_eq!(with_pre_serialized.last(), Some(&0));
    }

    #[test]
    fn test_persistent_encoding_writes_states() {
        let blocks = test_support::blocks();
        let biomes = test_support::biomes();
        let serializer =
            ChunkSerializer::new(&blocks, &biomes).with_encoding(PaletteEncoding::Persistent);
        let mut out = Vec::new();
        serializer.serialize_sub_chunk(&checkerboard_sub_chunk(), &mut out).unwrap();
        assert_eq!(out[2], 1 << 1);
        let decoded = decode_sub_chunk(&mut ByteReader::new(&out)).unwrap();
        assert!(matches!(decoded.layers[0].palette, DecodedPalette::States(_)));
    }
}
