//! A 16×16 chunk column: stacked sub-chunks, per-column biomes and tiles.

use crate::dimension::{Dimension, SubChunkRange, WorldError};
use crate::paletted::EDGE;
use crate::sub_chunk::SubChunk;
use crate::tile::Tile;

/// Full block id of air.
pub const AIR: u32 = 0;

/// Number of biome columns in a chunk.
pub const BIOME_COLUMNS: usize = EDGE * EDGE;

/// Packs a legacy id and 4-bit metadata into a full block id.
#[inline]
pub fn full_block_id(legacy_id: u32, meta: u8) -> u32 {
    debug_assert!(meta <= 15, "metadata {meta} exceeds 4 bits");
    (legacy_id << 4) | u32::from(meta & 0xf)
}

/// Splits a full block id into `(legacy_id, meta)`.
#[inline]
pub fn split_full_block_id(full_id: u32) -> (u32, u8) {
    (full_id >> 4, (full_id & 0xf) as u8)
}

/// Terrain, biomes and tiles for one chunk column.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chunk {
    range: SubChunkRange,
    sub_chunks: Vec<SubChunk>,
    biomes: Box<[u8; BIOME_COLUMNS]>,
    tiles: Vec<Tile>,
}

impl Chunk {
    /// An all-air column spanning `range`, biome 0 everywhere.
    pub fn new(range: SubChunkRange) -> Self {
        Self {
            range,
            sub_chunks: (0..range.len()).map(|_| SubChunk::empty(AIR)).collect(),
            biomes: Box::new([0; BIOME_COLUMNS]),
            tiles: Vec::new(),
        }
    }

    /// An all-air column sized for `dimension`.
    pub fn for_dimension(dimension: Dimension) -> Self {
        Self::new(dimension.sub_chunk_range())
    }

    pub fn range(&self) -> SubChunkRange {
        self.range
    }

    pub fn sub_chunk(&self, index: i32) -> Option<&SubChunk> {
        self.range.offset_of(index).map(|i| &self.sub_chunks[i])
    }

    pub fn sub_chunk_mut(&mut self, index: i32) -> Option<&mut SubChunk> {
        self.range.offset_of(index).map(|i| &mut self.sub_chunks[i])
    }

    /// Replaces the sub-chunk at `index`.
    pub fn set_sub_chunk(&mut self, index: i32, sub_chunk: SubChunk) -> Result<(), WorldError> {
        let offset = self.range.offset_of(index).ok_or(WorldError::HeightOutOfRange {
            y: index << 4,
            min: self.range.min(),
            max: self.range.max(),
        })?;
        self.sub_chunks[offset] = sub_chunk;
        Ok(())
    }

    /// Sub-chunks from the bottom of the range upward, with their indices.
    pub fn sub_chunks(&self) -> impl Iterator<Item = (i32, &SubChunk)> {
        self.range.iter().zip(self.sub_chunks.iter())
    }

    /// Block at local `x`/`z` and absolute `y`. Heights outside the range read as air.
    pub fn full_block(&self, x: usize, y: i32, z: usize) -> u32 {
        self.sub_chunk(y >> 4)
            .map_or(AIR, |sub| sub.full_block(x, (y & 0xf) as usize, z))
    }

    pub fn set_full_block(&mut self, x: usize, y: i32, z: usize, block: u32) -> Result<(), WorldError> {
        let range = self.range;
        let sub = self.sub_chunk_mut(y >> 4).ok_or(WorldError::HeightOutOfRange {
            y,
            min: range.min(),
            max: range.max(),
        })?;
        sub.set_full_block(x, (y & 0xf) as usize, z, block);
        Ok(())
    }

    /// Biome id of column `(x, z)`.
    pub fn biome_id(&self, x: usize, z: usize) -> u8 {
        self.biomes[Self::column(x, z)]
    }

    pub fn set_biome_id(&mut self, x: usize, z: usize, biome: u8) {
        self.biomes[Self::column(x, z)] = biome;
    }

    /// Raw biome columns, indexed `(x << 4) | z`.
    pub fn biome_ids(&self) -> &[u8; BIOME_COLUMNS] {
        &self.biomes
    }

    pub fn set_biome_ids(&mut self, biomes: [u8; BIOME_COLUMNS]) {
        *self.biomes = biomes;
    }

    #[inline]
    fn column(x: usize, z: usize) -> usize {
        debug_assert!(x < EDGE && z < EDGE);
        (x << 4) | z
    }

    /// Tiles in insertion order.
    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// Adds a tile, replacing any tile already at the same position.
    pub fn add_tile(&mut self, tile: Tile) {
        match self
            .tiles
            .iter_mut()
            .find(|t| (t.x, t.y, t.z) == (tile.x, tile.y, tile.z))
        {
            Some(existing) => *existing = tile,
            None => self.tiles.push(tile),
        }
    }

    pub fn remove_tile(&mut self, x: i32, y: i32, z: i32) -> Option<Tile> {
        let pos = self.tiles.iter().position(|t| (t.x, t.y, t.z) == (x, y, z))?;
        Some(self.tiles.remove(pos))
    }

    /// Compacts every sub-chunk, dropping layers that hold only air.
    pub fn collect_garbage(&mut self) {
        for sub in &mut self.sub_chunks {
            sub.collect_garbage();
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_block_id_packing() {
        assert_eq!(full_block_id(1, 0), 16);
        assert_eq!(full_block_id(248, 0), 3968);
        assert_eq!(split_full_block_id(full_block_id(35, 14)), (35, 14));
    }

    #[test]
    fn test_new_chunk_is_air() {
        let chunk = Chunk::for_dimension(Dimension::Overworld);
        assert_eq!(chunk.sub_chunks().count(), 24);
        assert!(chunk.sub_chunks().all(|(_, sub)| sub.is_empty_fast()));
        assert_eq!(chunk.full_block(0, -64, 0), AIR);
    }

    #[test]
    fn test_negative_heights_map_to_lower_sub_chunks() {
        let mut chunk = Chunk::for_dimension(Dimension::Overworld);
        chunk.set_full_block(3, -61, 4, full_block_id(1, 0)).unwrap();
        assert_eq!(chunk.full_block(3, -61, 4), 16);
        let sub = chunk.sub_chunk(-4).unwrap();
        assert_eq!(sub.full_block(3, 3, 4), 16);
    }

    #[test]
    fn test_out_of_range_height() {
        let mut chunk = Chunk::for_dimension(Dimension::Nether);
        assert_eq!(chunk.full_block(0, 200, 0), AIR);
        assert_eq!(
            chunk.set_full_block(0, 128, 0, 16),
            Err(WorldError::HeightOutOfRange {
                y: 128,
                min: 0,
                max: 7
            })
        );
    }

    #[test]
    fn test_biome_columns() {
        let mut chunk = Chunk::for_dimension(Dimension::End);
        chunk.set_biome_id(15, 2, 9);
        assert_eq!(chunk.biome_id(15, 2), 9);
        assert_eq!(chunk.biome_ids()[(15 << 4) | 2], 9);
    }

    #[test]
    fn test_tiles_keep_order_and_replace_by_position() {
        let mut chunk = Chunk::for_dimension(Dimension::Overworld);
        chunk.add_tile(Tile::new(0, 1, 0));
        chunk.add_tile(Tile::new(5, 1, 5));
        chunk.add_tile(Tile::new(0, 1, 0));
        assert_eq!(chunk.tiles().len(), 2);
        assert_eq!(chunk.tiles()[1].x, 5);
        assert!(chunk.remove_tile(5, 1, 5).is_some());
        assert_eq!(chunk.tiles().len(), 1);
    }
}
