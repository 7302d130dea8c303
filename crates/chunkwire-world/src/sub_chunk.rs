//! One 16-block-tall slice of a chunk column.

use crate::paletted::PalettedBlockArray;

/// Block layers for a 16³ section. Layer 0 holds regular blocks; layer 1,
/// when present, holds the liquid a block is waterlogged with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubChunk {
    empty_block_id: u32,
    layers: Vec<PalettedBlockArray>,
}

impl SubChunk {
    pub fn new(empty_block_id: u32, layers: Vec<PalettedBlockArray>) -> Self {
        Self {
            empty_block_id,
            layers,
        }
    }

    /// A section with no layers. Every cell reads as `empty_block_id`.
    pub fn empty(empty_block_id: u32) -> Self {
        Self::new(empty_block_id, Vec::new())
    }

    pub fn empty_block_id(&self) -> u32 {
        self.empty_block_id
    }

    /// Cheap emptiness check: no layers at all.
    ///
    /// A section whose layers happen to contain only the empty id still
    /// reports `false` until [`collect_garbage`](Self::collect_garbage) runs.
    pub fn is_empty_fast(&self) -> bool {
        self.layers.is_empty()
    }

    /// Full scan: every layer is uniformly the empty id.
    pub fn is_empty_authoritative(&self) -> bool {
        self.layers
            .iter()
            .all(|layer| layer.palette() == [self.empty_block_id])
    }

    pub fn layers(&self) -> &[PalettedBlockArray] {
        &self.layers
    }

    pub fn layers_mut(&mut self) -> &mut Vec<PalettedBlockArray> {
        &mut self.layers
    }

    pub fn full_block(&self, x: usize, y: usize, z: usize) -> u32 {
        self.layers
            .first()
            .map_or(self.empty_block_id, |layer| layer.get(x, y, z))
    }

    /// Writes to layer 0, creating it on first write of a non-empty block.
    pub fn set_full_block(&mut self, x: usize, y: usize, z: usize, block: u32) {
        if self.layers.is_empty() {
            if block == self.empty_block_id {
                return;
            }
            self.layers.push(PalettedBlockArray::new(self.empty_block_id));
        }
        self.layers[0].set(x, y, z, block);
    }

    /// Compacts every layer and drops layers that are entirely empty.
    pub fn collect_garbage(&mut self) {
        let empty = self.empty_block_id;
        for layer in &mut self.layers {
            layer.collect_garbage();
        }
        self.layers.retain(|layer| layer.palette() != [empty]);
    }
}
