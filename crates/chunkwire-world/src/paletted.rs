//! Palette-compressed storage for one 16×16×16 layer.
//!
//! Cells are indexed XZY: `(x << 8) | (z << 4) | y`. Each cell holds an index
//! into a palette of distinct values kept in first-insertion order. The index
//! width grows through 0, 1, 2, 3, 4, 5, 6, 8, 16 bits as the palette grows.

use crate::bit_packed::{self, BitPackedArray};

/// Side length of a sub-chunk.
pub const EDGE: usize = 16;

/// Cells per layer (16³).
pub const VOLUME: usize = EDGE * EDGE * EDGE;

/// Errors raised when building a [`PalettedBlockArray`] from raw parts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PaletteError {
    #[error("unsupported bits per block: {0}")]
    InvalidBitsPerBlock(u8),
    #[error("{bits}-bit layer needs {expected} words, got {actual}")]
    WordCountMismatch {
        bits: u8,
        expected: usize,
        actual: usize,
    },
    #[error("palette is empty")]
    EmptyPalette,
    #[error("palette of {len} entries does not fit {bits} bits")]
    PaletteTooLarge { bits: u8, len: usize },
    #[error("cell {cell} references palette slot {slot} of {palette_len}")]
    IndexOutOfRange {
        cell: usize,
        slot: usize,
        palette_len: usize,
    },
}

/// A 16³ layer of `u32` values (full block ids or biome ids).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PalettedBlockArray {
    palette: Vec<u32>,
    storage: BitPackedArray,
}

impl PalettedBlockArray {
    /// A layer where every cell holds `fill`. Uses zero index bits.
    pub fn new(fill: u32) -> Self {
        Self {
            palette: vec![fill],
            storage: BitPackedArray::new(0, VOLUME),
        }
    }

    /// Rebuilds a layer from its wire parts.
    ///
    /// Validates the width, the word count, the palette size against the
    /// width, and that every packed index resolves to a palette slot. Padding
    /// bits in the words are not inspected.
    pub fn from_data(bits: u8, words: Vec<u32>, palette: Vec<u32>) -> Result<Self, PaletteError> {
        if !bit_packed::is_valid_bits(bits) {
            return Err(PaletteError::InvalidBitsPerBlock(bits));
        }
        if palette.is_empty() {
            return Err(PaletteError::EmptyPalette);
        }
        let capacity = 1usize << bits;
        if palette.len() > capacity {
            return Err(PaletteError::PaletteTooLarge {
                bits,
                len: palette.len(),
            });
        }
        let expected = bit_packed::word_count(bits, VOLUME);
        let actual = words.len();
        let storage = BitPackedArray::from_words(bits, VOLUME, words).ok_or(
            PaletteError::WordCountMismatch {
                bits,
                expected,
                actual,
            },
        )?;
        if palette.len() < capacity {
            for cell in 0..VOLUME {
                let slot = usize::from(storage.get(cell));
                if slot >= palette.len() {
                    return Err(PaletteError::IndexOutOfRange {
                        cell,
                        slot,
                        palette_len: palette.len(),
                    });
                }
            }
        }
        Ok(Self { palette, storage })
    }

    /// XZY cell index.
    #[inline]
    pub fn index(x: usize, y: usize, z: usize) -> usize {
        debug_assert!(x < EDGE && y < EDGE && z < EDGE);
        (x << 8) | (z << 4) | y
    }

    pub fn get(&self, x: usize, y: usize, z: usize) -> u32 {
        self.get_at(Self::index(x, y, z))
    }

    /// Value at a raw XZY index.
    pub fn get_at(&self, cell: usize) -> u32 {
        self.palette[usize::from(self.storage.get(cell))]
    }

    pub fn set(&mut self, x: usize, y: usize, z: usize, value: u32) {
        self.set_at(Self::index(x, y, z), value);
    }

    /// Sets a raw XZY index, growing the palette and width as needed.
    pub fn set_at(&mut self, cell: usize, value: u32) {
        let slot = self.slot_for(value);
        self.storage.set(cell, slot);
    }

    fn slot_for(&mut self, value: u32) -> u16 {
        if let Some(slot) = self.palette.iter().position(|&v| v == value) {
            return slot as u16;
        }
        let new_bits = bit_packed::bits_for_palette_len(self.palette.len() + 1);
        if new_bits != self.storage.bits() {
            self.repack(new_bits, |old| old);
        }
        self.palette.push(value);
        (self.palette.len() - 1) as u16
    }

    fn repack(&mut self, bits: u8, remap: impl Fn(u16) -> u16) {
        let mut storage = BitPackedArray::new(bits, VOLUME);
        if self.storage.bits() > 0 || bits > 0 {
            for cell in 0..VOLUME {
                storage.set(cell, remap(self.storage.get(cell)));
            }
        }
        self.storage = storage;
    }

    pub fn bits_per_block(&self) -> u8 {
        self.storage.bits()
    }

    /// The packed words; empty when the width is 0.
    pub fn word_array(&self) -> &[u32] {
        self.storage.words()
    }

    /// The packed words as little-endian bytes.
    pub fn word_bytes(&self) -> Vec<u8> {
        self.storage.to_le_bytes()
    }

    pub fn palette(&self) -> &[u32] {
        &self.palette
    }

    /// True when every cell holds the same value.
    pub fn is_uniform(&self) -> bool {
        self.palette.len() == 1
    }

    /// Replaces every occurrence of `old` with `new` in place.
    pub fn replace_all(&mut self, old: u32, new: u32) {
        for entry in &mut self.palette {
            if *entry == old {
                *entry = new;
            }
        }
    }

    /// Drops palette entries no cell references and narrows the width.
    /// Surviving entries keep their relative order.
    pub fn collect_garbage(&mut self) {
        let mut used = vec![false; self.palette.len()];
        for cell in 0..VOLUME {
            used[usize::from(self.storage.get(cell))] = true;
        }
        // Entries made equal by replace_all collapse onto their first slot.
        let mut remap = vec![0u16; self.palette.len()];
        let mut palette: Vec<u32> = Vec::with_capacity(self.palette.len());
        for (old, &value) in self.palette.iter().enumerate() {
            if !used[old] {
                continue;
            }
            remap[old] = match palette.iter().position(|&v| v == value) {
                Some(existing) => existing as u16,
                None => {
                    palette.push(value);
                    (palette.len() - 1) as u16
                }
            };
        }
        let bits = bit_packed::bits_for_palette_len(palette.len());
        if palette.len() == self.palette.len() && bits == self.storage.bits() {
            return;
        }
        self.repack(bits, |old| remap[usize::from(old)]);
        self.palette = palette;
    }
}

impl Default for PalettedBlockArray {
    fn default() -> Self {
        Self::new(0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_layer_has_no_words() {
        let layer = PalettedBlockArray::new(7 << 4);
        assert_eq!(layer.bits_per_block(), 0);
        assert!(layer.word_array().is_empty());
        assert_eq!(layer.palette(), &[7 << 4]);
        assert_eq!(layer.get(15, 15, 15), 7 << 4);
    }

    #[test]
    fn test_xzy_index() {
        assert_eq!(PalettedBlockArray::index(1, 0, 0), 256);
        assert_eq!(PalettedBlockArray::index(0, 0, 1), 16);
        assert_eq!(PalettedBlockArray::index(0, 1, 0), 1);
        assert_eq!(PalettedBlockArray::index(15, 15, 15), 4095);
    }

    #[test]
    fn test_width_grows_through_every_step() {
        let mut layer = PalettedBlockArray::new(0);
        let steps = [(2, 1), (3, 2), (5, 3), (9, 4), (17, 5), (33, 6), (65, 8), (257, 16)];
        let mut next_value = 1u32;
        for (palette_len, bits) in steps {
            while layer.palette().len() < palette_len {
                layer.set_at(next_value as usize, next_value);
                next_value += 1;
            }
            assert_eq!(layer.bits_per_block(), bits, "palette of {palette_len}");
        }
        for v in 1..next_value {
            assert_eq!(layer.get_at(v as usize), v);
        }
        assert_eq!(layer.get_at(0), 0);
    }

    #[test]
    fn test_palette_in_first_insertion_order() {
        let mut layer = PalettedBlockArray::new(10);
        layer.set(0, 0, 0, 30);
        layer.set(0, 1, 0, 20);
        layer.set(0, 2, 0, 30);
        assert_eq!(layer.palette(), &[10, 30, 20]);
    }

    #[test]
    fn test_collect_garbage_shrinks() {
        let mut layer = PalettedBlockArray::new(0);
        layer.set(1, 2, 3, 5);
        layer.set(4, 5, 6, 9);
        assert_eq!(layer.bits_per_block(), 2);

        layer.set(1, 2, 3, 0);
        layer.collect_garbage();
        assert_eq!(layer.palette(), &[0, 9]);
        assert_eq!(layer.bits_per_block(), 1);
        assert_eq!(layer.get(4, 5, 6), 9);

        layer.set(4, 5, 6, 0);
        layer.collect_garbage();
        assert!(layer.is_uniform());
        assert_eq!(layer.bits_per_block(), 0);
    }

    #[test]
    fn test_replace_all_then_collect_merges_slots() {
        let mut layer = PalettedBlockArray::new(1);
        layer.set(0, 0, 0, 2);
        layer.replace_all(2, 1);
        layer.collect_garbage();
        assert_eq!(layer.palette(), &[1]);
        assert_eq!(layer.get(0, 0, 0), 1);
    }

    #[test]
    fn test_from_data_roundtrip() {
        let mut layer = PalettedBlockArray::new(0);
        for cell in (0..VOLUME).step_by(3) {
            layer.set_at(cell, (cell % 5) as u32 + 1);
        }
        let rebuilt = PalettedBlockArray::from_data(
            layer.bits_per_block(),
            layer.word_array().to_vec(),
            layer.palette().to_vec(),
        )
        .unwrap();
        assert_eq!(rebuilt, layer);
    }

    #[test]
    fn test_from_data_validation() {
        assert_eq!(
            PalettedBlockArray::from_data(7, vec![], vec![1]),
            Err(PaletteError::InvalidBitsPerBlock(7))
        );
        assert_eq!(
            PalettedBlockArray::from_data(0, vec![], vec![]),
            Err(PaletteError::EmptyPalette)
        );
        assert_eq!(
            PalettedBlockArray::from_data(0, vec![], vec![1, 2]),
            Err(PaletteError::PaletteTooLarge { bits: 0, len: 2 })
        );
        assert_eq!(
            PalettedBlockArray::from_data(1, vec![0; 10], vec![1, 2]),
            Err(PaletteError::WordCountMismatch {
                bits: 1,
                expected: 128,
                actual: 10
            })
        );

        let mut words = vec![0u32; 256];
        words[0] = 0b11;
        assert_eq!(
            PalettedBlockArray::from_data(2, words, vec![1, 2, 3]),
            Err(PaletteError::IndexOutOfRange {
                cell: 0,
                slot: 3,
                palette_len: 3
            })
        );
    }
}
