//! Paletted layer encoding.
//!
//! Wire layout of one layer:
//!
//! ```text
//! u8      (bits_per_block << 1) | runtime_flag
//! u32 LE  word array, floor(32 / bits) indices per word
//! varuint palette_len << 1            (absent when bits_per_block == 0)
//! entries varuint(runtime_id << 1)    (runtime_flag = 1)
//!         network NBT state           (runtime_flag = 0)
//! ```
//!
//! Counts and ids are written as the unsigned magnitude shifted left by one.
//! Clients read them as zigzag varints, which decode identically for
//! non-negative values.

use chunkwire_mapping::RuntimeBlockMapping;
use chunkwire_nbt::{ByteReader, ByteWriter, CompoundTag, NbtFlavor};
use chunkwire_world::bit_packed;
use chunkwire_world::paletted::{PalettedBlockArray, VOLUME};

use crate::CodecError;
use crate::serializer::SUB_CHUNK_VERSION;

/// How palette entries are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaletteEncoding {
    /// Full block state compounds, for storage.
    Persistent,
    /// Runtime ids of the target protocol bucket, for the network.
    #[default]
    Runtime,
}

impl PaletteEncoding {
    /// Low bit of the header byte.
    pub fn flag(self) -> u8 {
        match self {
            Self::Persistent => 0,
            Self::Runtime => 1,
        }
    }
}

/// Appends one block layer. Palette values are full block ids.
pub fn encode_block_layer(
    out: &mut Vec<u8>,
    layer: &PalettedBlockArray,
    blocks: &RuntimeBlockMapping,
    encoding: PaletteEncoding,
) -> Result<(), CodecError> {
    let bits = layer.bits_per_block();
    out.put_byte((bits << 1) | encoding.flag());
    out.put_bytes(&layer.word_bytes());

    let palette = layer.palette();
    if bits != 0 {
        out.put_unsigned_varint((palette.len() as u32) << 1);
    }
    match encoding {
        PaletteEncoding::Persistent => {
            for &full_id in palette {
                chunkwire_nbt::write_root(out, blocks.state_for(full_id), NbtFlavor::Network)?;
            }
        }
        PaletteEncoding::Runtime => {
            for &full_id in palette {
                out.put_unsigned_varint(blocks.to_runtime_id(full_id) << 1);
            }
        }
    }
    Ok(())
}

/// Appends one biome layer. Biomes are always runtime-flagged integer ids.
pub fn encode_biome_palette(out: &mut Vec<u8>, layer: &PalettedBlockArray) {
    let bits = layer.bits_per_block();
    out.put_byte((bits << 1) | PaletteEncoding::Runtime.flag());
    out.put_bytes(&layer.word_bytes());

    let palette = layer.palette();
    if bits != 0 {
        out.put_unsigned_varint((palette.len() as u32) << 1);
    }
    for &biome in palette {
        out.put_unsigned_varint(biome << 1);
    }
}

/// Palette entries as they appeared on the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedPalette {
    RuntimeIds(Vec<u32>),
    States(Vec<CompoundTag>),
}

impl DecodedPalette {
    pub fn len(&self) -> usize {
        match self {
            Self::RuntimeIds(ids) => ids.len(),
            Self::States(states) => states.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn encoding(&self) -> PaletteEncoding {
        match self {
            Self::RuntimeIds(_) => PaletteEncoding::Runtime,
            Self::States(_) => PaletteEncoding::Persistent,
        }
    }
}

/// One decoded layer.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedLayer {
    pub bits_per_block: u8,
    pub words: Vec<u32>,
    pub palette: DecodedPalette,
}

impl DecodedLayer {
    /// The packed indices with runtime ids as values. Persistent layers are
    /// resolved to runtime ids through `blocks`' state table.
    pub fn runtime_layer(&self, blocks: &RuntimeBlockMapping) -> Result<PalettedBlockArray, CodecError> {
        let palette = match &self.palette {
            DecodedPalette::RuntimeIds(ids) => ids.clone(),
            DecodedPalette::States(states) => states
                .iter()
                .map(|state| runtime_id_of_state(blocks, state))
                .collect::<Result<_, _>>()?,
        };
        Ok(PalettedBlockArray::from_data(
            self.bits_per_block,
            self.words.clone(),
            palette,
        )?)
    }

    /// The layer with full block ids as values.
    pub fn block_layer(&self, blocks: &RuntimeBlockMapping) -> Result<PalettedBlockArray, CodecError> {
        let runtime = self.runtime_layer(blocks)?;
        let palette = runtime
            .palette()
            .iter()
            .map(|&id| blocks.from_runtime_id(id))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(PalettedBlockArray::from_data(
            self.bits_per_block,
            self.words.clone(),
            palette,
        )?)
    }
}

fn runtime_id_of_state(blocks: &RuntimeBlockMapping, state: &CompoundTag) -> Result<u32, CodecError> {
    let registry = blocks.registry();
    let name = state.get_string("name").unwrap_or_default();
    registry
        .candidates(name)
        .iter()
        .copied()
        .find(|&id| registry.state(id).is_some_and(|s| **s == *state))
        .ok_or_else(|| CodecError::UnknownState(name.to_string()))
}

/// Reads one layer at the reader's position.
///
/// Rejects unsupported widths, palettes that cannot fit the width and index
/// arrays that reference missing palette slots. Padding bits are ignored.
pub fn decode_layer(reader: &mut ByteReader<'_>) -> Result<DecodedLayer, CodecError> {
    let header = reader.get_byte()?;
    let bits = header >> 1;
    if !bit_packed::is_valid_bits(bits) {
        return Err(CodecError::InvalidBitsPerBlock(bits));
    }
    let runtime = header & 1 == PaletteEncoding::Runtime.flag();

    let word_count = bit_packed::word_count(bits, VOLUME);
    let mut words = Vec::with_capacity(word_count);
    for _ in 0..word_count {
        words.push(reader.get_luint()?);
    }

    let len = if bits == 0 {
        1
    } else {
        (reader.get_unsigned_varint()? >> 1) as usize
    };
    if len == 0 || len > (1usize << bits) {
        return Err(CodecError::InvalidPaletteLength { bits, len });
    }

    let palette = if runtime {
        let mut ids = Vec::with_capacity(len);
        for _ in 0..len {
            ids.push(reader.get_unsigned_varint()? >> 1);
        }
        DecodedPalette::RuntimeIds(ids)
    } else {
        let mut states = Vec::with_capacity(len);
        for _ in 0..len {
            states.push(chunkwire_nbt::read_root_from(reader, NbtFlavor::Network)?);
        }
        DecodedPalette::States(states)
    };

    // Validate indices against the palette without resolving any values.
    let placeholder = (0..len as u32).collect();
    PalettedBlockArray::from_data(bits, words.clone(), placeholder)?;

    Ok(DecodedLayer {
        bits_per_block: bits,
        words,
        palette,
    })
}

/// A decoded sub-chunk: its layers bottom to top.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedSubChunk {
    pub layers: Vec<DecodedLayer>,
}

/// Reads one version-8 sub-chunk.
pub fn decode_sub_chunk(reader: &mut ByteReader<'_>) -> Result<DecodedSubChunk, CodecError> {
    let version = reader.get_byte()?;
    if version != SUB_CHUNK_VERSION {
        return Err(CodecError::UnsupportedSubChunkVersion(version));
    }
    let count = reader.get_byte()?;
    let mut layers = Vec::with_capacity(usize::from(count));
    for _ in 0..count {
        layers.push(decode_layer(reader)?);
    }
    Ok(DecodedSubChunk { layers })
}

/// Reads one biome layer, returning biome ids as values.
pub fn decode_biome_palette(reader: &mut ByteReader<'_>) -> Result<PalettedBlockArray, CodecError> {
    let layer = decode_layer(reader)?;
    match layer.palette {
        DecodedPalette::RuntimeIds(ids) => Ok(PalettedBlockArray::from_data(
            layer.bits_per_block,
            layer.words,
            ids,
        )?),
        DecodedPalette::States(_) => Err(CodecError::PersistentBiomePalette),
    }
}

// ---- Tests ----
