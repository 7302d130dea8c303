//! Binary terrain snapshots.
//!
//! A snapshot is an owned, immutable copy of a chunk's blocks and biomes that
//! can cross threads and be rebuilt into a working [`Chunk`]. Tiles are not
//! included.
//!
//! ## Binary Layout
//!
//! | Size | Field |
//! |------|-------|
//! | 4 | Magic bytes `"CWTS"` |
//! | 1 | Format version (`u8`, currently 1) |
//! | 4 | Lowest sub-chunk index (`i32` LE) |
//! | 4 | Highest sub-chunk index (`i32` LE) |
//! | … | One record per sub-chunk, bottom up |
//! | 256 | Biome id per column |
//!
//! Sub-chunk record: empty block id (`u32` LE), layer count (`u8`), then per
//! layer: bits per block (`u8`), the packed words (`u32` LE, count implied by
//! the width), palette length (`u16` LE), palette entries (`u32` LE).

use chunkwire_nbt::{ByteReader, ByteWriter, NbtError};

use crate::bit_packed;
use crate::chunk::{BIOME_COLUMNS, Chunk};
use crate::dimension::{SubChunkRange, WorldError};
use crate::paletted::{PaletteError, PalettedBlockArray, VOLUME};
use crate::sub_chunk::SubChunk;

/// Magic bytes identifying a terrain snapshot.
const MAGIC: [u8; 4] = *b"CWTS";

/// Current format version.
const FORMAT_VERSION: u8 = 1;

/// Errors that can occur while decoding a snapshot.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// The data does not start with the expected magic bytes.
    #[error("invalid magic bytes")]
    InvalidMagic,
    /// The format version is not supported by this build.
    #[error("unsupported format version: {0}")]
    UnsupportedVersion(u8),
    /// The data ended early or held an unreadable field.
    #[error("malformed snapshot: {0}")]
    Stream(#[from] NbtError),
    #[error("invalid sub-chunk range: {0}")]
    InvalidRange(#[from] WorldError),
    /// A layer failed palette validation.
    #[error("sub-chunk {index}: {source}")]
    InvalidLayer {
        index: i32,
        #[source]
        source: PaletteError,
    },
    /// Bytes remained after the biome table.
    #[error("{0} trailing bytes after snapshot")]
    TrailingBytes(usize),
    /// A sub-chunk has more layers than the count byte can hold.
    #[error("sub-chunk {index} has {count} layers")]
    TooManyLayers { index: i32, count: usize },
}

/// Encodes the blocks and biomes of `chunk`.
pub fn serialize_terrain(chunk: &Chunk) -> Result<Vec<u8>, SnapshotError> {
    let range = chunk.range();
    let mut buf = Vec::with_capacity(16 + range.len() * 8 + BIOME_COLUMNS);

    buf.put_bytes(&MAGIC);
    buf.put_byte(FORMAT_VERSION);
    buf.put_lint(range.min());
    buf.put_lint(range.max());

    for (index, sub) in chunk.sub_chunks() {
        let count = sub.layers().len();
        let layer_count =
            u8::try_from(count).map_err(|_| SnapshotError::TooManyLayers { index, count })?;
        buf.put_luint(sub.empty_block_id());
        buf.put_byte(layer_count);
        for layer in sub.layers() {
            buf.put_byte(layer.bits_per_block());
            buf.put_bytes(&layer.word_bytes());
            buf.put_lushort(layer.palette().len() as u16);
            for &value in layer.palette() {
                buf.put_luint(value);
            }
        }
    }

    buf.put_bytes(chunk.biome_ids());
    Ok(buf)
}

/// Rebuilds a tile-less [`Chunk`] from [`serialize_terrain`] output.
pub fn deserialize_terrain(data: &[u8]) -> Result<Chunk, SnapshotError> {
    if data.len() < 4 || data[0..4] != MAGIC {
        return Err(SnapshotError::InvalidMagic);
    }
    let mut reader = ByteReader::new(&data[4..]);

    let version = reader.get_byte()?;
    if version != FORMAT_VERSION {
        return Err(SnapshotError::UnsupportedVersion(version));
    }

    let min = reader.get_lint()?;
    let max = reader.get_lint()?;
    let range = SubChunkRange::new(min, max)?;
    let mut chunk = Chunk::new(range);

    for index in range.iter() {
        let empty_block_id = reader.get_luint()?;
        let layer_count = reader.get_byte()?;
        let mut layers = Vec::with_capacity(usize::from(layer_count));
        for _ in 0..layer_count {
            layers.push(read_layer(&mut reader, index)?);
        }
        chunk.set_sub_chunk(index, SubChunk::new(empty_block_id, layers))?;
    }

    let mut biomes = [0u8; BIOME_COLUMNS];
    biomes.copy_from_slice(reader.get_bytes(BIOME_COLUMNS)?);
    chunk.set_biome_ids(biomes);

    if !reader.feof() {
        return Err(SnapshotError::TrailingBytes(reader.remaining()));
    }
    Ok(chunk)
}

fn read_layer(reader: &mut ByteReader<'_>, index: i32) -> Result<PalettedBlockArray, SnapshotError> {
    let invalid = |source| SnapshotError::InvalidLayer { index, source };

    let bits = reader.get_byte()?;
    if !bit_packed::is_valid_bits(bits) {
        return Err(invalid(PaletteError::InvalidBitsPerBlock(bits)));
    }
    let word_count = bit_packed::word_count(bits, VOLUME);
    let mut words = Vec::with_capacity(word_count);
    for _ in 0..word_count {
        words.push(reader.get_luint()?);
    }
    let palette_len = reader.get_lushort()?;
    let mut palette = Vec::with_capacity(usize::from(palette_len));
    for _ in 0..palette_len {
        palette.push(reader.get_luint()?);
    }
    PalettedBlockArray::from_data(bits, words, palette).map_err(invalid)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
