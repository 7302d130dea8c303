//! In-memory chunk model consumed by the wire codec.
//!
//! Chunks are columns of 16³ sub-chunks whose layers are palette-compressed
//! [`PalettedBlockArray`]s of full block ids (`legacy_id << 4 | meta`).

pub mod bit_packed;
pub mod chunk;
pub mod dimension;
pub mod paletted;
pub mod snapshot;
pub mod sub_chunk;
pub mod tile;

pub use chunk::{AIR, BIOME_COLUMNS, Chunk, full_block_id, split_full_block_id};
pub use dimension::{Dimension, SubChunkRange, WorldError};
pub use paletted::{PaletteError, PalettedBlockArray};
pub use snapshot::{SnapshotError, deserialize_terrain, serialize_terrain};
pub use sub_chunk::SubChunk;
pub use tile::Tile;
