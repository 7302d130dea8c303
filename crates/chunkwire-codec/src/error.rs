//! Codec error type.

use chunkwire_mapping::MappingError;
use chunkwire_nbt::NbtError;
use chunkwire_world::PaletteError;

/// Errors raised while encoding or decoding chunk payloads.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("unsupported bits per block: {0}")]
    InvalidBitsPerBlock(u8),

    #[error("sub-chunk has {0} layers, at most 255 fit the count byte")]
    TooManyLayers(usize),

    #[error("unsupported sub-chunk version {0}")]
    UnsupportedSubChunkVersion(u8),

    #[error("palette of {len} entries is invalid for {bits} bits per block")]
    InvalidPaletteLength { bits: u8, len: usize },

    #[error("malformed payload: {0}")]
    Stream(#[from] NbtError),

    #[error(transparent)]
    Palette(#[from] PaletteError),

    #[error(transparent)]
    Mapping(#[from] MappingError),

    #[error("biome palettes must carry integer ids")]
    PersistentBiomePalette,

    #[error("palette state {0} is not in the canonical state table")]
    UnknownState(String),
}
