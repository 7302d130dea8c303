use chunkwire_codec::CodecError;
use chunkwire_world::{SnapshotError, WorldError};

use crate::compression::CompressionError;

/// Errors from preparing a chunk or from the pool around it.
#[derive(Debug, thiserror::Error)]
pub enum PrepError {
    #[error("terrain snapshot unreadable: {0}")]
    Snapshot(#[from] SnapshotError),
    #[error(transparent)]
    World(#[from] WorldError),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Compression(#[from] CompressionError),
    #[error("chunk preparation panicked: {0}")]
    Panicked(String),
    #[error("promise already resolved")]
    AlreadyResolved,
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] std::io::Error),
}
