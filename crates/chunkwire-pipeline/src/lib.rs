//! Off-thread chunk preparation.
//!
//! A [`ChunkPrepRequest`] snapshots a chunk on the calling thread. A
//! [`ChunkPrepPool`] worker serializes the snapshot for the request's protocol
//! bucket, hashes and compresses the pieces into a [`CachedChunk`], and the
//! result is handed back through a [`Promise`].

pub mod cached_chunk;
pub mod compression;
mod error;
pub mod pool;
pub mod promise;
pub mod request;

pub use cached_chunk::{CachedBlob, CachedChunk, content_hash};
pub use compression::{
    CompressionError, Compressor, DeflateCompressor, Lz4Compressor, compressor_from_config,
};
pub use error::PrepError;
pub use pool::{ChunkPrepPool, ErrorCallback, PrepHandle, PrepState};
pub use promise::Promise;
pub use request::ChunkPrepRequest;
