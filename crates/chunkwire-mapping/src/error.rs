//! Errors raised while loading or querying mapping tables.
//!
//! Everything except [`MappingError::UnknownRuntimeId`] is a construction-time
//! failure: the affected protocol bucket cannot be served.

use std::path::PathBuf;

use chunkwire_nbt::NbtError;

#[derive(Debug, thiserror::Error)]
pub enum MappingError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed JSON table {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("malformed NBT stream {path}: {source}")]
    Nbt {
        path: PathBuf,
        #[source]
        source: NbtError,
    },

    #[error("protocol {0} is older than every supported data bucket")]
    UnsupportedProtocol(u32),

    #[error("canonical state #{index} has no string \"name\" attribute")]
    UnnamedState { index: usize },

    #[error("{path}: id {legacy_id} is mapped to both {first} and {second}")]
    DuplicateLegacyId {
        path: PathBuf,
        legacy_id: u32,
        first: String,
        second: String,
    },

    #[error("legacy block id {legacy_id} has no string id")]
    UnknownLegacyId { legacy_id: u32 },

    #[error("legacy block {legacy_id}:{meta} maps to {name}, which is not in the canonical state table")]
    StateNotInTable {
        legacy_id: u32,
        meta: u16,
        name: String,
    },

    #[error("mapping table for {bucket} does not map the placeholder block")]
    MissingPlaceholder { bucket: String },

    #[error("{path}: runtime id {runtime_id} is used by both {first} and {second}")]
    DuplicateItemRuntimeId {
        path: PathBuf,
        runtime_id: i32,
        first: String,
        second: String,
    },

    #[error("runtime id {0} was not produced by this mapping")]
    UnknownRuntimeId(u32),
}

impl MappingError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
