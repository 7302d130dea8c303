//! Canonical block state table for one protocol bucket.
//!
//! The table is a stream of network-NBT compounds; a state's position in the
//! stream is its runtime id for that bucket.

use std::path::Path;
use std::sync::Arc;

use chunkwire_nbt::{CompoundTag, NbtFlavor, PoolStats, TagPool};
use rustc_hash::FxHashMap;

use crate::MappingError;

/// Ordered, deduplicated canonical block states.
#[derive(Debug)]
pub struct BlockStateRegistry {
    states: Vec<Arc<CompoundTag>>,
    by_name: FxHashMap<Arc<str>, Vec<u32>>,
    pool_stats: PoolStats,
}

impl BlockStateRegistry {
    pub fn load(path: &Path) -> Result<Self, MappingError> {
        let bytes = std::fs::read(path).map_err(|e| MappingError::io(path, e))?;
        Self::from_bytes(&bytes, path)
    }

    /// Parses a state stream. `path` only labels errors.
    pub fn from_bytes(bytes: &[u8], path: &Path) -> Result<Self, MappingError> {
        let roots = chunkwire_nbt::read_multiple(bytes, NbtFlavor::Network).map_err(|source| {
            MappingError::Nbt {
                path: path.to_path_buf(),
                source,
            }
        })?;
        Self::from_states(roots)
    }

    /// Builds the table from states already in runtime id order.
    pub fn from_states(states: Vec<CompoundTag>) -> Result<Self, MappingError> {
        let mut pool = TagPool::new();
        let mut pooled = Vec::with_capacity(states.len());
        let mut by_name: FxHashMap<Arc<str>, Vec<u32>> = FxHashMap::default();

        for (index, state) in states.iter().enumerate() {
            let state = pool.intern(state);
            let name = match state.get("name") {
                Some(chunkwire_nbt::Tag::String(name)) => Arc::clone(name),
                _ => return Err(MappingError::UnnamedState { index }),
            };
            by_name.entry(name).or_default().push(index as u32);
            pooled.push(state);
        }

        Ok(Self {
            states: pooled,
            by_name,
            pool_stats: pool.stats(),
        })
    }

    /// State for a runtime id.
    pub fn state(&self, runtime_id: u32) -> Option<&Arc<CompoundTag>> {
        self.states.get(runtime_id as usize)
    }

    /// All states in runtime id order.
    pub fn states(&self) -> &[Arc<CompoundTag>] {
        &self.states
    }

    /// Runtime ids of every state whose `name` is `name`, ascending.
    pub fn candidates(&self, name: &str) -> &[u32] {
        self.by_name.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Distinct keys, strings and compounds left after deduplication.
    pub fn pool_stats(&self) -> PoolStats {
        self.pool_stats
    }
}
