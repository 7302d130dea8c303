//! Legacy block id ↔ runtime id mapping for one protocol bucket.
//!
//! Built from the canonical state table plus a legacy map: a stream of
//! `(varuint legacy_id, u16 LE meta, network-NBT state)` records. Each record
//! is matched to the first canonical state that is structurally equal to it.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use chunkwire_nbt::{ByteReader, CompoundTag, NbtFlavor};
use chunkwire_world::{full_block_id, split_full_block_id};
use rustc_hash::FxHashMap;

use crate::{BlockStateRegistry, LegacyBlockIdMap, MappingError, ProtocolBucket};

/// Legacy id of `minecraft:info_update`, shown for blocks a bucket cannot map.
pub const INFO_UPDATE_LEGACY_ID: u32 = 248;

/// One record of the legacy map stream.
#[derive(Debug, Clone, PartialEq)]
pub struct LegacyMapEntry {
    pub legacy_id: u32,
    pub meta: u16,
    pub state: CompoundTag,
}

/// Reads every record of a legacy map stream. `path` only labels errors.
pub fn read_legacy_map(bytes: &[u8], path: &Path) -> Result<Vec<LegacyMapEntry>, MappingError> {
    let nbt_error = |source| MappingError::Nbt {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = ByteReader::new(bytes);
    let mut entries = Vec::new();
    while !reader.feof() {
        let legacy_id = reader.get_unsigned_varint().map_err(nbt_error)?;
        let meta = reader.get_lushort().map_err(nbt_error)?;
        let state = chunkwire_nbt::read_root_from(&mut reader, NbtFlavor::Network).map_err(nbt_error)?;
        entries.push(LegacyMapEntry {
            legacy_id,
            meta,
            state,
        });
    }
    Ok(entries)
}

/// Bidirectional full block id ↔ runtime id tables for one bucket.
///
/// Read-only after [`build`](Self::build); safe to share across threads.
#[derive(Debug)]
pub struct RuntimeBlockMapping {
    bucket: ProtocolBucket,
    registry: BlockStateRegistry,
    legacy_to_runtime: FxHashMap<u32, u32>,
    runtime_to_legacy: FxHashMap<u32, u32>,
    placeholder: u32,
}

impl RuntimeBlockMapping {
    /// Loads the bucket's state table and legacy map from `data_dir`.
    pub fn load(
        bucket: ProtocolBucket,
        data_dir: &Path,
        legacy_ids: &LegacyBlockIdMap,
    ) -> Result<Self, MappingError> {
        let start = Instant::now();
        let registry = BlockStateRegistry::load(&bucket.canonical_states_path(data_dir))?;

        let map_path = bucket.legacy_map_path(data_dir);
        let bytes = std::fs::read(&map_path).map_err(|e| MappingError::io(&map_path, e))?;
        let entries = read_legacy_map(&bytes, &map_path)?;

        let mapping = Self::build(bucket, registry, legacy_ids, entries)?;
        let stats = mapping.registry.pool_stats();
        tracing::info!(
            bucket = %bucket,
            states = mapping.registry.len(),
            mapped = mapping.legacy_to_runtime.len(),
            pooled_compounds = stats.compounds,
            pooled_strings = stats.strings,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Built runtime block mapping"
        );
        Ok(mapping)
    }

    /// Matches legacy map records against `registry`.
    ///
    /// Fails when a legacy id has no string id, when a record's state name is
    /// absent from the table, when no same-named state is structurally equal
    /// to the record, or when the placeholder block ends up unmapped. Records
    /// with metadata above 15 are skipped.
    pub fn build(
        bucket: ProtocolBucket,
        registry: BlockStateRegistry,
        legacy_ids: &LegacyBlockIdMap,
        entries: Vec<LegacyMapEntry>,
    ) -> Result<Self, MappingError> {
        let mut legacy_to_runtime = FxHashMap::default();
        let mut runtime_to_legacy = FxHashMap::default();
        let mut skipped = 0usize;

        for entry in entries {
            if legacy_ids.legacy_to_string(entry.legacy_id).is_none() {
                return Err(MappingError::UnknownLegacyId {
                    legacy_id: entry.legacy_id,
                });
            }
            if entry.meta > 15 {
                skipped += 1;
                continue;
            }

            let name = entry.state.get_string("name").unwrap_or_default();
            let runtime_id = registry
                .candidates(name)
                .iter()
                .copied()
                .find(|&candidate| {
                    registry
                        .state(candidate)
                        .is_some_and(|state| **state == entry.state)
                })
                .ok_or_else(|| MappingError::StateNotInTable {
                    legacy_id: entry.legacy_id,
                    meta: entry.meta,
                    name: name.to_string(),
                })?;

            let full_id = full_block_id(entry.legacy_id, entry.meta as u8);
            legacy_to_runtime.insert(full_id, runtime_id);
            runtime_to_legacy.insert(runtime_id, full_id);
        }

        if skipped > 0 {
            tracing::debug!(bucket = %bucket, skipped, "Skipped legacy entries with metadata above 15");
        }

        let placeholder = legacy_to_runtime
            .get(&full_block_id(INFO_UPDATE_LEGACY_ID, 0))
            .copied()
            .ok_or_else(|| MappingError::MissingPlaceholder {
                bucket: bucket.to_string(),
            })?;

        Ok(Self {
            bucket,
            registry,
            legacy_to_runtime,
            runtime_to_legacy,
            placeholder,
        })
    }

    pub fn bucket(&self) -> ProtocolBucket {
        self.bucket
    }

    /// Runtime id for a full block id, or the placeholder when unmapped.
    pub fn to_runtime_id(&self, full_id: u32) -> u32 {
        self.legacy_to_runtime
            .get(&full_id)
            .copied()
            .unwrap_or(self.placeholder)
    }

    /// Same as [`to_runtime_id`](Self::to_runtime_id) with split id and meta.
    pub fn to_runtime_id_parts(&self, legacy_id: u32, meta: u8) -> u32 {
        self.to_runtime_id(full_block_id(legacy_id, meta))
    }

    /// Full block id a runtime id was built from.
    pub fn from_runtime_id(&self, runtime_id: u32) -> Result<u32, MappingError> {
        self.runtime_to_legacy
            .get(&runtime_id)
            .copied()
            .ok_or(MappingError::UnknownRuntimeId(runtime_id))
    }

    /// `(legacy_id, meta)` a runtime id was built from.
    pub fn from_runtime_id_parts(&self, runtime_id: u32) -> Result<(u32, u8), MappingError> {
        self.from_runtime_id(runtime_id).map(split_full_block_id)
    }

    /// Canonical state sent for a full block id.
    pub fn state_for(&self, full_id: u32) -> &Arc<CompoundTag> {
        let runtime_id = self.to_runtime_id(full_id);
        // Every mapped runtime id, the placeholder included, indexes the registry.
        &self.registry.states()[runtime_id as usize]
    }

    pub fn placeholder_runtime_id(&self) -> u32 {
        self.placeholder
    }

    pub fn registry(&self) -> &BlockStateRegistry {
        &self.registry
    }

    /// Number of mapped full block ids.
    pub fn len(&self) -> usize {
        self.legacy_to_runtime.len()
    }

    pub fn is_empty(&self) -> bool {
        self.legacy_to_runtime.is_empty()
    }

    /// Runtime ids with a reverse mapping.
    pub fn runtime_ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.runtime_to_legacy.keys().copied()
    }
}

// ---- Tests ----
