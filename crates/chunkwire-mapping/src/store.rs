//! Per-bucket table store.
//!
//! Tables are immutable once built. Each bucket is built at most once, even
//! when many threads ask for it at the same time: the first caller builds
//! while holding that bucket's build lock, later callers get the shared `Arc`.
//! The map itself is only locked long enough to fetch a bucket's slot, so a
//! slow build never blocks lookups of other buckets.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::time::Instant;

use dashmap::DashMap;

use crate::{
    ItemTypeDictionary, LegacyBiomeIdMap, LegacyBlockIdMap, MappingError, ProtocolBucket,
    RuntimeBlockMapping,
};

/// Shared legacy id table file names.
pub const BLOCK_ID_MAP_FILE: &str = "block_id_map.json";
pub const BIOME_ID_MAP_FILE: &str = "biome_id_map.json";

/// Everything the codec needs for one protocol bucket.
#[derive(Debug)]
pub struct ProtocolTables {
    pub bucket: ProtocolBucket,
    pub blocks: RuntimeBlockMapping,
    pub items: ItemTypeDictionary,
}

impl ProtocolTables {
    pub fn load(
        bucket: ProtocolBucket,
        data_dir: &Path,
        block_ids: &LegacyBlockIdMap,
    ) -> Result<Self, MappingError> {
        let blocks = RuntimeBlockMapping::load(bucket, data_dir, block_ids)?;
        let items = ItemTypeDictionary::load(&bucket.item_list_path(data_dir))?;
        Ok(Self {
            bucket,
            blocks,
            items,
        })
    }
}

#[derive(Default)]
struct BucketSlot {
    built: OnceLock<Arc<ProtocolTables>>,
    building: Mutex<()>,
}

/// Owns the data directory, the shared legacy id maps and every built bucket.
pub struct MappingStore {
    data_dir: PathBuf,
    block_ids: Arc<LegacyBlockIdMap>,
    biome_ids: Arc<LegacyBiomeIdMap>,
    tables: DashMap<ProtocolBucket, Arc<BucketSlot>>,
}

impl MappingStore {
    /// Loads the shared legacy id maps. Bucket tables are built on demand.
    pub fn open(data_dir: impl Into<PathBuf>) -> Result<Self, MappingError> {
        let data_dir = data_dir.into();
        let block_ids = LegacyBlockIdMap::load(&data_dir.join(BLOCK_ID_MAP_FILE))?;
        let biome_ids = LegacyBiomeIdMap::load(&data_dir.join(BIOME_ID_MAP_FILE))?;
        tracing::info!(
            data_dir = %data_dir.display(),
            block_ids = block_ids.len(),
            biome_ids = biome_ids.len(),
            "Loaded legacy id maps"
        );
        Ok(Self {
            data_dir,
            block_ids: Arc::new(block_ids),
            biome_ids: Arc::new(biome_ids),
            tables: DashMap::new(),
        })
    }

    /// Tables for a client protocol number.
    pub fn tables(&self, protocol: u32) -> Result<Arc<ProtocolTables>, MappingError> {
        self.tables_for_bucket(ProtocolBucket::for_protocol(protocol)?)
    }

    /// Tables for a bucket, building them on first use.
    pub fn tables_for_bucket(&self, bucket: ProtocolBucket) -> Result<Arc<ProtocolTables>, MappingError> {
        let slot = Arc::clone(self.tables.entry(bucket).or_default().value());
        if let Some(tables) = slot.built.get() {
            return Ok(Arc::clone(tables));
        }

        let _guard = slot.building.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(tables) = slot.built.get() {
            return Ok(Arc::clone(tables));
        }
        let start = Instant::now();
        let tables = Arc::new(ProtocolTables::load(bucket, &self.data_dir, &self.block_ids)?);
        tracing::info!(
            bucket = %bucket,
            items = tables.items.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Protocol tables ready"
        );
        Ok(Arc::clone(slot.built.get_or_init(|| tables)))
    }

    /// Builds the tables for every listed protocol now.
    pub fn preload(&self, protocols: &[u32]) -> Result<(), MappingError> {
        for &protocol in protocols {
            self.tables(protocol)?;
        }
        Ok(())
    }

    /// Buckets built so far, oldest first.
    pub fn loaded_buckets(&self) -> Vec<ProtocolBucket> {
        let mut buckets: Vec<_> = self
            .tables
            .iter()
            .filter(|e| e.value().built.get().is_some())
            .map(|e| *e.key())
            .collect();
        buckets.sort();
        buckets
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn block_ids(&self) -> &Arc<LegacyBlockIdMap> {
        &self.block_ids
    }

    pub fn biome_ids(&self) -> &Arc<LegacyBiomeIdMap> {
        &self.biome_ids
    }
}

// ---- Tests ----

#[cfg(test)]
mod tests {
    use super::*;
    use chunkwire_nbt::{ByteWriter, CompoundTag, NbtFlavor, Tag};

    fn state(name: &str) -> CompoundTag {
        CompoundTag::new()
            .with("name", Tag::string(name))
            .with("states", Tag::compound(CompoundTag::new()))
            .with("version", Tag::Int(17_959_425))
    }

    /// Writes a minimal but complete data directory for `bucket`.
    fn write_data_dir(dir: &Path, bucket: ProtocolBucket) {
        std::fs::write(
            dir.join(BLOCK_ID_MAP_FILE),
            r#"{"minecraft:air": 0, "minecraft:stone": 1, "minecraft:info_update": 248}"#,
        )
        .unwrap();
        std::fs::write(dir.join(BIOME_ID_MAP_FILE), r#"{"ocean": 0, "plains": 1}"#).unwrap();

        let names = ["minecraft:air", "minecraft:stone", "minecraft:info_update"];
        let mut states = Vec::new();
        for name in names {
            chunkwire_nbt::write_root(&mut states, &state(name), NbtFlavor::Network).unwrap();
        }
        std::fs::write(bucket.canonical_states_path(dir), states).unwrap();

        let mut map = Vec::new();
        for (legacy_id, name) in [(0u32, names[0]), (1, names[1]), (248, names[2])] {
            map.put_unsigned_varint(legacy_id);
            map.put_lushort(0);
            chunkwire_nbt::write_root(&mut map, &state(name), NbtFlavor::Network).unwrap();
        }
        std::fs::write(bucket.legacy_map_path(dir), map).unwrap();

        std::fs::write(
            bucket.item_list_path(dir),
            r#"{"minecraft:stone": {"runtime_id": 1, "component_based": false}}"#,
        )
        .unwrap();
    }

    #[test]
    fn test_open_and_build_current() {
        let dir = tempfile::tempdir().unwrap();
        write_data_dir(dir.path(), ProtocolBucket::CURRENT);
        let store = MappingStore::open(dir.path()).unwrap();

        let tables = store.tables(486).unwrap();
        assert_eq!(tables.bucket, ProtocolBucket::CURRENT);
        assert_eq!(tables.blocks.to_runtime_id_parts(1, 0), 1);
        assert_eq!(tables.blocks.placeholder_runtime_id(), 2);
        assert_eq!(tables.items.from_string_id("minecraft:stone"), Some(1));
        assert_eq!(store.biome_ids().legacy_to_string(1), Some("plains"));
    }

    #[test]
    fn test_tables_built_once() {
        let dir = tempfile::tempdir().unwrap();
        write_data_dir(dir.path(), ProtocolBucket::CURRENT);
        let store = Arc::new(MappingStore::open(dir.path()).unwrap());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || store.tables(500).unwrap())
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for tables in &results[1..] {
            assert!(Arc::ptr_eq(&results[0], tables));
        }
        assert_eq!(store.loaded_buckets(), vec![ProtocolBucket::CURRENT]);
    }

    #[test]
    fn test_preload_reports_missing_bucket_files() {
        let dir = tempfile::tempdir().unwrap();
        write_data_dir(dir.path(), ProtocolBucket::CURRENT);
        let store = MappingStore::open(dir.path()).unwrap();

        assert!(store.preload(&[486]).is_ok());
        let err = store.preload(&[475]).unwrap_err();
        assert!(matches!(err, MappingError::Io { .. }));
        assert_eq!(store.loaded_buckets(), vec![ProtocolBucket::CURRENT]);
    }

    #[test]
    fn test_failed_build_is_retried() {
        let dir = tempfile::tempdir().unwrap();
        write_data_dir(dir.path(), ProtocolBucket::CURRENT);
        let store = MappingStore::open(dir.path()).unwrap();
        let current = store.tables(486).unwrap();

        let older = ProtocolBucket::for_protocol(475).unwrap();
        assert!(store.tables(475).is_err());
        assert_eq!(store.loaded_buckets(), vec![ProtocolBucket::CURRENT]);

        write_data_dir(dir.path(), older);
        let tables = store.tables(475).unwrap();
        assert_eq!(tables.bucket, older);
        assert!(Arc::ptr_eq(&current, &store.tables(486).unwrap()));
        assert_eq!(store.loaded_buckets(), vec![older, ProtocolBucket::CURRENT]);
    }

    #[test]
    fn test_old_protocol_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write_data_dir(dir.path(), ProtocolBucket::CURRENT);
        let store = MappingStore::open(dir.path()).unwrap();
        assert!(matches!(
            store.tables(100),
            Err(MappingError::UnsupportedProtocol(100))
        ));
    }

    #[test]
    fn test_open_without_legacy_maps_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            MappingStore::open(dir.path()),
            Err(MappingError::Io { .. })
        ));
    }
}
