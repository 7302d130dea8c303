//! Bidirectional legacy numeric id ↔ string id tables.
//!
//! Loaded from JSON objects shaped `{"minecraft:stone": 1, ...}`. The same
//! shape serves blocks (`block_id_map.json`) and biomes (`biome_id_map.json`).

use std::path::Path;

use rustc_hash::FxHashMap;

use crate::MappingError;

/// Legacy id table for blocks.
pub type LegacyBlockIdMap = LegacyIdMap;
/// Legacy id table for biomes.
pub type LegacyBiomeIdMap = LegacyIdMap;

#[derive(Debug, Clone, Default)]
pub struct LegacyIdMap {
    legacy_to_string: FxHashMap<u32, String>,
    string_to_legacy: FxHashMap<String, u32>,
}

impl LegacyIdMap {
    pub fn load(path: &Path) -> Result<Self, MappingError> {
        let json = std::fs::read_to_string(path).map_err(|e| MappingError::io(path, e))?;
        Self::from_json_str(&json, path)
    }

    /// Parses a JSON table. `path` only labels errors.
    pub fn from_json_str(json: &str, path: &Path) -> Result<Self, MappingError> {
        let raw: FxHashMap<String, u32> =
            serde_json::from_str(json).map_err(|source| MappingError::Json {
                path: path.to_path_buf(),
                source,
            })?;
        let mut map = Self::default();
        for (name, id) in raw {
            if let Some(existing) = map.legacy_to_string.get(&id) {
                return Err(MappingError::DuplicateLegacyId {
                    path: path.to_path_buf(),
                    legacy_id: id,
                    first: existing.clone(),
                    second: name,
                });
            }
            map.legacy_to_string.insert(id, name.clone());
            map.string_to_legacy.insert(name, id);
        }
        Ok(map)
    }

    pub fn legacy_to_string(&self, legacy_id: u32) -> Option<&str> {
        self.legacy_to_string.get(&legacy_id).map(String::as_str)
    }

    pub fn string_to_legacy(&self, name: &str) -> Option<u32> {
        self.string_to_legacy.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.legacy_to_string.len()
    }

    pub fn is_empty(&self) -> bool {
        self.legacy_to_string.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_both_directions() {
        let map = LegacyIdMap::from_json_str(
            r#"{"minecraft:air": 0, "minecraft:stone": 1, "minecraft:info_update": 248}"#,
            Path::new("block_id_map.json"),
        )
        .unwrap();
        assert_eq!(map.len(), 3);
        assert_eq!(map.legacy_to_string(248), Some("minecraft:info_update"));
        assert_eq!(map.string_to_legacy("minecraft:stone"), Some(1));
        assert_eq!(map.legacy_to_string(999), None);
    }

    #[test]
    fn test_wrong_shape_is_error() {
        let err = LegacyIdMap::from_json_str(r#"{"minecraft:air": "zero"}"#, Path::new("x.json"))
            .unwrap_err();
        assert!(matches!(err, MappingError::Json { .. }));
    }

    #[test]
    fn test_duplicate_numeric_id_is_error() {
        let err = LegacyIdMap::from_json_str(
            r#"{"minecraft:a": 3, "minecraft:b": 3}"#,
            Path::new("x.json"),
        )
        .unwrap_err();
        assert!(matches!(err, MappingError::DuplicateLegacyId { legacy_id: 3, .. }));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = LegacyIdMap::load(&dir.path().join("biome_id_map.json")).unwrap_err();
        assert!(matches!(err, MappingError::Io { .. }));
    }
}
