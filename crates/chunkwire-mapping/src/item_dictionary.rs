//! Item type dictionary for one protocol bucket.
//!
//! Loaded from `required_item_list*.json`:
//! `{"minecraft:stick": {"runtime_id": 320, "component_based": false}, ...}`.

use std::path::Path;

use rustc_hash::FxHashMap;
use serde::Deserialize;

use crate::MappingError;

/// One item type known to clients of a bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemTypeEntry {
    pub string_id: String,
    pub runtime_id: i32,
    pub component_based: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawItemEntry {
    runtime_id: i32,
    component_based: bool,
}

/// Item string id ↔ runtime id lookups. Entries are sorted by runtime id.
#[derive(Debug, Clone, Default)]
pub struct ItemTypeDictionary {
    entries: Vec<ItemTypeEntry>,
    string_to_int: FxHashMap<String, i32>,
    int_to_index: FxHashMap<i32, usize>,
}

impl ItemTypeDictionary {
    pub fn load(path: &Path) -> Result<Self, MappingError> {
        let json = std::fs::read_to_string(path).map_err(|e| MappingError::io(path, e))?;
        Self::from_json_str(&json, path)
    }

    /// Parses an item list. `path` only labels errors.
    pub fn from_json_str(json: &str, path: &Path) -> Result<Self, MappingError> {
        let raw: FxHashMap<String, RawItemEntry> =
            serde_json::from_str(json).map_err(|source| MappingError::Json {
                path: path.to_path_buf(),
                source,
            })?;
        let entries = raw
            .into_iter()
            .map(|(string_id, e)| ItemTypeEntry {
                string_id,
                runtime_id: e.runtime_id,
                component_based: e.component_based,
            })
            .collect();
        Self::from_entries(entries, path)
    }

    /// Builds the dictionary, rejecting runtime ids used twice.
    pub fn from_entries(mut entries: Vec<ItemTypeEntry>, path: &Path) -> Result<Self, MappingError> {
        entries.sort_by(|a, b| {
            a.runtime_id
                .cmp(&b.runtime_id)
                .then_with(|| a.string_id.cmp(&b.string_id))
        });

        let mut string_to_int = FxHashMap::default();
        let mut int_to_index = FxHashMap::default();
        for (index, entry) in entries.iter().enumerate() {
            if let Some(&previous) = int_to_index.get(&entry.runtime_id) {
                let first: &ItemTypeEntry = &entries[previous];
                return Err(MappingError::DuplicateItemRuntimeId {
                    path: path.to_path_buf(),
                    runtime_id: entry.runtime_id,
                    first: first.string_id.clone(),
                    second: entry.string_id.clone(),
                });
            }
            int_to_index.insert(entry.runtime_id, index);
            string_to_int.insert(entry.string_id.clone(), entry.runtime_id);
        }

        Ok(Self {
            entries,
            string_to_int,
            int_to_index,
        })
    }

    /// All entries, ascending by runtime id.
    pub fn entries(&self) -> &[ItemTypeEntry] {
        &self.entries
    }

    pub fn from_string_id(&self, string_id: &str) -> Option<i32> {
        self.string_to_int.get(string_id).copied()
    }

    pub fn from_int_id(&self, runtime_id: i32) -> Option<&str> {
        self.int_to_index
            .get(&runtime_id)
            .map(|&i| self.entries[i].string_id.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
