//! Cross-version block and item id mapping.
//!
//! Every client protocol resolves to a [`ProtocolBucket`]; each bucket has its
//! own canonical block state order, legacy block map and item list. Tables are
//! built once and shared read-only through [`MappingStore`].

mod block_state;
mod error;
mod item_dictionary;
mod legacy_id;
mod protocol;
mod runtime_mapping;
mod store;

pub use block_state::BlockStateRegistry;
pub use error::MappingError;
pub use item_dictionary::{ItemTypeDictionary, ItemTypeEntry};
pub use legacy_id::{LegacyBiomeIdMap, LegacyBlockIdMap, LegacyIdMap};
pub use protocol::ProtocolBucket;
pub use runtime_mapping::{INFO_UPDATE_LEGACY_ID, LegacyMapEntry, RuntimeBlockMapping, read_legacy_map};
pub use store::{BIOME_ID_MAP_FILE, BLOCK_ID_MAP_FILE, MappingStore, ProtocolTables};
