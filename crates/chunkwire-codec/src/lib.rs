//! Bedrock chunk payload codec.
//!
//! [`palette`] encodes and decodes single paletted layers; [`ChunkSerializer`]
//! assembles them into the full chunk payload for one protocol bucket.

mod error;
pub mod palette;
mod serializer;

pub use error::CodecError;
pub use palette::{
    DecodedLayer, DecodedPalette, DecodedSubChunk, PaletteEncoding, decode_biome_palette,
    decode_layer, decode_sub_chunk, encode_biome_palette, encode_block_layer,
};
pub use serializer::{BIOME_SECTION_COUNT, ChunkSerializer, OCEAN_BIOME_ID, SUB_CHUNK_VERSION};

#[cfg(test)]
pub(crate) mod test_support {
    //! Small in-memory tables shared by the codec tests.

    use std::path::Path;

    use chunkwire_mapping::{
        BlockStateRegistry, LegacyBiomeIdMap, LegacyBlockIdMap, LegacyMapEntry, ProtocolBucket,
        RuntimeBlockMapping,
    };
    use chunkwire_nbt::{CompoundTag, Tag};

    pub fn state(name: &str) -> CompoundTag {
        CompoundTag::new()
            .with("name", Tag::string(name))
            .with("states", Tag::compound(CompoundTag::new()))
            .with("version", Tag::Int(17_959_425))
    }

    /// air = runtime 0, stone = 1, dirt = 2, grass = 3, info_update = 4.
    pub fn blocks() -> RuntimeBlockMapping {
        let names = [
            (0u32, "minecraft:air"),
            (1, "minecraft:stone"),
            (3, "minecraft:dirt"),
            (2, "minecraft:grass"),
            (248, "minecraft:info_update"),
        ];
        let registry =
            BlockStateRegistry::from_states(names.iter().map(|(_, n)| state(n)).collect()).unwrap();
        let ids = LegacyBlockIdMap::from_json_str(
            r#"{"minecraft:air": 0, "minecraft:stone": 1, "minecraft:grass": 2, "minecraft:dirt": 3, "minecraft:info_update": 248}"#,
            Path::new("block_id_map.json"),
        )
        .unwrap();
        let entries = names
            .iter()
            .map(|&(legacy_id, name)| LegacyMapEntry {
                legacy_id,
                meta: 0,
                state: state(name),
            })
            .collect();
        RuntimeBlockMapping::build(ProtocolBucket::CURRENT, registry, &ids, entries).unwrap()
    }

    /// ocean = 0, plains = 1, desert = 2.
    pub fn biomes() -> LegacyBiomeIdMap {
        LegacyBiomeIdMap::from_json_str(
            r#"{"ocean": 0, "plains": 1, "desert": 2}"#,
            Path::new("biome_id_map.json"),
        )
        .unwrap()
    }
}
