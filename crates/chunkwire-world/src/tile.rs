//! Block entities attached to a chunk.

use std::sync::Arc;

use chunkwire_nbt::{CompoundTag, Tag};

/// A block entity at an absolute block position.
///
/// Only tiles that carry a spawn compound are sent to clients.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tile {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    spawn_compound: Option<Arc<CompoundTag>>,
}

impl Tile {
    /// A tile clients never see.
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self {
            x,
            y,
            z,
            spawn_compound: None,
        }
    }

    /// A spawnable tile. `id`, `x`, `y` and `z` are added to the compound when
    /// absent.
    pub fn spawnable(x: i32, y: i32, z: i32, id: &str, compound: CompoundTag) -> Self {
        let mut compound = compound;
        for (key, tag) in [
            ("id", Tag::string(id)),
            ("x", Tag::Int(x)),
            ("y", Tag::Int(y)),
            ("z", Tag::Int(z)),
        ] {
            if !compound.contains_key(key) {
                compound.insert(key, tag);
            }
        }
        Self {
            x,
            y,
            z,
            spawn_compound: Some(Arc::new(compound)),
        }
    }

    pub fn spawn_compound(&self) -> Option<&Arc<CompoundTag>> {
        self.spawn_compound.as_ref()
    }

    pub fn is_spawnable(&self) -> bool {
        self.spawn_compound.is_some()
    }
}
