//! Binary stream primitives and the NBT tag tree used by Bedrock wire formats.
//!
//! - [`binary`]: offset-tracking byte reader and `Vec<u8>` writer helpers
//!   (little-endian fixed width integers, Bedrock varints).
//! - [`Tag`] / [`CompoundTag`] / [`ListTag`]: immutable-by-convention tag tree
//!   with structural, order-independent compound equality.
//! - [`NbtFlavor`]: little-endian (disk) and network encodings.
//! - [`TagPool`]: interning of keys, string leaves and whole compounds.

pub mod binary;
mod codec;
mod error;
mod pool;
mod tag;

pub use binary::{ByteReader, ByteWriter};
pub use codec::{NbtFlavor, MAX_DEPTH, read_multiple, read_root, read_root_from, write_root};
pub use error::NbtError;
pub use pool::{PoolStats, TagPool};
pub use tag::{CompoundTag, ListTag, Tag, TagType};
