//! NBT tag tree.
//!
//! String leaves and compound keys are `Arc<str>` and nested compounds are
//! `Arc<CompoundTag>`, so a [`crate::TagPool`] can make equal subtrees share
//! storage without changing what the tree looks like.

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use rustc_hash::FxHasher;

use crate::NbtError;

/// On-wire tag type ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TagType {
    End = 0,
    Byte = 1,
    Short = 2,
    Int = 3,
    Long = 4,
    Float = 5,
    Double = 6,
    ByteArray = 7,
    String = 8,
    List = 9,
    Compound = 10,
    IntArray = 11,
    LongArray = 12,
}

impl TagType {
    pub fn from_id(id: u8) -> Option<Self> {
        Some(match id {
            0 => Self::End,
            1 => Self::Byte,
            2 => Self::Short,
            3 => Self::Int,
            4 => Self::Long,
            5 => Self::Float,
            6 => Self::Double,
            7 => Self::ByteArray,
            8 => Self::String,
            9 => Self::List,
            10 => Self::Compound,
            11 => Self::IntArray,
            12 => Self::LongArray,
            _ => return None,
        })
    }

    pub fn id(self) -> u8 {
        self as u8
    }
}

/// A single NBT value.
#[derive(Debug, Clone)]
pub enum Tag {
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    ByteArray(Vec<u8>),
    String(Arc<str>),
    List(ListTag),
    Compound(Arc<CompoundTag>),
    IntArray(Vec<i32>),
    LongArray(Vec<i64>),
}

impl Tag {
    pub fn tag_type(&self) -> TagType {
        match self {
            Tag::Byte(_) => TagType::Byte,
            Tag::Short(_) => TagType::Short,
            Tag::Int(_) => TagType::Int,
            Tag::Long(_) => TagType::Long,
            Tag::Float(_) => TagType::Float,
            Tag::Double(_) => TagType::Double,
            Tag::ByteArray(_) => TagType::ByteArray,
            Tag::String(_) => TagType::String,
            Tag::List(_) => TagType::List,
            Tag::Compound(_) => TagType::Compound,
            Tag::IntArray(_) => TagType::IntArray,
            Tag::LongArray(_) => TagType::LongArray,
        }
    }

    pub fn string(value: &str) -> Self {
        Tag::String(Arc::from(value))
    }

    pub fn compound(value: CompoundTag) -> Self {
        Tag::Compound(Arc::new(value))
    }

    /// Like `==`, but nested compounds must also list their keys in the same
    /// order. Two identical trees encode to the same bytes.
    pub fn identical(&self, other: &Self) -> bool {
        match (self, other) {
            (Tag::List(a), Tag::List(b)) => {
                a.element_type == b.element_type
                    && a.items.len() == b.items.len()
                    && a.items.iter().zip(&b.items).all(|(x, y)| x.identical(y))
            }
            (Tag::Compound(a), Tag::Compound(b)) => Arc::ptr_eq(a, b) || a.identical(b),
            _ => self == other,
        }
    }

    /// Hash consistent with [`identical`](Self::identical).
    pub fn hash_ordered<H: Hasher>(&self, state: &mut H) {
        match self {
            Tag::List(list) => {
                TagType::List.hash(state);
                list.element_type.hash(state);
                list.items.len().hash(state);
                for item in &list.items {
                    item.hash_ordered(state);
                }
            }
            Tag::Compound(c) => {
                TagType::Compound.hash(state);
                c.hash_ordered(state);
            }
            other => other.hash(state),
        }
    }
}

// Floats compare by bit pattern so that Eq and Hash agree.
impl PartialEq for Tag {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Tag::Byte(a), Tag::Byte(b)) => a == b,
            (Tag::Short(a), Tag::Short(b)) => a == b,
            (Tag::Int(a), Tag::Int(b)) => a == b,
            (Tag::Long(a), Tag::Long(b)) => a == b,
            (Tag::Float(a), Tag::Float(b)) => a.to_bits() == b.to_bits(),
            (Tag::Double(a), Tag::Double(b)) => a.to_bits() == b.to_bits(),
            (Tag::ByteArray(a), Tag::ByteArray(b)) => a == b,
            (Tag::String(a), Tag::String(b)) => a == b,
            (Tag::List(a), Tag::List(b)) => a == b,
            (Tag::Compound(a), Tag::Compound(b)) => Arc::ptr_eq(a, b) || a == b,
            (Tag::IntArray(a), Tag::IntArray(b)) => a == b,
            (Tag::LongArray(a), Tag::LongArray(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Tag {}

impl Hash for Tag {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.tag_type().hash(state);
        match self {
            Tag::Byte(v) => v.hash(state),
            Tag::Short(v) => v.hash(state),
            Tag::Int(v) => v.hash(state),
            Tag::Long(v) => v.hash(state),
            Tag::Float(v) => v.to_bits().hash(state),
            Tag::Double(v) => v.to_bits().hash(state),
            Tag::ByteArray(v) => v.hash(state),
            Tag::String(v) => v.hash(state),
            Tag::List(v) => v.hash(state),
            Tag::Compound(v) => v.hash(state),
            Tag::IntArray(v) => v.hash(state),
            Tag::LongArray(v) => v.hash(state),
        }
    }
}

/// Homogeneous list of tags. An empty list has element type `End`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListTag {
    element_type: TagType,
    items: Vec<Tag>,
}

impl Default for ListTag {
    fn default() -> Self {
        Self {
            element_type: TagType::End,
            items: Vec::new(),
        }
    }
}

impl ListTag {
    /// Empty list that will only accept `element_type`.
    pub fn of_type(element_type: TagType) -> Self {
        Self {
            element_type,
            items: Vec::new(),
        }
    }

    /// Builds a list from `items`, which must all share one type.
    pub fn from_tags(items: Vec<Tag>) -> Result<Self, NbtError> {
        let mut list = Self::default();
        for item in items {
            list.push(item)?;
        }
        Ok(list)
    }

    pub fn push(&mut self, tag: Tag) -> Result<(), NbtError> {
        let found = tag.tag_type();
        if self.items.is_empty() && self.element_type == TagType::End {
            self.element_type = found;
        } else if self.element_type != found {
            return Err(NbtError::ListTypeMismatch {
                expected: self.element_type,
                found,
            });
        }
        self.items.push(tag);
        Ok(())
    }

    pub fn element_type(&self) -> TagType {
        self.element_type
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Tag> {
        self.items.iter()
    }
}

/// Named tags in insertion order.
///
/// Equality and hashing ignore order: two compounds are equal when they hold
/// the same keys mapped to equal values.
#[derive(Debug, Clone, Default)]
pub struct CompoundTag {
    entries: Vec<(Arc<str>, Tag)>,
}

impl CompoundTag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces `key`. A replaced key keeps its original position.
    pub fn insert(&mut self, key: impl Into<Arc<str>>, value: Tag) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, key: impl Into<Arc<str>>, value: Tag) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Tag> {
        self.entries
            .iter()
            .find(|(k, _)| &**k == key)
            .map(|(_, v)| v)
    }

    pub fn get_string(&self, key: &str) -> Option<&str> {
        match self.get(key)? {
            Tag::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn get_int(&self, key: &str) -> Option<i32> {
        match self.get(key)? {
            Tag::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn get_byte(&self, key: &str) -> Option<i8> {
        match self.get(key)? {
            Tag::Byte(v) => Some(*v),
            _ => None,
        }
    }

    pub fn get_compound(&self, key: &str) -> Option<&Arc<CompoundTag>> {
        match self.get(key)? {
            Tag::Compound(c) => Some(c),
            _ => None,
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&Arc<str>, &Tag)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    /// Order-sensitive equality, see [`Tag::identical`].
    pub fn identical(&self, other: &Self) -> bool {
        self.entries.len() == other.entries.len()
            && self
                .entries
                .iter()
                .zip(&other.entries)
                .all(|((ka, va), (kb, vb))| ka == kb && va.identical(vb))
    }

    /// Hash consistent with [`identical`](Self::identical).
    pub fn hash_ordered<H: Hasher>(&self, state: &mut H) {
        self.entries.len().hash(state);
        for (k, v) in &self.entries {
            k.hash(state);
            v.hash_ordered(state);
        }
    }
}

impl PartialEq for CompoundTag {
    fn eq(&self, other: &Self) -> bool {
        self.entries.len() == other.entries.len()
            && self
                .entries
                .iter()
                .all(|(k, v)| other.get(k).is_some_and(|o| o == v))
    }
}

impl Eq for CompoundTag {}

impl Hash for CompoundTag {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Commutative combination of per-entry digests.
        let mut combined = 0u64;
        for (k, v) in &self.entries {
            let mut h = FxHasher::default();
            k.hash(&mut h);
            v.hash(&mut h);
            combined = combined.wrapping_add(h.finish());
        }
        self.entries.len().hash(state);
        combined.hash(state);
    }
}

// ---- Tests ----
