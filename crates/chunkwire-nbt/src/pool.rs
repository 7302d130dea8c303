//! Structural interning of tag trees.
//!
//! Block state tables repeat the same keys (`name`, `states`, `version`), the
//! same string values and whole identical `states` compounds thousands of
//! times. Running every record through one [`TagPool`] collapses those into
//! shared `Arc`s. Equality and iteration order are unaffected.

use std::hash::Hasher;
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet, FxHasher};

use crate::{CompoundTag, ListTag, Tag};

/// Counts of distinct pooled values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolStats {
    pub keys: usize,
    pub strings: usize,
    pub compounds: usize,
}

/// Interning pools for compound keys, string leaves and compounds.
#[derive(Debug, Default)]
pub struct TagPool {
    keys: FxHashSet<Arc<str>>,
    strings: FxHashSet<Arc<str>>,
    // Keyed on the order-sensitive hash; a hit must also be `identical`, so
    // a reordered compound never resolves to another key order.
    compounds: FxHashMap<u64, Vec<Arc<CompoundTag>>>,
    compound_count: usize,
}

impl TagPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds `compound` bottom-up from pooled parts and returns the pooled
    /// instance. Inputs with the same entries in the same order always yield
    /// the same `Arc`.
    pub fn intern(&mut self, compound: &CompoundTag) -> Arc<CompoundTag> {
        let mut hasher = FxHasher::default();
        compound.hash_ordered(&mut hasher);
        let digest = hasher.finish();
        if let Some(existing) = self
            .compounds
            .get(&digest)
            .and_then(|bucket| bucket.iter().find(|c| c.identical(compound)))
        {
            return Arc::clone(existing);
        }
        let mut rebuilt = CompoundTag::new();
        for (key, value) in compound.iter() {
            let key = Self::pooled(&mut self.keys, key);
            let value = self.intern_tag(value);
            rebuilt.insert(key, value);
        }
        let rebuilt = Arc::new(rebuilt);
        self.compounds
            .entry(digest)
            .or_default()
            .push(Arc::clone(&rebuilt));
        self.compound_count += 1;
        rebuilt
    }

    fn intern_tag(&mut self, tag: &Tag) -> Tag {
        match tag {
            Tag::String(s) => Tag::String(Self::pooled(&mut self.strings, s)),
            Tag::Compound(c) => Tag::Compound(self.intern(c)),
            Tag::List(list) => {
                let mut rebuilt = ListTag::of_type(list.element_type());
                for item in list.iter() {
                    // Same element type as the source list, so push cannot fail.
                    let _ = rebuilt.push(self.intern_tag(item));
                }
                Tag::List(rebuilt)
            }
            other => other.clone(),
        }
    }

    fn pooled(set: &mut FxHashSet<Arc<str>>, value: &Arc<str>) -> Arc<str> {
        if let Some(existing) = set.get(&**value) {
            return Arc::clone(existing);
        }
        set.insert(Arc::clone(value));
        Arc::clone(value)
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            keys: self.keys.len(),
            strings: self.strings.len(),
            compounds: self.compound_count,
        }
    }
}

// ---- Tests ----

#[cfg(test)]
mod tests {
    use super::*;

    fn state(name: &str, color: &str) -> CompoundTag {
        CompoundTag::new()
            .with("name", Tag::string(name))
            .with(
                "states",
                Tag::compound(CompoundTag::new().with("color", Tag::string(color))),
            )
            .with("version", Tag::Int(17_959_425))
    }

    fn states_of(c: &CompoundTag) -> &Arc<CompoundTag> {
        c.get_compound("states").unwrap()
    }

    #[test]
    fn test_equal_subtrees_share_instance() {
        let mut pool = TagPool::new();
        let wool = pool.intern(&state("minecraft:wool", "red"));
        let carpet = pool.intern(&state("minecraft:carpet", "red"));
        assert!(Arc::ptr_eq(states_of(&wool), states_of(&carpet)));
        assert!(!Arc::ptr_eq(&wool, &carpet));
    }

    #[test]
    fn test_equal_roots_share_instance() {
        let mut pool = TagPool::new();
        let a = pool.intern(&state("minecraft:wool", "red"));
        let b = pool.intern(&state("minecraft:wool", "red"));
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_interning_preserves_shape() {
        let mut pool = TagPool::new();
        let input = state("minecraft:wool", "blue");
        let pooled = pool.intern(&input);
        assert_eq!(*pooled, input);
        let before: Vec<_> = input.iter().map(|(k, _)| k.clone()).collect();
        let after: Vec<_> = pooled.iter().map(|(k, _)| k.clone()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_reordered_compound_keeps_its_order() {
        let mut pool = TagPool::new();
        let xy = CompoundTag::new()
            .with("x", Tag::Int(1))
            .with("y", Tag::Int(2));
        let yx = CompoundTag::new()
            .with("y", Tag::Int(2))
            .with("x", Tag::Int(1));

        let a = pool.intern(&xy);
        let b = pool.intern(&yx);
        assert_eq!(a, b);
        assert!(!Arc::ptr_eq(&a, &b));
        let keys: Vec<_> = b.iter().map(|(k, _)| k.to_string()).collect();
        assert_eq!(keys, ["y", "x"]);
        assert_eq!(pool.stats().compounds, 2);
    }

    #[test]
    fn test_keys_and_strings_are_shared() {
        let mut pool = TagPool::new();
        let a = pool.intern(&state("minecraft:wool", "red"));
        let b = pool.intern(&state("minecraft:wool", "green"));

        let key_a = a.iter().next().unwrap().0;
        let key_b = b.iter().next().unwrap().0;
        assert!(Arc::ptr_eq(key_a, key_b));

        match (a.get("name"), b.get("name")) {
            (Some(Tag::String(x)), Some(Tag::String(y))) => assert!(Arc::ptr_eq(x, y)),
            other => panic!("unexpected tags: {other:?}"),
        }

        let stats = pool.stats();
        assert_eq!(stats.keys, 4); // name, states, version, color
        assert_eq!(stats.strings, 3); // minecraft:wool, red, green
        assert_eq!(stats.compounds, 4);
    }
}
