//! Table: structural layer with stable slot handles.
//!
//! Entries live in a generational `SlotMap`; a `HashTable` of slot keys
//! provides O(1) average lookup. Handles stay valid across unrelated
//! removals, which is what lets an iterator remove its current entry
//! without disturbing the rest of the walk.

use core::borrow::Borrow;
use core::hash::{BuildHasher, Hash};
use hashbrown::hash_table::Entry as IndexEntry;
use hashbrown::HashTable;
use slotmap::{DefaultKey, SlotMap};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub(crate) struct Handle(DefaultKey);

#[derive(Debug)]
struct Entry<K, V> {
    key: K,
    value: V,
    hash: u64,
}

pub(crate) struct Table<K, V, S> {
    hasher: S,
    index: HashTable<DefaultKey>,
    slots: SlotMap<DefaultKey, Entry<K, V>>,
}

impl<K, V, S> Table<K, V, S> {
    pub(crate) fn with_capacity_and_hasher(capacity: usize, hasher: S) -> Self {
        Self {
            hasher,
            index: HashTable::with_capacity(capacity),
            slots: SlotMap::with_capacity_and_key(capacity),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn entry(&self, h: Handle) -> Option<(&K, &V)> {
        self.slots.get(h.0).map(|e| (&e.key, &e.value))
    }

    /// Handles of every live entry, in slot order.
    pub(crate) fn handles(&self) -> Vec<Handle> {
        self.slots.keys().map(Handle).collect()
    }

    pub(crate) fn keys(&self) -> impl Iterator<Item = &K> {
        self.slots.values().map(|e| &e.key)
    }

    pub(crate) fn remove_handle(&mut self, h: Handle) -> Option<(K, V)> {
        let entry = self.slots.remove(h.0)?;
        if let Ok(found) = self.index.find_entry(entry.hash, |&k| k == h.0) {
            let _ = found.remove();
        }
        Some((entry.key, entry.value))
    }

    /// Unlinks every entry, keeping both allocations.
    pub(crate) fn drain(&mut self) -> Vec<(K, V)> {
        self.index.clear();
        self.slots.drain().map(|(_, e)| (e.key, e.value)).collect()
    }
}

impl<K, V, S> Table<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    fn make_hash<Q>(&self, q: &Q) -> u64
    where
        Q: ?Sized + Hash,
    {
        self.hasher.hash_one(q)
    }

    pub(crate) fn find<Q>(&self, q: &Q) -> Option<Handle>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let hash = self.make_hash(q);
        self.index
            .find(hash, |&k| {
                self.slots
                    .get(k)
                    .map(|e| e.key.borrow() == q)
                    .unwrap_or(false)
            })
            .map(|&k| Handle(k))
    }

    pub(crate) fn get<Q>(&self, q: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let h = self.find(q)?;
        self.slots.get(h.0).map(|e| &e.value)
    }

    /// Inserts or overwrites. On overwrite the stored key is kept and the
    /// incoming key is returned together with the displaced value.
    pub(crate) fn insert(&mut self, key: K, value: V) -> Option<(K, V)> {
        let hash = self.make_hash(&key);
        match self.index.entry(
            hash,
            |&kk| self.slots.get(kk).map(|e| e.key == key).unwrap_or(false),
            |&kk| self.slots.get(kk).map(|e| e.hash).unwrap_or(0),
        ) {
            IndexEntry::Occupied(o) => {
                let slot = *o.get();
                match self.slots.get_mut(slot) {
                    Some(e) => {
                        let old = core::mem::replace(&mut e.value, value);
                        Some((key, old))
                    }
                    // Index and slots are updated together; a dangling
                    // index entry cannot be observed.
                    None => unreachable!("index refers to a vacant slot"),
                }
            }
            IndexEntry::Vacant(v) => {
                let k = self.slots.insert(Entry { key, value, hash });
                let _ = v.insert(k);
                None
            }
        }
    }

    pub(crate) fn remove<Q>(&mut self, q: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let h = self.find(q)?;
        self.remove_handle(h)
    }

    /// Unlinks every entry for which `keep` returns false.
    pub(crate) fn retain<F>(&mut self, mut keep: F) -> Vec<(K, V)>
    where
        F: FnMut(&K, &V) -> bool,
    {
        let doomed: Vec<Handle> = self
            .slots
            .iter()
            .filter(|(_, e)| !keep(&e.key, &e.value))
            .map(|(k, _)| Handle(k))
            .collect();
        doomed
            .into_iter()
            .filter_map(|h| self.remove_handle(h))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::RandomState;
    use std::collections::BTreeSet;

    fn table() -> Table<String, i32, RandomState> {
        Table::with_capacity_and_hasher(0, RandomState::new())
    }

    /// Invariant: overwriting keeps one entry, returns the incoming key and
    /// the displaced value.
    #[test]
    fn insert_overwrites_and_returns_displaced() {
        let mut t = table();
        assert!(t.insert("a".to_string(), 1).is_none());
        let (k, v) = t.insert("a".to_string(), 2).expect("overwrite");
        assert_eq!((k.as_str(), v), ("a", 1));
        assert_eq!(t.len(), 1);
        assert_eq!(t.get("a"), Some(&2));
    }

    /// Invariant: `find(k).is_some() == get(k).is_some()` for present/absent keys.
    #[test]
    fn find_get_parity() {
        let mut t = table();
        for (i, k) in ["a", "b", "c"].iter().enumerate() {
            t.insert((*k).to_string(), i as i32);
        }
        for k in ["a", "b", "c", "x", "y"] {
            assert_eq!(t.find(k).is_some(), t.get(k).is_some());
        }
        assert!(t.find("x").is_none());
    }

    /// Invariant: a removed handle never resolves, even after the slot is reused.
    #[test]
    fn stale_handle_does_not_alias_new_entry() {
        let mut t = table();
        t.insert("old".to_string(), 1);
        let h1 = t.find("old").unwrap();
        assert_eq!(t.remove_handle(h1), Some(("old".to_string(), 1)));
        t.insert("new".to_string(), 2);
        let h2 = t.find("new").unwrap();
        assert_ne!(h1, h2);
        assert!(t.entry(h1).is_none());
        assert!(t.remove_handle(h1).is_none());
        assert_eq!(t.len(), 1);
    }

    /// Invariant: removing through a handle snapshot leaves the other
    /// handles valid.
    #[test]
    fn handles_survive_unrelated_removal() {
        let mut t = table();
        for (i, k) in ["a", "b", "c", "d"].iter().enumerate() {
            t.insert((*k).to_string(), i as i32);
        }
        let hs = t.handles();
        assert_eq!(hs.len(), 4);
        let mut seen = BTreeSet::new();
        for h in hs {
            let (k, _) = t.entry(h).expect("live");
            let k = k.clone();
            if k == "b" {
                t.remove_handle(h);
            }
            seen.insert(k);
        }
        assert_eq!(seen.len(), 4);
        assert_eq!(t.len(), 3);
        assert!(t.find("b").is_none());
    }

    #[test]
    fn drain_empties_and_table_stays_usable() {
        let mut t = table();
        t.insert("a".to_string(), 1);
        t.insert("b".to_string(), 2);
        let mut drained = t.drain();
        drained.sort();
        assert_eq!(drained, vec![("a".to_string(), 1), ("b".to_string(), 2)]);
        assert_eq!(t.len(), 0);
        assert!(t.find("a").is_none());
        t.insert("a".to_string(), 3);
        assert_eq!(t.get("a"), Some(&3));
    }

    #[test]
    fn retain_returns_removed_entries() {
        let mut t = table();
        for i in 0..10 {
            t.insert(format!("k{i}"), i);
        }
        let removed = t.retain(|_, v| v % 2 == 0);
        assert_eq!(removed.len(), 5);
        assert!(removed.iter().all(|(_, v)| v % 2 == 1));
        assert_eq!(t.len(), 5);
        assert!(t.get("k3").is_none());
        assert_eq!(t.get("k4"), Some(&4));
    }

    /// Invariant: lookups work under heavy hash collisions.
    #[test]
    fn collision_handling_with_const_hasher() {
        #[derive(Clone, Default)]
        struct ConstBuildHasher;
        struct ConstHasher;
        impl BuildHasher for ConstBuildHasher {
            type Hasher = ConstHasher;
            fn build_hasher(&self) -> Self::Hasher {
                ConstHasher
            }
        }
        impl core::hash::Hasher for ConstHasher {
            fn write(&mut self, _bytes: &[u8]) {}
            fn finish(&self) -> u64 {
                0
            }
        }

        let mut t: Table<String, i32, ConstBuildHasher> =
            Table::with_capacity_and_hasher(4, ConstBuildHasher);
        t.insert("a".to_string(), 1);
        t.insert("b".to_string(), 2);
        t.insert("a".to_string(), 3);
        assert_eq!(t.len(), 2);
        assert_eq!(t.get("a"), Some(&3));
        assert_eq!(t.get("b"), Some(&2));
        assert!(t.remove("a").is_some());
        assert_eq!(t.get("b"), Some(&2));
        assert!(t.get("a").is_none());
    }
}
