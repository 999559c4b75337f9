#![cfg(test)]

// Property tests for IdentifierMap and IdentifierSet kept inside the crate
// so they can use the same key newtype and model helpers.

use crate::{IdentifierMap, IdentifierSet};
use proptest::prelude::*;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::hash::Hasher;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// Key newtype with Borrow<str> to exercise borrowed lookup.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
struct Key(String);
impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
impl std::borrow::Borrow<str> for Key {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// Pool-indexed operations to improve shrinking: indices shrink to earlier keys,
// pool length shrinks, and op lists shrink in length.
#[derive(Clone, Debug)]
enum OpI {
    Insert(usize, i32),
    Remove(usize),
    Lookup(usize),
    LookupWith(usize),
    Contains(String),
    Replace(usize, Option<usize>),
    IterRemove(u8),
    Clear,
    Iterate,
}

fn key_from(pool: &[String], i: usize) -> Key {
    Key(pool[i].clone())
}

// Sets draw `Replace`; maps have no replace and draw `LookupWith` instead.
fn arb_scenario(set_ops: bool) -> impl Strategy<Value = (Vec<String>, Vec<OpI>)> {
    proptest::collection::vec("[a-z]{0,5}", 1..=8).prop_flat_map(move |pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let contains_pool = proptest::sample::select(pool.clone());
        let flavored = if set_ops {
            (idx.clone(), proptest::option::of(idx.clone()))
                .prop_map(|(i, j)| OpI::Replace(i, j))
                .boxed()
        } else {
            idx.clone().prop_map(OpI::LookupWith).boxed()
        };
        let op = prop_oneof![
            4 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::Insert(i, v)),
            2 => idx.clone().prop_map(OpI::Remove),
            2 => idx.clone().prop_map(OpI::Lookup),
            1 => prop_oneof![
                contains_pool.prop_map(|s: String| s),
                "[a-z]{0,5}".prop_map(|s| s)
            ]
            .prop_map(OpI::Contains),
            2 => flavored,
            1 => (1u8..4).prop_map(OpI::IterRemove),
            1 => Just(OpI::Clear),
            1 => Just(OpI::Iterate),
        ];
        proptest::collection::vec(op, 1..60).prop_map(move |ops| (pool.clone(), ops))
    })
}

fn counter() -> (Arc<AtomicUsize>, impl Fn() + Send + Sync + 'static) {
    let n = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&n);
    (n, move || {
        c.fetch_add(1, Ordering::SeqCst);
    })
}

// Property: State-machine equivalence of IdentifierMap against HashMap.
// Invariants exercised across random operation sequences:
// - `count` equals the number of distinct keys inserted and not removed.
// - `insert` then `lookup` returns the last inserted value.
// - `remove` then `lookup` is absent; removing an absent key is a no-op.
// - Iteration yields each live entry exactly once; removal through the
//   iterator matches removing from the model.
// - Every key and value ever handed to the map is either still stored or
//   was passed to its destructor exactly once.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_map_state_machine((pool, ops) in arb_scenario(false)) {
        let (keys_gone, on_key) = counter();
        let (values_gone, on_value) = counter();
        let sut: IdentifierMap<Key, i32> = IdentifierMap::builder()
            .key_destructor(move |_: Key| on_key())
            .value_destructor(move |_: i32| on_value())
            .build();
        let mut model: HashMap<Key, i32> = HashMap::new();
        let mut handed_over = 0usize;

        for op in ops {
            match op {
                OpI::Insert(i, v) => {
                    let k = key_from(&pool, i);
                    let fresh = sut.insert(k.clone(), v).expect("live map");
                    handed_over += 1;
                    prop_assert_eq!(fresh, model.insert(k, v).is_none());
                }
                OpI::Remove(i) => {
                    let k = key_from(&pool, i);
                    prop_assert_eq!(sut.remove(&k), model.remove(&k).is_some());
                    prop_assert!(sut.lookup(&k).is_none());
                }
                OpI::Lookup(i) => {
                    let k = key_from(&pool, i);
                    prop_assert_eq!(sut.lookup(&k), model.get(&k).copied());
                }
                OpI::Contains(s) => {
                    let has = sut.contains_key(s.as_str());
                    let has_model = model.keys().any(|k| k.0 == s);
                    prop_assert_eq!(has, has_model);
                }
                OpI::LookupWith(i) => {
                    let k = key_from(&pool, i);
                    let got = sut.lookup_with(k.0.as_str(), |v| v.wrapping_add(1));
                    prop_assert_eq!(got, model.get(&k).map(|v| v.wrapping_add(1)));
                }
                OpI::Replace(..) => unreachable!("map scenarios never draw replace"),
                OpI::IterRemove(m) => {
                    let mut it = sut.iter().expect("live map");
                    let mut seen = 0usize;
                    while let Some((k, v)) = it.next() {
                        seen += 1;
                        prop_assert_eq!(model.get(k), Some(v));
                        if v.rem_euclid(m as i32) == 0 {
                            let k = k.clone();
                            it.remove_current().expect("current entry");
                            model.remove(&k);
                        }
                    }
                    prop_assert_eq!(it.position(), seen);
                    it.done();
                }
                OpI::Clear => {
                    sut.clear();
                    model.clear();
                }
                OpI::Iterate => {
                    let mut it = sut.iter().expect("live map");
                    let mut s_keys = BTreeSet::new();
                    while let Some((k, _)) = it.next() {
                        prop_assert!(s_keys.insert(k.clone()), "entry produced twice");
                    }
                    it.done();
                    let m_keys: BTreeSet<_> = model.keys().cloned().collect();
                    prop_assert_eq!(s_keys, m_keys);
                }
            }

            prop_assert_eq!(sut.count(), model.len());
            prop_assert_eq!(keys_gone.load(Ordering::SeqCst) + sut.count(), handed_over);
            prop_assert_eq!(values_gone.load(Ordering::SeqCst) + sut.count(), handed_over);
        }

        sut.reset();
        prop_assert_eq!(keys_gone.load(Ordering::SeqCst), handed_over);
        prop_assert_eq!(values_gone.load(Ordering::SeqCst), handed_over);
    }
}

// Collision variant using a constant hasher to stress equality resolution.
#[derive(Clone, Default)]
struct ConstBuildHasher;
struct ConstHasher;
impl std::hash::BuildHasher for ConstBuildHasher {
    type Hasher = ConstHasher;
    fn build_hasher(&self) -> Self::Hasher {
        ConstHasher
    }
}
impl Hasher for ConstHasher {
    fn write(&mut self, _bytes: &[u8]) {}
    fn finish(&self) -> u64 {
        0
    }
}

// Property: IdentifierSet against HashSet, under worst-case collisions.
// `replace` must leave `old` absent and `new` present, and every identifier
// handed to the set is disposed exactly once.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_set_state_machine_with_collisions((pool, ops) in arb_scenario(true)) {
        let (ids_gone, on_id) = counter();
        let sut: IdentifierSet<Key, ConstBuildHasher> = IdentifierSet::<Key>::builder()
            .hasher(ConstBuildHasher)
            .destructor(move |_: Key| on_id())
            .build();
        let mut model: HashSet<Key> = HashSet::new();
        let mut handed_over = 0usize;

        for op in ops {
            match op {
                OpI::Insert(i, _) => {
                    let k = key_from(&pool, i);
                    let fresh = sut.insert(k.clone()).expect("live set");
                    handed_over += 1;
                    prop_assert_eq!(fresh, model.insert(k));
                }
                OpI::Remove(i) => {
                    let k = key_from(&pool, i);
                    prop_assert_eq!(sut.remove(&k), model.remove(&k));
                }
                OpI::Lookup(i) => {
                    let k = key_from(&pool, i);
                    prop_assert_eq!(sut.lookup(&k), model.contains(&k));
                }
                OpI::Contains(s) => {
                    prop_assert_eq!(sut.lookup(s.as_str()), model.iter().any(|k| k.0 == s));
                }
                OpI::LookupWith(_) => unreachable!("set scenarios never draw lookup_with"),
                OpI::Replace(i, j) => {
                    let old = key_from(&pool, i);
                    let new = j.map(|j| key_from(&pool, j));
                    if new.is_some() {
                        handed_over += 1;
                    }
                    sut.replace(&old, new.clone()).expect("live set");
                    model.remove(&old);
                    if let Some(n) = new {
                        prop_assert!(sut.lookup(&n));
                        if n != old {
                            prop_assert!(!sut.lookup(&old));
                        }
                        model.insert(n);
                    } else {
                        prop_assert!(!sut.lookup(&old));
                    }
                }
                OpI::IterRemove(m) => {
                    let mut it = sut.iter().expect("live set");
                    while let Some(k) = it.next() {
                        if k.0.len() % (m as usize) == 0 {
                            let k = k.clone();
                            it.remove_current().expect("current entry");
                            model.remove(&k);
                        }
                    }
                    it.done();
                }
                OpI::Clear => {
                    sut.clear();
                    model.clear();
                }
                OpI::Iterate => {
                    let mut s_keys: BTreeSet<Key> = BTreeSet::new();
                    let mut it = sut.iter().expect("live set");
                    while let Some(k) = it.next() {
                        prop_assert!(s_keys.insert(k.clone()), "member produced twice");
                    }
                    it.done();
                    let m_keys: BTreeSet<_> = model.iter().cloned().collect();
                    prop_assert_eq!(s_keys, m_keys);
                }
            }

            prop_assert_eq!(sut.count(), model.len());
            prop_assert_eq!(ids_gone.load(Ordering::SeqCst) + sut.count(), handed_over);
        }

        drop(sut);
        prop_assert_eq!(ids_gone.load(Ordering::SeqCst), handed_over);
    }
}
