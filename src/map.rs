//! IdentifierMap: concurrent identifier -> value map.

use crate::builder::MapBuilder;
use crate::container::{Container, Cursor, Destructor, Destructors};
use crate::error::Result;
use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use std::collections::hash_map::RandomState;

/// A map from identifiers to values guarded by a single reader/writer lock.
///
/// `lookup`, `contains_key` and `count` take the read lock; `insert`,
/// `remove`, `clear`, `retain` and `reset` take the write lock. Each call
/// holds the lock only for its own critical section, except iterators,
/// which hold the write lock until [`MapIter::done`].
///
/// Keys and values leaving the map (through `remove`, `clear`, `retain`,
/// iterator removal, `reset` or drop) are handed to the configured
/// destructors exactly once, after the lock has been released. Inserting
/// over an existing key keeps the stored key and passes the incoming key
/// and the displaced value to the destructors.
pub struct IdentifierMap<K, V, S = RandomState> {
    inner: Container<K, V, S>,
}

impl<K, V> IdentifierMap<K, V>
where
    K: Eq + Hash,
{
    /// Live map with no destructors.
    pub fn new() -> Self {
        Self::with_hasher(Default::default())
    }

    /// Map without a table; call [`IdentifierMap::init`] before use.
    pub fn uninit() -> Self {
        Self::uninit_with_hasher(Default::default())
    }

    pub fn builder() -> MapBuilder<K, V> {
        MapBuilder::new()
    }
}

impl<K, V> Default for IdentifierMap<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> IdentifierMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher + Clone,
{
    pub fn with_hasher(hasher: S) -> Self {
        Self::from_parts(hasher, 0, None, None)
    }

    pub fn uninit_with_hasher(hasher: S) -> Self {
        Self {
            inner: Container::absent(hasher, 0),
        }
    }

    pub(crate) fn from_parts(
        hasher: S,
        capacity: usize,
        key_destructor: Option<Destructor<K>>,
        value_destructor: Option<Destructor<V>>,
    ) -> Self {
        Self {
            inner: Container::live(
                hasher,
                capacity,
                Destructors::new(key_destructor, value_destructor),
            ),
        }
    }

    /// Allocates the table of an uninitialized (or reset) map.
    ///
    /// Fails with [`Error::AlreadyInitialized`](crate::Error::AlreadyInitialized)
    /// if the map is live.
    pub fn init(
        &self,
        key_destructor: Option<Destructor<K>>,
        value_destructor: Option<Destructor<V>>,
    ) -> Result<()> {
        self.inner
            .init(Destructors::new(key_destructor, value_destructor))
    }

    /// Destroys the table, disposing every entry. No-op when not live.
    pub fn reset(&self) {
        self.inner.reset()
    }

    /// Removes every entry but keeps the table. No-op when not live.
    pub fn clear(&self) {
        self.inner.clear()
    }

    pub fn is_live(&self) -> bool {
        self.inner.is_live()
    }

    /// Number of entries; zero when not live.
    pub fn count(&self) -> usize {
        self.inner.count()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Runs `f` on the value stored under `key` without copying it.
    ///
    /// `f` runs under the read lock, which is released before this returns.
    /// It must not call back into the same map.
    pub fn lookup_with<Q, R>(&self, key: &Q, f: impl FnOnce(&V) -> R) -> Option<R>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.inner.read(|t| t.get(key).map(f)).flatten()
    }

    /// Copy of the value stored under `key`.
    pub fn lookup<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        V: Clone,
    {
        self.lookup_with(key, V::clone)
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.inner.contains(key)
    }

    /// Inserts or overwrites the entry for `key`.
    ///
    /// Returns `Ok(true)` when `key` was not present. Fails with
    /// [`Error::Uninitialized`](crate::Error::Uninitialized) when not live.
    pub fn insert(&self, key: K, value: V) -> Result<bool> {
        self.inner.insert(key, value)
    }

    /// Removes the entry for `key`; returns whether one was removed.
    pub fn remove<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.inner.remove(key)
    }

    /// Removes every entry for which `keep` returns false, in one critical
    /// section.
    pub fn retain<F>(&self, keep: F)
    where
        F: FnMut(&K, &V) -> bool,
    {
        self.inner.retain(keep)
    }

    /// Snapshot of the keys under the read lock.
    pub fn keys(&self) -> Vec<K>
    where
        K: Clone,
    {
        self.inner
            .read(|t| t.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Opens an iterator holding the write lock until [`MapIter::done`].
    ///
    /// Other threads block on this map while the iterator is open; the
    /// owning thread must not call other methods on the map until then.
    pub fn iter(&self) -> Result<MapIter<'_, K, V, S>> {
        Ok(MapIter {
            cursor: self.inner.cursor()?,
        })
    }
}

impl<K, V, S> fmt::Debug for IdentifierMap<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("IdentifierMap");
        self.inner.debug_fields(&mut d);
        d.finish()
    }
}

/// Cursor over the entries of an [`IdentifierMap`].
pub struct MapIter<'a, K, V, S = RandomState> {
    cursor: Cursor<'a, K, V, S>,
}

impl<'a, K, V, S> MapIter<'a, K, V, S> {
    /// Next entry not yet visited, or `None` once exhausted.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<(&K, &V)> {
        self.cursor.next()
    }

    /// Removes the entry most recently returned by `next`.
    ///
    /// Its destructors run when the iterator is closed.
    pub fn remove_current(&mut self) -> Result<()> {
        self.cursor.remove_current()
    }

    /// Number of entries produced so far.
    pub fn position(&self) -> usize {
        self.cursor.position()
    }

    /// Upper bound on the entries still to come.
    pub fn remaining(&self) -> usize {
        self.cursor.remaining()
    }

    /// Releases the lock and disposes removed entries.
    pub fn done(self) {
        self.cursor.close()
    }
}
