//! IdentifierSet: concurrent set of identifiers with atomic replace.

use crate::builder::SetBuilder;
use crate::container::{Container, Cursor, Destructor, Destructors};
use crate::error::{Error, Result};
use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use std::collections::hash_map::RandomState;

/// A set of identifiers guarded by a single reader/writer lock.
///
/// Locking and destructor rules are those of
/// [`IdentifierMap`](crate::IdentifierMap); presence of an identifier is
/// the only fact stored.
pub struct IdentifierSet<K, S = RandomState> {
    inner: Container<K, (), S>,
}

impl<K> IdentifierSet<K>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self::with_hasher(Default::default())
    }

    pub fn uninit() -> Self {
        Self::uninit_with_hasher(Default::default())
    }

    pub fn builder() -> SetBuilder<K> {
        SetBuilder::new()
    }
}

impl<K> Default for IdentifierSet<K>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, S> IdentifierSet<K, S>
where
    K: Eq + Hash,
    S: BuildHasher + Clone,
{
    pub fn with_hasher(hasher: S) -> Self {
        Self::from_parts(hasher, 0, None)
    }

    pub fn uninit_with_hasher(hasher: S) -> Self {
        Self {
            inner: Container::absent(hasher, 0),
        }
    }

    pub(crate) fn from_parts(hasher: S, capacity: usize, destructor: Option<Destructor<K>>) -> Self {
        Self {
            inner: Container::live(hasher, capacity, Destructors::new(destructor, None)),
        }
    }

    /// Allocates the table of an uninitialized (or reset) set.
    pub fn init(&self, destructor: Option<Destructor<K>>) -> Result<()> {
        self.inner.init(Destructors::new(destructor, None))
    }

    pub fn reset(&self) {
        self.inner.reset()
    }

    pub fn clear(&self) {
        self.inner.clear()
    }

    pub fn is_live(&self) -> bool {
        self.inner.is_live()
    }

    pub fn count(&self) -> usize {
        self.inner.count()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    pub fn lookup<Q>(&self, id: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.inner.contains(id)
    }

    /// Adds `id`; returns `Ok(true)` when it was not already present.
    ///
    /// A duplicate insert keeps the stored identifier and hands the incoming
    /// one to the destructor.
    pub fn insert(&self, id: K) -> Result<bool> {
        self.inner.insert(id, ())
    }

    pub fn remove<Q>(&self, id: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.inner.remove(id)
    }

    /// Removes `old` and inserts `new` in one critical section.
    ///
    /// No reader observes both or neither. With `new == None` this is a
    /// plain removal, which is a no-op on an uninitialized set; inserting
    /// into one fails with [`Error::Uninitialized`].
    pub fn replace<Q>(&self, old: &Q, new: Option<K>) -> Result<()>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let inserting = new.is_some();
        let done = self.inner.write(|t, ev| {
            if let Some(entry) = t.remove(old) {
                ev.push_entry(entry);
            }
            if let Some(id) = new {
                if let Some((dup, ())) = t.insert(id, ()) {
                    ev.push_key(dup);
                }
            }
        });
        match done {
            None if inserting => Err(Error::Uninitialized),
            _ => Ok(()),
        }
    }

    pub fn retain<F>(&self, mut keep: F)
    where
        F: FnMut(&K) -> bool,
    {
        self.inner.retain(|k, _| keep(k))
    }

    pub fn keys(&self) -> Vec<K>
    where
        K: Clone,
    {
        self.inner
            .read(|t| t.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Opens an iterator holding the write lock until [`SetIter::done`].
    pub fn iter(&self) -> Result<SetIter<'_, K, S>> {
        Ok(SetIter {
            cursor: self.inner.cursor()?,
        })
    }
}

impl<K, S> fmt::Debug for IdentifierSet<K, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("IdentifierSet");
        self.inner.debug_fields(&mut d);
        d.finish()
    }
}

/// Cursor over the members of an [`IdentifierSet`].
pub struct SetIter<'a, K, S = RandomState> {
    cursor: Cursor<'a, K, (), S>,
}

impl<'a, K, S> SetIter<'a, K, S> {
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<&K> {
        self.cursor.next().map(|(k, _)| k)
    }

    pub fn remove_current(&mut self) -> Result<()> {
        self.cursor.remove_current()
    }

    pub fn position(&self) -> usize {
        self.cursor.position()
    }

    pub fn remaining(&self) -> usize {
        self.cursor.remaining()
    }

    pub fn done(self) {
        self.cursor.close()
    }
}
