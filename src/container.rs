//! Container: one table and one reader/writer lock as a unit.
//!
//! Both `IdentifierMap` and `IdentifierSet` are thin wrappers over
//! `Container`; the set simply stores `()` values. The lock guards an
//! explicit lifecycle state, so a torn-down container is an ordinary
//! `Absent` value rather than dangling memory.
//!
//! Destructors never run under the lock. Every mutating critical section
//! unlinks departing entries into an `Evicted` batch which is disposed
//! after the guard is released; a destructor may therefore call back into
//! the same container.

use crate::error::{Error, Result};
use crate::table::{Handle, Table};
use core::fmt;
use core::hash::{BuildHasher, Hash};
use parking_lot::{MappedRwLockWriteGuard, RwLock, RwLockWriteGuard};
use std::sync::Arc;

/// Callback that takes ownership of a key or value leaving a container.
pub type Destructor<T> = Box<dyn Fn(T) + Send + Sync>;

pub(crate) struct Destructors<K, V> {
    key: Option<Destructor<K>>,
    value: Option<Destructor<V>>,
}

impl<K, V> Destructors<K, V> {
    pub(crate) fn new(key: Option<Destructor<K>>, value: Option<Destructor<V>>) -> Self {
        Self { key, value }
    }

    fn dispose_key(&self, k: K) {
        match &self.key {
            Some(f) => f(k),
            None => drop(k),
        }
    }

    fn dispose_value(&self, v: V) {
        match &self.value {
            Some(f) => f(v),
            None => drop(v),
        }
    }
}

/// Keys and values unlinked inside a critical section. Dropping the batch
/// hands each one to its destructor exactly once.
pub(crate) struct Evicted<K, V> {
    dtors: Arc<Destructors<K, V>>,
    keys: Vec<K>,
    values: Vec<V>,
}

impl<K, V> Evicted<K, V> {
    fn new(dtors: Arc<Destructors<K, V>>) -> Self {
        Self {
            dtors,
            keys: Vec::new(),
            values: Vec::new(),
        }
    }

    pub(crate) fn push_entry(&mut self, (k, v): (K, V)) {
        self.keys.push(k);
        self.values.push(v);
    }

    pub(crate) fn push_key(&mut self, k: K) {
        self.keys.push(k);
    }

    pub(crate) fn push_value(&mut self, v: V) {
        self.values.push(v);
    }

    pub(crate) fn extend(&mut self, entries: Vec<(K, V)>) {
        self.keys.reserve(entries.len());
        self.values.reserve(entries.len());
        for e in entries {
            self.push_entry(e);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.keys.len().max(self.values.len())
    }
}

impl<K, V> Drop for Evicted<K, V> {
    fn drop(&mut self) {
        for k in self.keys.drain(..) {
            self.dtors.dispose_key(k);
        }
        for v in self.values.drain(..) {
            self.dtors.dispose_value(v);
        }
    }
}

pub(crate) struct Live<K, V, S> {
    pub(crate) table: Table<K, V, S>,
    dtors: Arc<Destructors<K, V>>,
}

impl<K, V, S> Live<K, V, S> {
    fn evicted(&self) -> Evicted<K, V> {
        Evicted::new(Arc::clone(&self.dtors))
    }

    fn into_evicted(mut self) -> Evicted<K, V> {
        let mut out = self.evicted();
        out.extend(self.table.drain());
        out
    }
}

pub(crate) enum Lifecycle<K, V, S> {
    Absent,
    Live(Live<K, V, S>),
}

impl<K, V, S> Lifecycle<K, V, S> {
    fn live(&self) -> Option<&Live<K, V, S>> {
        match self {
            Lifecycle::Live(l) => Some(l),
            Lifecycle::Absent => None,
        }
    }

    fn live_mut(&mut self) -> Option<&mut Live<K, V, S>> {
        match self {
            Lifecycle::Live(l) => Some(l),
            Lifecycle::Absent => None,
        }
    }
}

pub(crate) struct Container<K, V, S> {
    hasher: S,
    capacity: usize,
    state: RwLock<Lifecycle<K, V, S>>,
}

impl<K, V, S> Container<K, V, S>
where
    S: Clone,
{
    pub(crate) fn live(hasher: S, capacity: usize, dtors: Destructors<K, V>) -> Self {
        let table = Table::with_capacity_and_hasher(capacity, hasher.clone());
        Self {
            hasher,
            capacity,
            state: RwLock::new(Lifecycle::Live(Live {
                table,
                dtors: Arc::new(dtors),
            })),
        }
    }

    pub(crate) fn absent(hasher: S, capacity: usize) -> Self {
        Self {
            hasher,
            capacity,
            state: RwLock::new(Lifecycle::Absent),
        }
    }

    /// Absent -> Live. The table is allocated under the write lock.
    pub(crate) fn init(&self, dtors: Destructors<K, V>) -> Result<()> {
        let mut state = self.state.write();
        if let Lifecycle::Live(_) = *state {
            return Err(Error::AlreadyInitialized);
        }
        *state = Lifecycle::Live(Live {
            table: Table::with_capacity_and_hasher(self.capacity, self.hasher.clone()),
            dtors: Arc::new(dtors),
        });
        log::debug!("container initialized (capacity {})", self.capacity);
        Ok(())
    }
}

impl<K, V, S> Container<K, V, S> {
    /// Live -> Absent, disposing every entry once the lock is released.
    pub(crate) fn reset(&self) {
        let evicted = {
            let mut state = self.state.write();
            match core::mem::replace(&mut *state, Lifecycle::Absent) {
                Lifecycle::Live(live) => live.into_evicted(),
                Lifecycle::Absent => return,
            }
        };
        log::debug!("container reset, disposing {} entries", evicted.len());
        drop(evicted);
    }

    pub(crate) fn clear(&self) {
        let evicted = {
            let mut state = self.state.write();
            let Some(live) = state.live_mut() else {
                return;
            };
            let mut evicted = live.evicted();
            evicted.extend(live.table.drain());
            evicted
        };
        log::trace!("container cleared, disposing {} entries", evicted.len());
        drop(evicted);
    }

    pub(crate) fn is_live(&self) -> bool {
        self.state.read().live().is_some()
    }

    pub(crate) fn count(&self) -> usize {
        self.state.read().live().map_or(0, |l| l.table.len())
    }

    /// Writes `live` and `count` from one read guard, or `<locked>` when
    /// the lock is not immediately available (e.g. an iterator is open on
    /// this thread).
    pub(crate) fn debug_fields(&self, d: &mut fmt::DebugStruct<'_, '_>) {
        match self.state.try_read() {
            Some(state) => {
                let count = state.live().map_or(0, |l| l.table.len());
                d.field("live", &state.live().is_some()).field("count", &count);
            }
            None => {
                d.field("state", &format_args!("<locked>"));
            }
        }
    }

    /// Runs `f` under the read lock; `None` when absent.
    pub(crate) fn read<R>(&self, f: impl FnOnce(&Table<K, V, S>) -> R) -> Option<R> {
        self.state.read().live().map(|l| f(&l.table))
    }

    /// Runs `f` under the write lock. Anything `f` pushes into the batch
    /// is disposed after the lock is released. `None` when absent.
    pub(crate) fn write<R>(
        &self,
        f: impl FnOnce(&mut Table<K, V, S>, &mut Evicted<K, V>) -> R,
    ) -> Option<R> {
        let (out, evicted) = {
            let mut state = self.state.write();
            let live = state.live_mut()?;
            let mut evicted = live.evicted();
            let out = f(&mut live.table, &mut evicted);
            (out, evicted)
        };
        drop(evicted);
        Some(out)
    }

    /// Opens a cursor holding the write lock until it is closed.
    pub(crate) fn cursor(&self) -> Result<Cursor<'_, K, V, S>> {
        let guard = RwLockWriteGuard::try_map(self.state.write(), |s| s.live_mut())
            .map_err(|_| Error::Uninitialized)?;
        let handles = guard.table.handles();
        let evicted = guard.evicted();
        Ok(Cursor {
            guard,
            evicted,
            handles,
            next: 0,
            current: None,
            position: 0,
        })
    }
}

impl<K, V, S> Drop for Container<K, V, S> {
    fn drop(&mut self) {
        if let Lifecycle::Live(live) = core::mem::replace(self.state.get_mut(), Lifecycle::Absent) {
            drop(live.into_evicted());
        }
    }
}

/// Shared cursor behind `MapIter` and `SetIter`.
///
/// Walks the slot handles captured when it was opened. Removing the
/// current entry unlinks it immediately; its destructors run once the
/// cursor is closed and the lock released.
pub(crate) struct Cursor<'a, K, V, S> {
    // Field order matters: the guard is released before `evicted` drops.
    guard: MappedRwLockWriteGuard<'a, Live<K, V, S>>,
    evicted: Evicted<K, V>,
    handles: Vec<Handle>,
    next: usize,
    current: Option<Handle>,
    position: usize,
}

impl<'a, K, V, S> Cursor<'a, K, V, S> {
    pub(crate) fn next(&mut self) -> Option<(&K, &V)> {
        self.current = None;
        let table = &self.guard.table;
        while let Some(&h) = self.handles.get(self.next) {
            self.next += 1;
            if let Some(pair) = table.entry(h) {
                self.current = Some(h);
                self.position += 1;
                return Some(pair);
            }
        }
        None
    }

    pub(crate) fn remove_current(&mut self) -> Result<()> {
        let h = self.current.take().ok_or(Error::NoCurrentEntry)?;
        if let Some(entry) = self.guard.table.remove_handle(h) {
            self.evicted.push_entry(entry);
        }
        Ok(())
    }

    pub(crate) fn position(&self) -> usize {
        self.position
    }

    pub(crate) fn remaining(&self) -> usize {
        self.handles.len() - self.next
    }

    pub(crate) fn close(self) {
        if self.evicted.len() > 0 {
            log::trace!(
                "iterator closed after {} entries, disposing {} removed",
                self.position,
                self.evicted.len()
            );
        }
    }
}

impl<K, V, S> Container<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    pub(crate) fn contains<Q>(&self, q: &Q) -> bool
    where
        K: core::borrow::Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.read(|t| t.find(q).is_some()).unwrap_or(false)
    }

    /// Removes `q` if present; false when absent or not live.
    pub(crate) fn remove<Q>(&self, q: &Q) -> bool
    where
        K: core::borrow::Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.write(|t, ev| match t.remove(q) {
            Some(entry) => {
                ev.push_entry(entry);
                true
            }
            None => false,
        })
        .unwrap_or(false)
    }

    /// Inserts or overwrites; true when the key was not present before.
    pub(crate) fn insert(&self, key: K, value: V) -> Result<bool> {
        self.write(|t, ev| match t.insert(key, value) {
            Some((dup, old)) => {
                ev.push_key(dup);
                ev.push_value(old);
                false
            }
            None => true,
        })
        .ok_or(Error::Uninitialized)
    }

    pub(crate) fn retain<F>(&self, keep: F)
    where
        F: FnMut(&K, &V) -> bool,
    {
        let _ = self.write(|t, ev| ev.extend(t.retain(keep)));
    }
}
