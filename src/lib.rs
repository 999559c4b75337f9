//! bitcache: concurrent maps and sets keyed by content identifiers.
//!
//! Identifiers name immutable content; the containers track which
//! identifiers are known and what, if anything, is associated with each.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: a container whose table and lock are one unit, so no caller can
//!   reach the table without going through the lock.
//! - Layers:
//!   - Table<K, V, S>: structural map with stable generational handles
//!     (slotmap storage, hashbrown index). Knows nothing about locking.
//!   - Container<K, V, S>: one `parking_lot::RwLock` around an explicit
//!     lifecycle state (`Absent` / `Live`), plus destructor plumbing.
//!   - IdentifierMap / IdentifierSet: public API. The set is a container of
//!     `()` values with an extra atomic `replace`.
//!   - Filter: Bloom filter over `Id` digests, built standalone or as a
//!     snapshot of an `IdentifierSet<Id>`. A plain value, not locked.
//!
//! Locking
//! - `lookup`, `lookup_with`, `contains`, `count`, `keys`: read lock,
//!   released before the call returns. `lookup` hands back a clone;
//!   `lookup_with` runs a closure on the stored value under the lock.
//! - `insert`, `remove`, `replace`, `clear`, `retain`: write lock, held only
//!   for the call's own critical section.
//! - `init` / `reset`: write lock while the state flips between `Absent`
//!   and `Live`. The lock itself outlives every reset, so a reset container
//!   is safe to use; operations either no-op or report
//!   `Error::Uninitialized`.
//! - Iterators take the write lock when opened and release it on `done()`
//!   (or drop). Iteration is therefore self-synchronizing: other threads
//!   block until the iterator is closed. The thread that owns an open
//!   iterator must not call back into the same container (the lock is not
//!   reentrant).
//!
//! Destructors
//! - Optional callbacks receive ownership of each departing key and value
//!   exactly once: on `remove`, `replace`, `clear`, `retain`, iterator
//!   removal, `reset`, drop of the container, and for the incoming key and
//!   displaced value when `insert` overwrites an existing key.
//! - They never run under the lock. Critical sections unlink entries into a
//!   batch that is disposed after the guard is released, so a destructor
//!   may re-enter the container.
//!
//! Notes and non-goals
//! - No persistence format, wire protocol or hashing scheme; identifiers
//!   only need `Hash + Eq`. `Id` is a ready-made digest key.
//! - Iteration order is unspecified.

mod builder;
mod container;
mod container_proptest;
mod error;
mod filter;
mod id;
mod map;
mod set;
mod table;

// Public surface
pub use builder::{MapBuilder, SetBuilder};
pub use container::Destructor;
pub use error::{Error, FilterError, IdError, Result};
pub use filter::{Filter, MergeOp, BITS_PER_ELEMENT, DEFAULT_CAPACITY};
pub use id::{Id, IdKind};
pub use map::{IdentifierMap, MapIter};
pub use set::{IdentifierSet, SetIter};
