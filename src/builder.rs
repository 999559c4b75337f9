//! Builders for configuring containers before construction.

use crate::container::Destructor;
use crate::map::IdentifierMap;
use crate::set::IdentifierSet;
use core::hash::{BuildHasher, Hash};
use std::collections::hash_map::RandomState;

/// Configures an [`IdentifierMap`]: initial capacity, hasher and the
/// destructors invoked for departing keys and values.
pub struct MapBuilder<K, V, S = RandomState> {
    capacity: usize,
    hasher: S,
    key_destructor: Option<Destructor<K>>,
    value_destructor: Option<Destructor<V>>,
}

impl<K, V> MapBuilder<K, V> {
    pub fn new() -> Self {
        Self {
            capacity: 0,
            hasher: RandomState::new(),
            key_destructor: None,
            value_destructor: None,
        }
    }
}

impl<K, V> Default for MapBuilder<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> MapBuilder<K, V, S> {
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn hasher<S2>(self, hasher: S2) -> MapBuilder<K, V, S2> {
        MapBuilder {
            capacity: self.capacity,
            hasher,
            key_destructor: self.key_destructor,
            value_destructor: self.value_destructor,
        }
    }

    pub fn key_destructor<F>(mut self, f: F) -> Self
    where
        F: Fn(K) + Send + Sync + 'static,
    {
        self.key_destructor = Some(Box::new(f));
        self
    }

    pub fn value_destructor<F>(mut self, f: F) -> Self
    where
        F: Fn(V) + Send + Sync + 'static,
    {
        self.value_destructor = Some(Box::new(f));
        self
    }

    pub fn build(self) -> IdentifierMap<K, V, S>
    where
        K: Eq + Hash,
        S: BuildHasher + Clone,
    {
        IdentifierMap::from_parts(
            self.hasher,
            self.capacity,
            self.key_destructor,
            self.value_destructor,
        )
    }
}

/// Configures an [`IdentifierSet`].
pub struct SetBuilder<K, S = RandomState> {
    capacity: usize,
    hasher: S,
    destructor: Option<Destructor<K>>,
}

impl<K> SetBuilder<K> {
    pub fn new() -> Self {
        Self {
            capacity: 0,
            hasher: RandomState::new(),
            destructor: None,
        }
    }
}

impl<K> Default for SetBuilder<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, S> SetBuilder<K, S> {
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn hasher<S2>(self, hasher: S2) -> SetBuilder<K, S2> {
        SetBuilder {
            capacity: self.capacity,
            hasher,
            destructor: self.destructor,
        }
    }

    pub fn destructor<F>(mut self, f: F) -> Self
    where
        F: Fn(K) + Send + Sync + 'static,
    {
        self.destructor = Some(Box::new(f));
        self
    }

    pub fn build(self) -> IdentifierSet<K, S>
    where
        K: Eq + Hash,
        S: BuildHasher + Clone,
    {
        IdentifierSet::from_parts(self.hasher, self.capacity, self.destructor)
    }
}
