//! Memoization table shared by all callers of an introspector.

use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;

/// Grows monotonically; entries are never replaced or evicted.
///
/// A lookup either returns the stored sequence or computes one and installs
/// it with an atomic get-or-insert. When callers race on the same key, every
/// caller gets the one sequence that ended up in the table.
pub struct ContextCache<K, T> {
    entries: DashMap<K, Arc<[T]>>,
}

impl<K: Eq + Hash, T> ContextCache<K, T> {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    pub fn get(&self, key: &K) -> Option<Arc<[T]>> {
        self.entries.get(key).map(|hit| Arc::clone(hit.value()))
    }

    /// The computation runs without holding a shard lock, so it may itself
    /// consult this or another cache.
    pub fn get_or_try_insert_with<E>(
        &self,
        key: K,
        compute: impl FnOnce(&K) -> Result<Vec<T>, E>,
    ) -> Result<Arc<[T]>, E> {
        if let Some(hit) = self.get(&key) {
            return Ok(hit);
        }
        let computed: Arc<[T]> = compute(&key)?.into();
        let installed = self.entries.entry(key).or_insert(computed);
        Ok(Arc::clone(installed.value()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Eq + Hash, T> Default for ContextCache<K, T> {
    fn default() -> Self {
        Self::new()
    }
}
