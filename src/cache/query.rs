//! Keyed store of infinite list data.
//!
//! Each update runs under the store lock, so two updates scheduled by
//! different events never interleave.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::InfiniteData;

/// Infinite list data keyed by query, e.g. `"feed"` or `"profile:rex"`
pub struct InfiniteQueryCache<T> {
    queries: Mutex<HashMap<String, InfiniteData<T>>>,
}

impl<T> Default for InfiniteQueryCache<T> {
    fn default() -> Self {
        Self {
            queries: Mutex::new(HashMap::new()),
        }
    }
}

impl<T> InfiniteQueryCache<T> {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, InfiniteData<T>>> {
        self.queries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the data for a key with `update(old)`. Returning `None`
    /// removes the entry.
    pub fn set_query_data<F>(&self, key: &str, update: F)
    where
        F: FnOnce(Option<InfiniteData<T>>) -> Option<InfiniteData<T>>,
    {
        let mut queries = self.lock();
        let old = queries.remove(key);
        if let Some(new) = update(old) {
            queries.insert(key.to_string(), new);
        }
    }

    /// Apply `update` to every entry whose key starts with `prefix`.
    /// Returns how many entries were visited.
    pub fn set_queries_data<F>(&self, prefix: &str, mut update: F) -> usize
    where
        F: FnMut(Option<InfiniteData<T>>) -> Option<InfiniteData<T>>,
    {
        let mut queries = self.lock();
        let keys: Vec<String> = queries
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect();
        for key in &keys {
            let old = queries.remove(key);
            if let Some(new) = update(old) {
                queries.insert(key.clone(), new);
            }
        }
        keys.len()
    }

    /// Drop the data for a key so the next read refetches.
    pub fn invalidate(&self, key: &str) -> bool {
        self.lock().remove(key).is_some()
    }

    /// Drop everything, e.g. on logout.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Number of cached queries
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing is cached
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl<T: Clone> InfiniteQueryCache<T> {
    /// Snapshot of the data for a key
    pub fn get_query_data(&self, key: &str) -> Option<InfiniteData<T>> {
        self.lock().get(key).cloned()
    }
}
