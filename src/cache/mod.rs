//! Memoizing caches of decoded resources.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};

pub mod typed;

/// A map from key to decoded value with a get-or-compute contract.
///
/// Misses are remembered as `None` just like hits. Errors are returned to the caller and not
/// remembered, so a later call tries again. The lock is held while computing, which keeps two
/// threads from decoding the same value twice.
pub struct ResourceCache<K, V> {
    entries: Mutex<HashMap<K, Option<Arc<V>>>>,
}

impl<K, V> Default for ResourceCache<K, V> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl<K: Eq + Hash + Clone, V> ResourceCache<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_compute<E, F>(&self, key: &K, compute: F) -> Result<Option<Arc<V>>, E>
    where
        F: FnOnce(&K) -> Result<Option<V>, E>,
    {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = entries.get(key) {
            return Ok(entry.clone());
        }

        let value = compute(key)?.map(Arc::new);
        entries.insert(key.clone(), value.clone());
        Ok(value)
    }

    /// Whether `key` has been computed, whatever the outcome.
    pub fn contains(&self, key: &K) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
