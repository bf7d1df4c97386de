// src/storage/memory.rs
//! In-memory table backed by a `HashMap`.
//!
//! Used for tests and for ephemeral service runs (`storage.backend = "memory"`).

use super::{KeyValueStore, StorageError};
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::RwLock;

/// Thread-safe in-memory key-value table.
///
/// - O(1) average case lookups and inserts
/// - Readers share the lock, writers hold it exclusively
/// - Contents are lost when the store is dropped
pub struct MemoryStore<K, V> {
    entries: RwLock<HashMap<K, V>>,
}

impl<K, V> MemoryStore<K, V>
where
    K: Eq + Hash,
{
    /// Creates a new empty store.
    pub fn new() -> Self {
        MemoryStore {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl<K, V> Default for MemoryStore<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> KeyValueStore<K, V> for MemoryStore<K, V>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Clone + PartialEq + Send + Sync,
{
    fn get(&self, key: &K) -> Result<Option<V>, StorageError> {
        let entries = self.entries.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn put(&self, key: K, value: V) -> Result<(), StorageError> {
        let mut entries = self.entries.write().map_err(|_| StorageError::LockPoisoned)?;
        entries.insert(key, value);
        Ok(())
    }

    fn compare_and_swap(
        &self,
        key: &K,
        expected: Option<&V>,
        new: Option<V>,
    ) -> Result<bool, StorageError> {
        let mut entries = self.entries.write().map_err(|_| StorageError::LockPoisoned)?;
        if entries.get(key) != expected {
            return Ok(false);
        }
        match new {
            Some(value) => {
                entries.insert(key.clone(), value);
            }
            None => {
                entries.remove(key);
            }
        }
        Ok(true)
    }

    fn len(&self) -> Result<usize, StorageError> {
        let entries = self.entries.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(entries.len())
    }
}
