// src/storage/file_store.rs
//! File-backed table persisted as JSON.
//!
//! The whole table lives in memory and is rewritten to disk after each
//! committed mutation. Writes go to a sibling temp file which is then renamed
//! over the table file, so a crash mid-write leaves the previous version
//! intact.
//!
//! # On-disk format
//! A JSON array of `[key, value]` pairs. Keys are not required to serialize as
//! JSON strings, so `Address`/`H256` keys work unchanged.

use super::{KeyValueStore, StorageError};
use crate::utils::serialization::{deserialize, serialize_pretty};
use log::{debug, info};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::fs;
use std::hash::Hash;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Durable key-value table stored in a single JSON file.
pub struct FileStore<K, V> {
    path: PathBuf,
    entries: RwLock<HashMap<K, V>>,
}

impl<K, V> FileStore<K, V>
where
    K: Eq + Hash + Serialize + DeserializeOwned,
    V: Serialize + DeserializeOwned,
{
    /// Opens the table at `path`, loading existing entries if the file exists.
    ///
    /// Parent directories are created on demand.
    ///
    /// # Errors
    /// - `StorageError::Io` if the directory or file cannot be read
    /// - `StorageError::Serialization` if the file is not a valid table
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let entries = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            let pairs: Vec<(K, V)> = deserialize(&raw)?;
            info!("loaded {} entries from {}", pairs.len(), path.display());
            pairs.into_iter().collect()
        } else {
            debug!("no table at {}, starting empty", path.display());
            HashMap::new()
        };

        Ok(FileStore {
            path,
            entries: RwLock::new(entries),
        })
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &HashMap<K, V>) -> Result<(), StorageError> {
        let pairs: Vec<(&K, &V)> = entries.iter().collect();
        let json = serialize_pretty(&pairs)?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Applies `new` under `key`, persists, and restores the previous entry if
    /// persisting fails.
    fn commit(
        &self,
        entries: &mut HashMap<K, V>,
        key: K,
        new: Option<V>,
    ) -> Result<(), StorageError>
    where
        K: Clone,
    {
        let previous = match new {
            Some(value) => entries.insert(key.clone(), value),
            None => entries.remove(&key),
        };

        if let Err(e) = self.persist(entries) {
            match previous {
                Some(value) => {
                    entries.insert(key, value);
                }
                None => {
                    entries.remove(&key);
                }
            }
            return Err(e);
        }
        Ok(())
    }
}

impl<K, V> KeyValueStore<K, V> for FileStore<K, V>
where
    K: Eq + Hash + Clone + Serialize + DeserializeOwned + Send + Sync,
    V: Clone + PartialEq + Serialize + DeserializeOwned + Send + Sync,
{
    fn get(&self, key: &K) -> Result<Option<V>, StorageError> {
        let entries = self.entries.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn put(&self, key: K, value: V) -> Result<(), StorageError> {
        let mut entries = self.entries.write().map_err(|_| StorageError::LockPoisoned)?;
        self.commit(&mut entries, key, Some(value))
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
        self.commit(&mut entries, key.clone(), new)?;
        Ok(true)
    }

    fn len(&self) -> Result<usize, StorageError> {
        let entries = self.entries.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers_core::types::{Address, H256};

    /// Table path inside a fresh directory; the directory lives as long as the guard.
    fn scratch_path() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tables").join("table.json");
        (dir, path)
    }

    #[test]
    fn test_entries_survive_reopen() {
        let (_dir, path) = scratch_path();
        {
            let store: FileStore<String, u64> = FileStore::open(&path).unwrap();
            store.put("did:ex:abc".to_string(), 42).unwrap();
            assert!(store.compare_and_swap(&"did:ex:def".to_string(), None, Some(7)).unwrap());
        }

        let reopened: FileStore<String, u64> = FileStore::open(&path).unwrap();
        assert_eq!(reopened.get(&"did:ex:abc".to_string()).unwrap(), Some(42));
        assert_eq!(reopened.get(&"did:ex:def".to_string()).unwrap(), Some(7));
        assert_eq!(reopened.len().unwrap(), 2);
    }

    #[test]
    fn test_non_string_keys_round_trip_through_disk() {
        let (_dir, path) = scratch_path();
        let hash = H256::repeat_byte(0xcc);
        let issuer = Address::repeat_byte(0x11);
        {
            let store: FileStore<H256, Address> = FileStore::open(&path).unwrap();
            store.put(hash, issuer).unwrap();
        }

        let reopened: FileStore<H256, Address> = FileStore::open(&path).unwrap();
        assert_eq!(reopened.get(&hash).unwrap(), Some(issuer));
    }

    #[test]
    fn test_failed_swap_does_not_touch_disk() {
        let (_dir, path) = scratch_path();
        let store: FileStore<String, u64> = FileStore::open(&path).unwrap();
        store.put("k".to_string(), 1).unwrap();

        assert!(!store.compare_and_swap(&"k".to_string(), None, Some(2)).unwrap());

        let reopened: FileStore<String, u64> = FileStore::open(&path).unwrap();
        assert_eq!(reopened.get(&"k".to_string()).unwrap(), Some(1));
    }

    #[test]
    fn test_corrupt_file_is_reported() {
        let (_dir, path) = scratch_path();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "not json").unwrap();

        let result: Result<FileStore<String, u64>, _> = FileStore::open(&path);
        assert!(matches!(result, Err(StorageError::Serialization(_))));
    }
}
