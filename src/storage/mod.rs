// src/storage/mod.rs
//! Storage layer for the registries.
//!
//! The registries never touch a concrete map directly. They are handed a
//! [`KeyValueStore`] for each table they own, so the same invariant logic runs
//! against the in-memory store used in tests and the file-backed store used by
//! the service binary.

pub mod file_store;
pub mod memory;

pub use file_store::FileStore;
pub use memory::MemoryStore;

use thiserror::Error;

/// Failures raised by a storage backend.
///
/// These are never caused by caller input; they signal that the backing
/// medium could not be read or written.
#[derive(Error, Debug)]
pub enum StorageError {
    /// A lock guarding the store was poisoned by a panicking writer.
    #[error("storage lock poisoned")]
    LockPoisoned,

    /// Filesystem failure while loading or persisting a table.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A persisted table could not be encoded or decoded.
    #[error("storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An entry did not hold the value the caller had just read under the
    /// registry gate, so the tables no longer agree.
    #[error("storage conflict on {0}")]
    Conflict(String),
}

/// Key-value table abstraction used by the registries.
///
/// Implementations must make each individual call atomic: a concurrent reader
/// observes either the value before or after a `put`/`compare_and_swap`,
/// never a partially written one.
pub trait KeyValueStore<K, V>: Send + Sync {
    /// Returns a copy of the value stored under `key`, if any.
    fn get(&self, key: &K) -> Result<Option<V>, StorageError>;

    /// Unconditionally stores `value` under `key`.
    fn put(&self, key: K, value: V) -> Result<(), StorageError>;

    /// Replaces the entry under `key` only if it currently equals `expected`.
    ///
    /// # Arguments
    /// * `key` - Entry to operate on
    /// * `expected` - `None` requires the key to be absent
    /// * `new` - `None` removes the entry
    ///
    /// # Returns
    /// `Ok(true)` if the swap happened, `Ok(false)` if the current value did
    /// not match `expected` (nothing is changed in that case).
    fn compare_and_swap(&self, key: &K, expected: Option<&V>, new: Option<V>)
        -> Result<bool, StorageError>;

    /// Number of entries currently stored.
    fn len(&self) -> Result<usize, StorageError>;

    fn contains(&self, key: &K) -> Result<bool, StorageError> {
        Ok(self.get(key)?.is_some())
    }

    fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.len()? == 0)
    }
}
