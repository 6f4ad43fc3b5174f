//! Store implementation
//!
//! HashMap guarded by a single RwLock.

use std::collections::{BTreeMap, HashMap};

use parking_lot::RwLock;

use crate::error::{KvError, Result};

/// In-memory key/value map
pub struct Store {
    data: RwLock<HashMap<String, String>>,

    /// Upper bound on distinct keys, if any
    max_keys: Option<usize>,
}

impl Store {
    /// Create a new empty, unbounded Store
    pub fn new() -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
            max_keys: None,
        }
    }

    /// Create a Store that refuses new keys beyond `limit`
    pub fn with_max_keys(limit: usize) -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
            max_keys: Some(limit),
        }
    }

    /// Insert or overwrite a value (write lock)
    ///
    /// Overwriting an existing key always succeeds; only a new key can hit
    /// the capacity limit.
    pub fn put(&self, key: String, value: String) -> Result<()> {
        let mut data = self.data.write();

        if let Some(limit) = self.max_keys {
            if data.len() >= limit && !data.contains_key(&key) {
                return Err(KvError::CapacityExceeded { limit });
            }
        }

        data.insert(key, value);
        Ok(())
    }

    /// Insert or overwrite, running `record` inside the same write lock
    ///
    /// `record` runs after the capacity check and before the insert. If it
    /// fails, the store is left unchanged and its error is returned. Holding
    /// the lock across both keeps concurrent writers in the same order in the
    /// store as in whatever `record` appends to.
    pub fn put_with<F>(&self, key: String, value: String, record: F) -> Result<()>
    where
        F: FnOnce() -> Result<()>,
    {
        let mut data = self.data.write();

        if let Some(limit) = self.max_keys {
            if data.len() >= limit && !data.contains_key(&key) {
                return Err(KvError::CapacityExceeded { limit });
            }
        }

        record()?;
        data.insert(key, value);
        Ok(())
    }

    /// Insert or overwrite without checking the capacity limit
    ///
    /// Used when replaying the log: whatever was accepted before must be
    /// restored even if the limit has since been lowered.
    pub(crate) fn restore(&self, key: String, value: String) {
        self.data.write().insert(key, value);
    }

    /// Get the current value (read lock)
    pub fn get(&self, key: &str) -> Result<String> {
        self.data
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| KvError::NotFound {
                key: key.to_string(),
            })
    }

    /// Remove a key (write lock). Absent keys are a no-op.
    pub fn delete(&self, key: &str) -> Result<()> {
        self.remove(key);
        Ok(())
    }

    /// Remove a key, then run `record` while still holding the write lock
    ///
    /// The removal stands whatever `record` returns.
    pub fn delete_with<F, T>(&self, key: &str, record: F) -> T
    where
        F: FnOnce() -> T,
    {
        let mut data = self.data.write();
        data.remove(key);
        record()
    }

    /// Remove a key, reporting whether it was present
    pub(crate) fn remove(&self, key: &str) -> bool {
        self.data.write().remove(key).is_some()
    }

    /// Whether the key is currently present
    pub fn contains_key(&self, key: &str) -> bool {
        self.data.read().contains_key(key)
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// The configured key limit
    pub fn max_keys(&self) -> Option<usize> {
        self.max_keys
    }

    /// Sorted copy of every entry
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.data
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}
