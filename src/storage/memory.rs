//! In-memory storage adapter.
//!
//! Backs the session cache and tests. An optional byte capacity makes
//! writes fail with [`StorageError::QuotaExceeded`] once the total size of
//! keys and values would pass the limit, like a browser storage quota.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{KvStore, StorageError, validate_key};

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
    capacity: Option<usize>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that refuses writes once keys plus values exceed `bytes`.
    #[must_use]
    pub fn with_capacity_limit(bytes: usize) -> Self {
        Self { entries: Mutex::new(BTreeMap::new()), capacity: Some(bytes) }
    }

    /// Total bytes currently held (keys plus values).
    #[must_use]
    pub fn used_bytes(&self) -> usize {
        used(&self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn used(entries: &BTreeMap<String, String>) -> usize {
    entries.iter().map(|(k, v)| k.len() + v.len()).sum()
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        validate_key(key)?;
        Ok(self.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        validate_key(key)?;
        let mut entries = self.lock();
        if let Some(limit) = self.capacity {
            let current = entries.get(key).map_or(0, |v| key.len() + v.len());
            let needed = used(&entries) - current + key.len() + value.len();
            if needed > limit {
                return Err(StorageError::QuotaExceeded { key: key.to_string(), needed, limit });
            }
        }
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool, StorageError> {
        validate_key(key)?;
        Ok(self.lock().remove(key).is_some())
    }

    fn list_keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.lock().keys().cloned().collect())
    }
}

#[cfg(test)]
#[path = "memory_test.rs"]
mod tests;
