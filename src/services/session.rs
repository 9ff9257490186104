//! Session cache — per-process shadow of the open buffer.
//!
//! Lives in its own store (in memory by default) so it disappears with the
//! process, the way browser session storage disappears with the tab.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::storage::{KvStore, SESSION_KEY, StorageError, read_json, write_json};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    pub content: String,
}

#[derive(Clone)]
pub struct SessionCache {
    store: Arc<dyn KvStore>,
}

impl SessionCache {
    #[must_use]
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// # Errors
    ///
    /// Returns a [`StorageError`] if the entry cannot be read or decoded.
    pub fn get(&self) -> Result<Option<SessionEntry>, StorageError> {
        read_json(self.store.as_ref(), SESSION_KEY)
    }

    /// # Errors
    ///
    /// Returns a [`StorageError`] if the write fails.
    pub fn put(&self, entry: &SessionEntry) -> Result<(), StorageError> {
        write_json(self.store.as_ref(), SESSION_KEY, entry)
    }

    /// # Errors
    ///
    /// Returns a [`StorageError`] if the delete fails.
    pub fn clear(&self) -> Result<bool, StorageError> {
        self.store.delete(SESSION_KEY)
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
