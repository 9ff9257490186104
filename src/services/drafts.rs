//! Draft store — the single transient shadow of an in-progress edit.
//!
//! A draft is advisory. It never touches the committed documents and is
//! cleared once a real save succeeds.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::now_ms;
use crate::storage::{DRAFT_KEY, KvStore, StorageError, read_json, write_json};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Draft {
    /// Id of the committed document this draft shadows, if it has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    pub content: String,
    /// Milliseconds since Unix epoch, stamped on save.
    #[serde(default)]
    pub last_modified: i64,
}

impl Draft {
    #[must_use]
    pub fn new(id: Option<String>, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self { id, title: title.into(), content: content.into(), last_modified: 0 }
    }

    /// Whether this draft belongs to the document identified by `id`.
    #[must_use]
    pub fn matches(&self, id: Option<&str>) -> bool {
        self.id.as_deref() == id
    }
}

#[derive(Clone)]
pub struct DraftStore {
    store: Arc<dyn KvStore>,
}

impl DraftStore {
    #[must_use]
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Persist `draft`, stamping `last_modified` with the current time.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the write fails.
    pub fn save(&self, draft: &Draft) -> Result<Draft, StorageError> {
        let stamped = Draft { last_modified: now_ms(), ..draft.clone() };
        write_json(self.store.as_ref(), DRAFT_KEY, &stamped)?;
        debug!(doc_id = ?stamped.id, len = stamped.content.len(), "drafts: saved");
        Ok(stamped)
    }

    /// # Errors
    ///
    /// Returns a [`StorageError`] if the draft cannot be read or decoded.
    pub fn get(&self) -> Result<Option<Draft>, StorageError> {
        read_json(self.store.as_ref(), DRAFT_KEY)
    }

    /// Remove the draft. Returns `true` if one existed.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the delete fails.
    pub fn clear(&self) -> Result<bool, StorageError> {
        self.store.delete(DRAFT_KEY)
    }
}

#[cfg(test)]
#[path = "drafts_test.rs"]
mod tests;
