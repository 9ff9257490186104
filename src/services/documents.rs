//! Document store — committed documents under one storage key.
//!
//! DESIGN
//! ======
//! The whole collection is a JSON array read and rewritten on every change.
//! Identity is the generated id; [`DocumentStore::upsert_by_title`] offers
//! the title-keyed variant where the title itself is the identity.
//!
//! Updates always move `updated_at` strictly forward, even when two saves
//! land in the same millisecond.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use super::{next_timestamp, now_ms};
use crate::error::ErrorCode;
use crate::storage::{DOCUMENTS_KEY, KvStore, StorageError, read_json, write_json};

// =============================================================================
// TYPES
// =============================================================================

/// A committed Markdown document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub title: String,
    pub content: String,
    /// Milliseconds since Unix epoch.
    pub created_at: i64,
    /// Milliseconds since Unix epoch. Strictly increases on every update.
    pub updated_at: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("document not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ErrorCode for DocumentError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "E_DOCUMENT_NOT_FOUND",
            Self::Storage(e) => e.error_code(),
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Storage(e) if e.retryable())
    }
}

// =============================================================================
// STORE
// =============================================================================

#[derive(Clone)]
pub struct DocumentStore {
    store: Arc<dyn KvStore>,
}

impl DocumentStore {
    #[must_use]
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// All documents in creation order.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the collection cannot be read or decoded.
    pub fn list(&self) -> Result<Vec<Document>, DocumentError> {
        Ok(read_json::<Vec<Document>>(self.store.as_ref(), DOCUMENTS_KEY)?.unwrap_or_default())
    }

    /// Look up a document by id.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the collection cannot be read.
    pub fn find(&self, id: &str) -> Result<Option<Document>, DocumentError> {
        Ok(self.list()?.into_iter().find(|doc| doc.id == id))
    }

    /// Fetch a document by id.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::NotFound`] if no document has this id.
    pub fn get(&self, id: &str) -> Result<Document, DocumentError> {
        self.find(id)?
            .ok_or_else(|| DocumentError::NotFound(id.to_string()))
    }

    /// Look up a document by exact title.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the collection cannot be read.
    pub fn find_by_title(&self, title: &str) -> Result<Option<Document>, DocumentError> {
        Ok(self.list()?.into_iter().find(|doc| doc.title == title))
    }

    /// Create a new document with a generated id.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the collection cannot be written.
    pub fn create(&self, title: &str, content: &str) -> Result<Document, DocumentError> {
        let mut docs = self.list()?;
        let now = now_ms();
        let doc = Document {
            id: Uuid::new_v4().to_string(),
            title: title.to_string(),
            content: content.to_string(),
            created_at: now,
            updated_at: now,
        };
        docs.push(doc.clone());
        self.write(&docs)?;
        info!(doc_id = %doc.id, len = doc.content.len(), "documents: created");
        Ok(doc)
    }

    /// Replace title and content of an existing document in place.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::NotFound`] if no document has this id.
    pub fn update(&self, id: &str, title: &str, content: &str) -> Result<Document, DocumentError> {
        let mut docs = self.list()?;
        let Some(doc) = docs.iter_mut().find(|doc| doc.id == id) else {
            return Err(DocumentError::NotFound(id.to_string()));
        };
        doc.title = title.to_string();
        doc.content = content.to_string();
        doc.updated_at = next_timestamp(doc.updated_at);
        let updated = doc.clone();
        self.write(&docs)?;
        debug!(doc_id = %id, len = updated.content.len(), "documents: updated");
        Ok(updated)
    }

    /// Update when `id` is given, otherwise create.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::NotFound`] for an id that no longer exists.
    pub fn save(&self, id: Option<&str>, title: &str, content: &str) -> Result<Document, DocumentError> {
        match id {
            Some(id) => self.update(id, title, content),
            None => self.create(title, content),
        }
    }

    /// Title-keyed save: update the document with this title, or create one.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the collection cannot be written.
    pub fn upsert_by_title(&self, title: &str, content: &str) -> Result<Document, DocumentError> {
        match self.find_by_title(title)? {
            Some(existing) => self.update(&existing.id, title, content),
            None => self.create(title, content),
        }
    }

    /// Delete by id. Returns `false`, without writing, if the id is unknown.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the collection cannot be read or written.
    pub fn delete(&self, id: &str) -> Result<bool, DocumentError> {
        let mut docs = self.list()?;
        let before = docs.len();
        docs.retain(|doc| doc.id != id);
        if docs.len() == before {
            return Ok(false);
        }
        self.write(&docs)?;
        info!(doc_id = %id, "documents: deleted");
        Ok(true)
    }

    fn write(&self, docs: &[Document]) -> Result<(), DocumentError> {
        write_json(self.store.as_ref(), DOCUMENTS_KEY, docs)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "documents_test.rs"]
mod tests;
