//! Library — the stores bound to one storage port.
//!
//! DESIGN
//! ======
//! The document, draft and settings stores share the persistent store; the
//! session cache gets its own (usually in-memory) store. Operations that
//! touch more than one store live here:
//!
//! - a successful document save clears the draft,
//! - deleting a document clears the draft that shadows it.
//!
//! ERROR HANDLING
//! ==============
//! Draft cleanup after a committed write is best effort. The committed write
//! already succeeded, so a failed cleanup is logged and the save still
//! reports success. A stale draft is harmless because it is advisory.

use std::sync::Arc;

use tracing::warn;

use super::documents::{Document, DocumentError, DocumentStore};
use super::drafts::DraftStore;
use super::session::SessionCache;
use super::settings::SettingsStore;
use crate::storage::{KvStore, MemoryStore};

#[derive(Clone)]
pub struct Library {
    pub documents: DocumentStore,
    pub drafts: DraftStore,
    pub settings: SettingsStore,
    pub session: SessionCache,
}

impl Library {
    #[must_use]
    pub fn new(store: Arc<dyn KvStore>, session_store: Arc<dyn KvStore>) -> Self {
        Self {
            documents: DocumentStore::new(Arc::clone(&store)),
            drafts: DraftStore::new(Arc::clone(&store)),
            settings: SettingsStore::new(store),
            session: SessionCache::new(session_store),
        }
    }

    /// Library with a persistent `store` and a fresh in-memory session cache.
    #[must_use]
    pub fn with_store(store: Arc<dyn KvStore>) -> Self {
        Self::new(store, Arc::new(MemoryStore::new()))
    }

    /// Fully in-memory library.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::with_store(Arc::new(MemoryStore::new()))
    }

    /// Create or update a document, then clear the draft.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::NotFound`] for a stale id, or a storage error.
    pub fn save_document(&self, id: Option<&str>, title: &str, content: &str) -> Result<Document, DocumentError> {
        let doc = self.documents.save(id, title, content)?;
        self.clear_draft_after_save(&doc);
        Ok(doc)
    }

    /// Title-keyed save, then clear the draft.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the collection cannot be written.
    pub fn save_by_title(&self, title: &str, content: &str) -> Result<Document, DocumentError> {
        let doc = self.documents.upsert_by_title(title, content)?;
        self.clear_draft_after_save(&doc);
        Ok(doc)
    }

    /// Delete a document and any draft or session entry that shadows it.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the collection cannot be read or written.
    pub fn delete_document(&self, id: &str) -> Result<bool, DocumentError> {
        if !self.documents.delete(id)? {
            return Ok(false);
        }
        match self.drafts.get() {
            Ok(Some(draft)) if draft.matches(Some(id)) => {
                if let Err(e) = self.drafts.clear() {
                    warn!(doc_id = %id, error = %e, "library: draft cleanup after delete failed");
                }
            }
            Ok(_) => {}
            Err(e) => warn!(doc_id = %id, error = %e, "library: draft lookup after delete failed"),
        }
        match self.session.get() {
            Ok(Some(entry)) if entry.id.as_deref() == Some(id) => {
                if let Err(e) = self.session.clear() {
                    warn!(doc_id = %id, error = %e, "library: session cleanup after delete failed");
                }
            }
            Ok(_) => {}
            Err(e) => warn!(doc_id = %id, error = %e, "library: session lookup after delete failed"),
        }
        Ok(true)
    }

    fn clear_draft_after_save(&self, doc: &Document) {
        if let Err(e) = self.drafts.clear() {
            warn!(doc_id = %doc.id, error = %e, "library: draft cleanup after save failed");
        }
    }
}

#[cfg(test)]
#[path = "library_test.rs"]
mod tests;
