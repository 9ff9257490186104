//! Storage port — string key-value persistence behind a trait.
//!
//! DESIGN
//! ======
//! Every store in the crate talks to a [`KvStore`] instead of a global.
//! Values are plain strings; the JSON helpers below encode the typed
//! collections. Two adapters exist: [`MemoryStore`] (optionally
//! capacity-limited to model quota exhaustion) and [`FileStore`] (one file
//! per key under a data directory).
//!
//! No transactional guarantees: concurrent writers are not coordinated and
//! the last write wins.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::ErrorCode;

// =============================================================================
// KEYS
// =============================================================================

/// Committed documents (JSON array).
pub const DOCUMENTS_KEY: &str = "plotcontinuum_documents";
/// The single in-progress draft (JSON object).
pub const DRAFT_KEY: &str = "plotcontinuum_draft_document";
/// AI settings (JSON object, fields merged over defaults).
pub const AI_SETTINGS_KEY: &str = "plotcontinuum_ai_settings";
/// User-managed model list (JSON array).
pub const AI_MODELS_KEY: &str = "plotcontinuum_ai_models";
/// Raw API key string.
pub const API_KEY_KEY: &str = "plotcontinuum_api_key";
/// Session cache entry (JSON object, session store only).
pub const SESSION_KEY: &str = "plotcontinuum_session";

// =============================================================================
// ERROR
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("storage quota exceeded writing {key}: {needed} bytes over limit {limit}")]
    QuotaExceeded { key: String, needed: usize, limit: usize },
    #[error("invalid storage key: {0:?}")]
    InvalidKey(String),
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("corrupt value under {key}: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("value encode failed: {0}")]
    Encode(serde_json::Error),
}

impl ErrorCode for StorageError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Unavailable(_) => "E_STORAGE_UNAVAILABLE",
            Self::QuotaExceeded { .. } => "E_STORAGE_QUOTA",
            Self::InvalidKey(_) => "E_STORAGE_KEY",
            Self::Io(_) => "E_STORAGE_IO",
            Self::Corrupt { .. } => "E_STORAGE_CORRUPT",
            Self::Encode(_) => "E_STORAGE_ENCODE",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Io(_))
    }
}

// =============================================================================
// PORT
// =============================================================================

/// Synchronous string key-value capability.
pub trait KvStore: Send + Sync {
    /// Read the value under `key`, or `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the backend rejects the write.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key`. Returns `true` if a value was present.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the backend cannot be written.
    fn delete(&self, key: &str) -> Result<bool, StorageError>;

    /// All keys currently present, sorted.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the backend cannot be listed.
    fn list_keys(&self) -> Result<Vec<String>, StorageError>;
}

// =============================================================================
// JSON HELPERS
// =============================================================================

/// Read and decode a JSON value stored under `key`.
///
/// # Errors
///
/// Returns [`StorageError::Corrupt`] if the stored text is not valid JSON for `T`.
pub fn read_json<T: DeserializeOwned>(store: &dyn KvStore, key: &str) -> Result<Option<T>, StorageError> {
    let Some(raw) = store.get(key)? else {
        return Ok(None);
    };
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|source| StorageError::Corrupt { key: key.to_string(), source })
}

/// Encode `value` as JSON and store it under `key`.
///
/// # Errors
///
/// Returns a [`StorageError`] if encoding or the write fails.
pub fn write_json<T: Serialize + ?Sized>(store: &dyn KvStore, key: &str, value: &T) -> Result<(), StorageError> {
    let raw = serde_json::to_string(value).map_err(StorageError::Encode)?;
    store.set(key, &raw)
}

/// Keys are restricted to characters that are safe as file names.
pub(crate) fn validate_key(key: &str) -> Result<(), StorageError> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        && !key.starts_with('.');
    if valid { Ok(()) } else { Err(StorageError::InvalidKey(key.to_string())) }
}

// =============================================================================
// TEST HELPERS
// =============================================================================

#[cfg(test)]
pub mod test_helpers {
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;

    /// Memory store whose writes can be switched to fail on demand.
    pub struct FlakyStore {
        inner: MemoryStore,
        fail_writes: AtomicBool,
    }

    impl FlakyStore {
        #[must_use]
        pub fn new() -> Self {
            Self { inner: MemoryStore::new(), fail_writes: AtomicBool::new(false) }
        }

        pub fn fail_writes(&self, fail: bool) {
            self.fail_writes.store(fail, Ordering::SeqCst);
        }

        fn check(&self) -> Result<(), StorageError> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(StorageError::Unavailable("writes disabled".into()));
            }
            Ok(())
        }
    }

    impl Default for FlakyStore {
        fn default() -> Self {
            Self::new()
        }
    }

    impl KvStore for FlakyStore {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
            self.check()?;
            self.inner.set(key, value)
        }

        fn delete(&self, key: &str) -> Result<bool, StorageError> {
            self.check()?;
            self.inner.delete(key)
        }

        fn list_keys(&self) -> Result<Vec<String>, StorageError> {
            self.inner.list_keys()
        }
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
