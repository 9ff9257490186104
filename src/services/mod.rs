//! Domain services over the storage port.
//!
//! ARCHITECTURE
//! ============
//! Each store owns one storage key and its JSON shape. [`library::Library`]
//! binds them to a shared [`crate::storage::KvStore`] and enforces the rules
//! that span stores (a successful save clears the draft, deleting a document
//! clears its draft). The AI bridge and Markdown file helpers sit alongside.

pub mod ai;
pub mod documents;
pub mod drafts;
pub mod files;
pub mod library;
pub mod session;
pub mod settings;

use std::time::{SystemTime, UNIX_EPOCH};

/// Current time as milliseconds since Unix epoch.
#[must_use]
pub fn now_ms() -> i64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_millis()).unwrap_or(0)
}

/// Timestamp for a write that must sort strictly after `prior`.
#[must_use]
pub fn next_timestamp(prior: i64) -> i64 {
    now_ms().max(prior.saturating_add(1))
}
