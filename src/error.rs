//! Error codes shared by every layer.
//!
//! Each module owns its own `thiserror` enum; this trait gives them a common
//! grepable code and retryable flag so the editor can turn any failure into a
//! structured notice.

/// Grepable error code and retryable flag for structured notices.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}
