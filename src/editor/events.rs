//! Events the editor publishes to front ends.

use serde::Serialize;

use super::state::EditorState;
use crate::error::ErrorCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Error,
}

/// Transient user-facing message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    /// `E_*` code when the notice reports an error.
    pub code: Option<&'static str>,
    pub message: String,
}

impl Notice {
    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Info, code: None, message: message.into() }
    }

    #[must_use]
    pub fn error(err: &dyn ErrorCode) -> Self {
        Self { level: NoticeLevel::Error, code: Some(err.error_code()), message: err.to_string() }
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.level == NoticeLevel::Error
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EditorEvent {
    StateChanged { state: EditorState },
    Saved { id: String, updated_at: i64 },
    DraftSaved { last_modified: i64 },
    /// Streamed text. Inserted into the buffer unless the generation is an
    /// edit preview.
    AiChunk { text: String, preview: bool },
    AiProgress { progress: u8 },
    Notice(Notice),
}
