//! Editor lifecycle states and the transitions between them.

use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EditorState {
    /// Resolving the initial buffer.
    Loading,
    /// Buffer matches the last saved snapshot.
    Idle,
    /// Buffer has unsaved changes.
    Editing,
    /// A save is in flight.
    Saving,
    /// An AI generation is writing into the buffer.
    Streaming,
}

impl EditorState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Idle => "idle",
            Self::Editing => "editing",
            Self::Saving => "saving",
            Self::Streaming => "streaming",
        }
    }

    /// Whether the controller may move from `self` to `next`.
    #[must_use]
    pub fn can_transition(self, next: Self) -> bool {
        use EditorState::{Editing, Idle, Loading, Saving, Streaming};
        matches!(
            (self, next),
            (Loading | Idle | Editing, Loading)
                | (Loading | Editing | Saving | Streaming, Idle)
                | (Idle | Saving | Streaming, Editing)
                | (Idle | Editing, Saving | Streaming)
        )
    }

    /// States in which the buffer holds a loaded document.
    #[must_use]
    pub fn is_loaded(self) -> bool {
        self != Self::Loading
    }
}

impl fmt::Display for EditorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
