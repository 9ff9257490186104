//! Editor — the controller that owns the open document buffer.
//!
//! DESIGN
//! ======
//! One [`Session`] (state, identity, title, buffer, last-saved snapshot and
//! the active AI generation) lives behind a single async mutex. The front
//! end, the autosave and draft timers, and the AI streaming loop all go
//! through that one reference and read the buffer at write time. The lock is
//! never held across network I/O: a generation awaits each chunk unlocked,
//! then locks briefly to insert it.
//!
//! Insert-mode generations track an anchor offset. Every user edit reports a
//! [`Splice`], and the anchor (or the edit span) is remapped through it, so
//! generated text keeps landing right after the originally selected text.
//!
//! ERROR HANDLING
//! ==============
//! Persistence and AI failures are logged, published as a [`Notice`] event
//! and returned to the caller. The buffer is never rolled back; a failed save
//! leaves it dirty and editable.

pub mod buffer;
pub mod events;
pub mod state;
pub mod timers;

use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{Mutex, broadcast};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub use buffer::{Buffer, BufferError, Splice};
pub use events::{EditorEvent, Notice, NoticeLevel};
pub use state::EditorState;
pub use timers::{EditorTimers, spawn_timers};

use crate::error::ErrorCode;
use crate::llm::LlmChat;
use crate::services::ai::{self, AiError, AiEvent, AiTask, Generation, PROGRESS_CAP, PROGRESS_DONE};
use crate::services::documents::{Document, DocumentError};
use crate::services::drafts::Draft;
use crate::services::files::{self, FileError};
use crate::services::library::Library;
use crate::services::session::SessionEntry;
use crate::services::settings::AiSettings;
use crate::storage::StorageError;

pub const DEFAULT_TITLE: &str = "Untitled";
pub const DEFAULT_CONTENT: &str = "# Start writing";
const EVENT_CAPACITY: usize = 256;

// =============================================================================
// ERROR
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    #[error("invalid editor transition: {from} -> {to}")]
    InvalidTransition { from: EditorState, to: EditorState },
    #[error("no document loaded")]
    NotLoaded,
    #[error("selection is empty")]
    EmptySelection,
    #[error(transparent)]
    Buffer(#[from] BufferError),
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Ai(#[from] AiError),
    #[error(transparent)]
    File(#[from] FileError),
}

impl ErrorCode for EditorError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidTransition { .. } => "E_INVALID_TRANSITION",
            Self::NotLoaded => "E_NOT_LOADED",
            Self::EmptySelection => "E_EMPTY_SELECTION",
            Self::Buffer(_) => "E_INVALID_RANGE",
            Self::Document(e) => e.error_code(),
            Self::Storage(e) => e.error_code(),
            Self::Ai(e) => e.error_code(),
            Self::File(e) => e.error_code(),
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::Document(e) => e.retryable(),
            Self::Storage(e) => e.retryable(),
            Self::Ai(e) => e.retryable(),
            _ => false,
        }
    }
}

// =============================================================================
// TYPES
// =============================================================================

/// Which document to open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenTarget {
    /// A fresh, unsaved document.
    New,
    /// A committed document by id.
    Id(String),
    /// A committed document by title; a new document with that title if none exists.
    Title(String),
}

/// Where the loaded buffer came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    Session,
    Draft,
    Document,
    Template,
}

/// How an AI generation attaches to the buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AiMode {
    /// Continue the whole buffer at its end.
    Append,
    /// Continue the selected text, inserting right after it.
    Insert { selection: Range<usize> },
    /// Rewrite the selection (or the whole buffer) following `instruction`.
    Edit { selection: Option<Range<usize>>, instruction: String },
}

/// Point-in-time copy of the editor for front ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorSnapshot {
    pub state: EditorState,
    pub doc_id: Option<String>,
    pub title: String,
    pub content: String,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Saved {
    title: String,
    content: String,
}

#[derive(Debug, Clone, Copy)]
enum Target {
    Insert { anchor: usize },
    Replace { start: usize, end: usize },
}

#[derive(Debug)]
struct ActiveGeneration {
    id: u64,
    target: Target,
}

#[derive(Debug)]
struct Session {
    state: EditorState,
    doc_id: Option<String>,
    title: String,
    buffer: Buffer,
    saved: Option<Saved>,
    generation: Option<ActiveGeneration>,
    next_generation: u64,
}

impl Session {
    fn new() -> Self {
        Self {
            state: EditorState::Loading,
            doc_id: None,
            title: String::new(),
            buffer: Buffer::default(),
            saved: None,
            generation: None,
            next_generation: 0,
        }
    }

    fn dirty(&self) -> bool {
        self.saved
            .as_ref()
            .is_none_or(|saved| saved.title != self.title || saved.content != self.buffer.as_str())
    }

    fn mark_saved(&mut self) {
        self.saved = Some(Saved { title: self.title.clone(), content: self.buffer.as_str().to_string() });
    }

    /// Resting state once nothing is in flight.
    fn settled(&self) -> EditorState {
        if self.dirty() { EditorState::Editing } else { EditorState::Idle }
    }

    fn remap(&mut self, splice: Splice) {
        let Some(generation) = self.generation.as_mut() else {
            return;
        };
        match &mut generation.target {
            Target::Insert { anchor } => *anchor = splice.map_left(*anchor),
            Target::Replace { start, end } => {
                *start = splice.map_right(*start);
                *end = splice.map_left(*end).max(*start);
            }
        }
    }

    fn snapshot(&self) -> EditorSnapshot {
        EditorSnapshot {
            state: self.state,
            doc_id: self.doc_id.clone(),
            title: self.title.clone(),
            content: self.buffer.as_str().to_string(),
            dirty: self.dirty(),
        }
    }
}

// =============================================================================
// EDITOR
// =============================================================================

#[derive(Clone)]
pub struct Editor {
    session: Arc<Mutex<Session>>,
    library: Library,
    events: broadcast::Sender<EditorEvent>,
}

impl Editor {
    /// Editor in the `Loading` state; call [`Editor::load`] next.
    #[must_use]
    pub fn new(library: Library) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self { session: Arc::new(Mutex::new(Session::new())), library, events }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<EditorEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> EditorSnapshot {
        self.session.lock().await.snapshot()
    }

    pub async fn state(&self) -> EditorState {
        self.session.lock().await.state
    }

    // =========================================================================
    // LOAD
    // =========================================================================

    /// Resolve the buffer for `target`: session cache, then draft, then the
    /// committed document, then the default template.
    ///
    /// A missing document is reported as a notice and falls back to the
    /// template; it is not returned as an error.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::InvalidTransition`] while saving or streaming.
    pub async fn load(&self, target: OpenTarget) -> Result<LoadSource, EditorError> {
        let mut guard = self.session.lock().await;
        self.transition(&mut guard, EditorState::Loading)?;
        guard.generation = None;

        let (committed, title_hint) = self.resolve_committed(&target);
        let missing = matches!(target, OpenTarget::Id(_)) && committed.is_none();
        let id = committed.as_ref().map(|doc| doc.id.clone());
        let shadows_allowed = !missing && (committed.is_some() || target == OpenTarget::New);

        let session_entry = shadows_allowed.then(|| self.cached_session(id.as_deref())).flatten();
        let draft = if shadows_allowed && session_entry.is_none() { self.cached_draft(id.as_deref()) } else { None };

        let template_title = title_hint.unwrap_or_else(|| DEFAULT_TITLE.to_string());
        let (source, title, content) = if let Some(entry) = session_entry {
            (LoadSource::Session, entry.title, entry.content)
        } else if let Some(draft) = draft {
            (LoadSource::Draft, draft.title, draft.content)
        } else if let Some(doc) = &committed {
            (LoadSource::Document, doc.title.clone(), doc.content.clone())
        } else {
            (LoadSource::Template, template_title.clone(), DEFAULT_CONTENT.to_string())
        };

        let s = &mut *guard;
        s.doc_id = id;
        s.title = title;
        s.buffer = Buffer::new(content);
        s.saved = match (&committed, source) {
            (Some(doc), _) => Some(Saved { title: doc.title.clone(), content: doc.content.clone() }),
            (None, LoadSource::Template) => {
                Some(Saved { title: template_title, content: DEFAULT_CONTENT.to_string() })
            }
            (None, _) => None,
        };

        if source == LoadSource::Draft && s.dirty() {
            self.notify(Notice::info("Recovered unsaved draft"));
        }
        info!(doc_id = ?s.doc_id, source = ?source, len = s.buffer.len(), "editor: loaded");
        self.transition(s, EditorState::Idle)?;
        Ok(source)
    }

    /// Open a committed document, refusing an id that no longer exists
    /// instead of falling back to the template.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::Document`] for an unknown id, leaving the editor
    /// untouched.
    pub async fn open_existing(&self, id: &str) -> Result<LoadSource, EditorError> {
        self.library.documents.get(id)?;
        self.load(OpenTarget::Id(id.to_string())).await
    }

    fn resolve_committed(&self, target: &OpenTarget) -> (Option<Document>, Option<String>) {
        let found = match target {
            OpenTarget::New => return (None, None),
            OpenTarget::Id(id) => self.library.documents.find(id),
            OpenTarget::Title(title) => self.library.documents.find_by_title(title),
        };
        let title_hint = match target {
            OpenTarget::Title(title) => Some(title.clone()),
            _ => None,
        };
        match found {
            Ok(Some(doc)) => (Some(doc), title_hint),
            Ok(None) => {
                if let OpenTarget::Id(id) = target {
                    let err = DocumentError::NotFound(id.clone());
                    warn!(doc_id = %id, "editor: requested document not found");
                    self.notify(Notice::error(&err));
                }
                (None, title_hint)
            }
            Err(e) => {
                warn!(error = %e, "editor: document lookup failed");
                self.notify(Notice::error(&e));
                (None, title_hint)
            }
        }
    }

    fn cached_session(&self, id: Option<&str>) -> Option<SessionEntry> {
        match self.library.session.get() {
            Ok(entry) => entry.filter(|entry| entry.id.as_deref() == id),
            Err(e) => {
                warn!(error = %e, "editor: session cache unreadable");
                None
            }
        }
    }

    fn cached_draft(&self, id: Option<&str>) -> Option<Draft> {
        match self.library.drafts.get() {
            Ok(draft) => draft.filter(|draft| draft.matches(id)),
            Err(e) => {
                warn!(error = %e, "editor: draft unreadable");
                None
            }
        }
    }

    // =========================================================================
    // EDITS
    // =========================================================================

    /// # Errors
    ///
    /// Returns [`EditorError::NotLoaded`] before a document is loaded.
    pub async fn set_title(&self, title: &str) -> Result<(), EditorError> {
        let mut guard = self.session.lock().await;
        ensure_editable(&guard)?;
        guard.title = title.to_string();
        self.mark_edited(&mut guard)
    }

    /// Replace the whole buffer. Offsets held by a running generation are
    /// remapped through the smallest changed span.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::NotLoaded`] before a document is loaded.
    pub async fn set_content(&self, content: &str) -> Result<(), EditorError> {
        let mut guard = self.session.lock().await;
        ensure_editable(&guard)?;
        let splice = guard.buffer.replace_all(content);
        guard.remap(splice);
        self.mark_edited(&mut guard)
    }

    /// Replace the byte range `range` with `text`.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::Buffer`] for a range that is out of bounds or
    /// not on character boundaries; the buffer is left unchanged.
    pub async fn splice(&self, range: Range<usize>, text: &str) -> Result<(), EditorError> {
        let mut guard = self.session.lock().await;
        ensure_editable(&guard)?;
        let splice = guard.buffer.splice(range, text)?;
        guard.remap(splice);
        self.mark_edited(&mut guard)
    }

    fn mark_edited(&self, s: &mut Session) -> Result<(), EditorError> {
        if s.state == EditorState::Streaming {
            return Ok(());
        }
        let next = s.settled();
        self.transition(s, next)
    }

    // =========================================================================
    // PERSISTENCE
    // =========================================================================

    /// Persist the buffer as it is now.
    ///
    /// While a generation is streaming the save happens without leaving
    /// `Streaming`.
    ///
    /// # Errors
    ///
    /// Returns the persistence error after publishing it as a notice.
    pub async fn save(&self) -> Result<Document, EditorError> {
        let mut guard = self.session.lock().await;
        self.save_locked(&mut guard)
    }

    /// Save if the buffer differs from the last saved snapshot.
    ///
    /// # Errors
    ///
    /// Returns the persistence error after publishing it as a notice.
    pub async fn autosave_tick(&self) -> Result<Option<Document>, EditorError> {
        let mut guard = self.session.lock().await;
        if !guard.state.is_loaded() || guard.state == EditorState::Saving || !guard.dirty() {
            return Ok(None);
        }
        debug!(doc_id = ?guard.doc_id, "editor: autosave");
        self.save_locked(&mut guard).map(Some)
    }

    /// Write the buffer to the draft store.
    ///
    /// # Errors
    ///
    /// Returns the storage error after publishing it as a notice.
    pub async fn draft_tick(&self) -> Result<Option<Draft>, EditorError> {
        let guard = self.session.lock().await;
        if !guard.state.is_loaded() {
            return Ok(None);
        }
        let draft = Draft::new(guard.doc_id.clone(), guard.title.clone(), guard.buffer.as_str());
        match self.library.drafts.save(&draft) {
            Ok(saved) => {
                self.emit(EditorEvent::DraftSaved { last_modified: saved.last_modified });
                Ok(Some(saved))
            }
            Err(e) => {
                warn!(doc_id = ?guard.doc_id, error = %e, "editor: draft save failed");
                self.notify(Notice::error(&e));
                Err(e.into())
            }
        }
    }

    /// Best-effort persistence before shutdown. Saves when dirty, falls back
    /// to the draft if that save fails, and always refreshes the session cache.
    ///
    /// # Errors
    ///
    /// Returns the first failure; every failure is logged.
    pub async fn flush(&self) -> Result<(), EditorError> {
        let mut guard = self.session.lock().await;
        if !guard.state.is_loaded() {
            return Ok(());
        }

        let mut saved = Ok(());
        if guard.dirty() && guard.state != EditorState::Saving {
            if let Err(e) = self.save_locked(&mut guard) {
                let draft = Draft::new(guard.doc_id.clone(), guard.title.clone(), guard.buffer.as_str());
                if let Err(draft_err) = self.library.drafts.save(&draft) {
                    warn!(error = %draft_err, "editor: draft fallback on flush failed");
                }
                saved = Err(e);
            }
        }

        let entry = SessionEntry {
            id: guard.doc_id.clone(),
            title: guard.title.clone(),
            content: guard.buffer.as_str().to_string(),
        };
        let cached = self.library.session.put(&entry);
        if let Err(e) = &cached {
            warn!(error = %e, "editor: session cache write failed");
        }
        saved?;
        cached.map_err(Into::into)
    }

    fn save_locked(&self, s: &mut Session) -> Result<Document, EditorError> {
        let streaming = s.state == EditorState::Streaming;
        if !streaming {
            self.transition(s, EditorState::Saving)?;
        }
        match self.library.save_document(s.doc_id.as_deref(), &s.title, s.buffer.as_str()) {
            Ok(doc) => {
                s.doc_id = Some(doc.id.clone());
                s.mark_saved();
                if !streaming {
                    let next = s.settled();
                    self.transition(s, next)?;
                }
                info!(doc_id = %doc.id, len = doc.content.len(), "editor: saved");
                self.emit(EditorEvent::Saved { id: doc.id.clone(), updated_at: doc.updated_at });
                Ok(doc)
            }
            Err(e) => {
                warn!(doc_id = ?s.doc_id, error = %e, "editor: save failed");
                self.notify(Notice::error(&e));
                if !streaming {
                    let next = s.settled();
                    self.transition(s, next)?;
                }
                Err(e.into())
            }
        }
    }

    /// Write the buffer, as it is at this moment, to `<title>.md` in `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::File`] if the file cannot be written.
    pub async fn export(&self, dir: &Path) -> Result<PathBuf, EditorError> {
        let (title, content) = {
            let guard = self.session.lock().await;
            if !guard.state.is_loaded() {
                return Err(EditorError::NotLoaded);
            }
            (guard.title.clone(), guard.buffer.as_str().to_string())
        };
        files::export_markdown(dir, &title, &content).map_err(|e| {
            warn!(error = %e, "editor: export failed");
            self.notify(Notice::error(&e));
            e.into()
        })
    }

    // =========================================================================
    // AI
    // =========================================================================

    /// Run one AI generation against the buffer.
    ///
    /// Append and insert chunks go into the buffer as they arrive; an edit
    /// publishes chunks as previews and replaces its span on completion.
    /// Cancelling `cancel` aborts the request and keeps inserted text.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::Ai`] for LLM failures and cancellation, after
    /// publishing a notice. Either way the editor settles into `Editing` when
    /// the buffer differs from the last save and `Idle` otherwise.
    pub async fn generate(
        &self,
        llm: &dyn LlmChat,
        mode: AiMode,
        cancel: CancellationToken,
    ) -> Result<String, EditorError> {
        let settings = self.ai_settings()?;
        let (id, task) = self.begin_generation(mode).await?;

        let mut generation = match Generation::start(llm, &task, &settings).await {
            Ok(generation) => generation.with_cancel(cancel),
            Err(e) => return self.finish_generation(id, Err(e)).await,
        };
        while let Some(event) = generation.next_event().await {
            match event {
                Ok(AiEvent::Chunk { text, progress }) => self.apply_chunk(id, &text, progress).await,
                Ok(AiEvent::Done { text }) => return self.finish_generation(id, Ok(text)).await,
                Err(e) => return self.finish_generation(id, Err(e)).await,
            }
        }
        self.finish_generation(id, Err(AiError::Cancelled)).await
    }

    /// Run one generation without streaming. The whole reply is applied in
    /// one step, the way a single streamed chunk would be.
    ///
    /// # Errors
    ///
    /// Same as [`Editor::generate`], minus cancellation.
    pub async fn complete(&self, llm: &dyn LlmChat, mode: AiMode) -> Result<String, EditorError> {
        let settings = self.ai_settings()?;
        let (id, task) = self.begin_generation(mode).await?;
        let outcome = ai::complete(llm, &task, &settings).await;
        if let Ok(text) = &outcome {
            self.apply_chunk(id, text, PROGRESS_CAP).await;
        }
        self.finish_generation(id, outcome).await
    }

    fn ai_settings(&self) -> Result<AiSettings, EditorError> {
        self.library.settings.load().map_err(|e| {
            warn!(error = %e, "editor: AI settings unreadable");
            self.notify(Notice::error(&e));
            e.into()
        })
    }

    async fn begin_generation(&self, mode: AiMode) -> Result<(u64, AiTask), EditorError> {
        let mut guard = self.session.lock().await;
        if !guard.state.can_transition(EditorState::Streaming) {
            return Err(EditorError::InvalidTransition { from: guard.state, to: EditorState::Streaming });
        }
        let (task, target) = match mode {
            AiMode::Append => (
                AiTask::Continue { text: guard.buffer.as_str().to_string() },
                Target::Insert { anchor: guard.buffer.len() },
            ),
            AiMode::Insert { selection } => {
                let text = guard.buffer.slice(selection.clone())?;
                if text.trim().is_empty() {
                    return Err(EditorError::EmptySelection);
                }
                (AiTask::Continue { text: text.to_string() }, Target::Insert { anchor: selection.end })
            }
            AiMode::Edit { selection, instruction } => {
                let range = selection.unwrap_or(0..guard.buffer.len());
                let text = guard.buffer.slice(range.clone())?.to_string();
                (AiTask::Edit { text, instruction }, Target::Replace { start: range.start, end: range.end })
            }
        };
        task.validate()?;

        guard.next_generation += 1;
        let id = guard.next_generation;
        guard.generation = Some(ActiveGeneration { id, target });
        self.transition(&mut guard, EditorState::Streaming)?;
        Ok((id, task))
    }

    async fn apply_chunk(&self, id: u64, text: &str, progress: u8) {
        let mut guard = self.session.lock().await;
        let s = &mut *guard;
        let Some(active) = s.generation.as_mut().filter(|g| g.id == id) else {
            return;
        };
        let preview = match &mut active.target {
            Target::Insert { anchor } => {
                if let Err(e) = s.buffer.insert(*anchor, text) {
                    warn!(error = %e, anchor = *anchor, "editor: dropped AI chunk at invalid anchor");
                    return;
                }
                *anchor += text.len();
                false
            }
            Target::Replace { .. } => true,
        };
        self.emit(EditorEvent::AiChunk { text: text.to_string(), preview });
        self.emit(EditorEvent::AiProgress { progress });
    }

    async fn finish_generation(&self, id: u64, outcome: Result<String, AiError>) -> Result<String, EditorError> {
        let mut guard = self.session.lock().await;
        let Some(active) = guard.generation.take_if(|g| g.id == id) else {
            return outcome.map_err(Into::into);
        };

        let result = match outcome {
            Ok(text) => {
                if let Target::Replace { start, end } = active.target {
                    if let Err(e) = guard.buffer.splice(start..end, &text) {
                        warn!(error = %e, "editor: edit span no longer valid");
                        self.notify(Notice::error(&EditorError::Buffer(e)));
                    }
                }
                self.emit(EditorEvent::AiProgress { progress: PROGRESS_DONE });
                info!(len = text.len(), "editor: generation applied");
                Ok(text)
            }
            Err(AiError::Cancelled) => {
                self.notify(Notice::info("Generation cancelled"));
                Err(EditorError::Ai(AiError::Cancelled))
            }
            Err(e) => {
                warn!(error = %e, "editor: generation failed");
                self.notify(Notice::error(&e));
                Err(e.into())
            }
        };
        let next = guard.settled();
        self.transition(&mut guard, next)?;
        result
    }

    // =========================================================================
    // HELPERS
    // =========================================================================

    fn transition(&self, s: &mut Session, next: EditorState) -> Result<(), EditorError> {
        if s.state == next {
            return Ok(());
        }
        if !s.state.can_transition(next) {
            return Err(EditorError::InvalidTransition { from: s.state, to: next });
        }
        debug!(from = %s.state, to = %next, "editor: state change");
        s.state = next;
        self.emit(EditorEvent::StateChanged { state: next });
        Ok(())
    }

    fn emit(&self, event: EditorEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn notify(&self, notice: Notice) {
        self.emit(EditorEvent::Notice(notice));
    }
}

fn ensure_editable(s: &Session) -> Result<(), EditorError> {
    match s.state {
        EditorState::Loading => Err(EditorError::NotLoaded),
        EditorState::Saving => Err(EditorError::InvalidTransition { from: s.state, to: EditorState::Editing }),
        _ => Ok(()),
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
