//! AI bridge — streaming continuation and edit over the chat-completion API.
//!
//! DESIGN
//! ======
//! A [`Generation`] wraps one streamed completion. Each call to
//! [`Generation::next_event`] yields the next text chunk together with a
//! progress estimate, then a final [`AiEvent::Done`] carrying the full text.
//! The bridge never transforms generated text; chunks are forwarded exactly
//! as received and in order.
//!
//! Progress is estimated from whitespace-separated words against the
//! `max_tokens` budget, capped at 99 and never decreasing. 100 is reported
//! only with `Done`.
//!
//! Cancelling the token passed to [`Generation::with_cancel`] drops the
//! underlying response stream, which aborts the HTTP request.

use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::ErrorCode;
use crate::llm::{ChatMessage, ChatRequest, ChunkStream, LlmChat, LlmError};
use crate::services::settings::AiSettings;

pub const PROGRESS_CAP: u8 = 99;
pub const PROGRESS_DONE: u8 = 100;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AiError {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),
    #[error("generation cancelled")]
    Cancelled,
    #[error("edit instruction is empty")]
    EmptyInstruction,
}

impl ErrorCode for AiError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Llm(e) => e.error_code(),
            Self::Cancelled => "E_AI_CANCELLED",
            Self::EmptyInstruction => "E_AI_EMPTY_INSTRUCTION",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Llm(e) if e.retryable())
    }
}

/// What to ask the model for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AiTask {
    /// Continue `text` from where it stops.
    Continue { text: String },
    /// Rewrite `text` following `instruction`.
    Edit { text: String, instruction: String },
}

impl AiTask {
    /// Prompt for this task.
    #[must_use]
    pub fn prompt(&self) -> String {
        match self {
            Self::Continue { text } => continuation_prompt(text),
            Self::Edit { text, instruction } => edit_prompt(text, instruction),
        }
    }

    /// Chat request for this task under the given settings.
    #[must_use]
    pub fn request(&self, settings: &AiSettings) -> ChatRequest {
        ChatRequest {
            model: settings.model.clone(),
            messages: vec![ChatMessage::user(self.prompt())],
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        }
    }

    pub(crate) fn validate(&self) -> Result<(), AiError> {
        match self {
            Self::Edit { instruction, .. } if instruction.trim().is_empty() => Err(AiError::EmptyInstruction),
            _ => Ok(()),
        }
    }
}

#[must_use]
pub fn continuation_prompt(text: &str) -> String {
    format!(
        "Continue writing the following text. Keep the same style and voice, do not repeat \
         anything already written, and start exactly where it breaks off:\n\n{text}"
    )
}

#[must_use]
pub fn edit_prompt(text: &str, instruction: &str) -> String {
    format!(
        "Revise the following text according to the instruction. Reply with the revised text \
         only.\n\nInstruction: {instruction}\n\nText:\n{text}"
    )
}

/// One step of a streamed generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AiEvent {
    Chunk { text: String, progress: u8 },
    Done { text: String },
}

// =============================================================================
// PROGRESS
// =============================================================================

/// Monotonic progress estimate in `[0, 99]` until [`ProgressEstimator::finish`].
#[derive(Debug, Clone, Copy)]
pub struct ProgressEstimator {
    budget: u64,
    words: u64,
    last: u8,
}

impl ProgressEstimator {
    #[must_use]
    pub fn new(max_tokens: u32) -> Self {
        Self { budget: u64::from(max_tokens.max(1)), words: 0, last: 0 }
    }

    /// Account for one chunk and return the updated estimate.
    pub fn observe(&mut self, chunk: &str) -> u8 {
        // Every chunk counts as at least one token.
        let words = chunk.split_whitespace().count().max(1);
        self.words = self.words.saturating_add(u64::try_from(words).unwrap_or(u64::MAX));
        let pct = (self.words.saturating_mul(100) + self.budget / 2) / self.budget;
        let pct = u8::try_from(pct.min(u64::from(PROGRESS_CAP))).unwrap_or(PROGRESS_CAP);
        self.last = self.last.max(pct);
        self.last
    }

    pub fn finish(&mut self) -> u8 {
        self.last = PROGRESS_DONE;
        self.last
    }

    #[must_use]
    pub fn current(&self) -> u8 {
        self.last
    }
}

// =============================================================================
// GENERATION
// =============================================================================

/// A streamed completion in flight.
pub struct Generation {
    chunks: ChunkStream,
    progress: ProgressEstimator,
    text: String,
    cancel: CancellationToken,
    finished: bool,
}

impl Generation {
    /// Start streaming `task`.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty edit instruction or when the request is
    /// rejected before streaming starts (network, auth).
    pub async fn start(llm: &dyn LlmChat, task: &AiTask, settings: &AiSettings) -> Result<Self, AiError> {
        task.validate()?;
        let request = task.request(settings);
        info!(model = %request.model, max_tokens = request.max_tokens, "ai: starting generation");
        let chunks = llm.stream(&request).await?;
        Ok(Self {
            chunks,
            progress: ProgressEstimator::new(settings.max_tokens),
            text: String::new(),
            cancel: CancellationToken::new(),
            finished: false,
        })
    }

    /// Abort the generation when `cancel` fires.
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Text received so far.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn progress(&self) -> u8 {
        self.progress.current()
    }

    /// Next event, or `None` once `Done` (or an error) has been returned.
    pub async fn next_event(&mut self) -> Option<Result<AiEvent, AiError>> {
        if self.finished {
            return None;
        }
        let polled = tokio::select! {
            biased;
            () = self.cancel.cancelled() => None,
            item = self.chunks.next() => Some(item),
        };
        let Some(item) = polled else {
            self.abort();
            debug!(received = self.text.len(), "ai: generation cancelled");
            return Some(Err(AiError::Cancelled));
        };
        match item {
            Some(Ok(chunk)) => {
                self.text.push_str(&chunk);
                let progress = self.progress.observe(&chunk);
                Some(Ok(AiEvent::Chunk { text: chunk, progress }))
            }
            Some(Err(e)) => {
                warn!(error = %e, received = self.text.len(), "ai: stream failed");
                self.abort();
                Some(Err(e.into()))
            }
            None => {
                self.finished = true;
                self.progress.finish();
                info!(len = self.text.len(), "ai: generation complete");
                Some(Ok(AiEvent::Done { text: self.text.clone() }))
            }
        }
    }

    fn abort(&mut self) {
        self.finished = true;
        self.chunks = Box::pin(futures::stream::empty());
    }
}

/// Non-streaming variant: run `task` and return the whole text.
///
/// # Errors
///
/// Returns an error for an empty edit instruction or any LLM failure.
pub async fn complete(llm: &dyn LlmChat, task: &AiTask, settings: &AiSettings) -> Result<String, AiError> {
    task.validate()?;
    let text = llm.complete(&task.request(settings)).await?;
    Ok(text)
}

// =============================================================================
// TEST HELPERS
// =============================================================================

#[cfg(test)]
pub mod test_helpers {
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;

    /// Scripted LLM: streams the given chunks, optionally pausing between them.
    pub struct MockLlm {
        pub chunks: Vec<Result<String, String>>,
        pub delay: Option<Duration>,
        pub reject: Option<u16>,
        pub requests: Mutex<Vec<ChatRequest>>,
    }

    impl MockLlm {
        #[must_use]
        pub fn new(chunks: &[&str]) -> Self {
            Self {
                chunks: chunks.iter().map(|c| Ok((*c).to_string())).collect(),
                delay: None,
                reject: None,
                requests: Mutex::new(Vec::new()),
            }
        }

        #[must_use]
        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        /// Fail the request itself with this HTTP status.
        #[must_use]
        pub fn rejecting(mut self, status: u16) -> Self {
            self.reject = Some(status);
            self
        }

        /// Append a mid-stream failure after the scripted chunks.
        #[must_use]
        pub fn failing_after(mut self, message: &str) -> Self {
            self.chunks.push(Err(message.to_string()));
            self
        }

        pub fn last_request(&self) -> Option<ChatRequest> {
            self.requests.lock().unwrap().last().cloned()
        }
    }

    #[async_trait::async_trait]
    impl LlmChat for MockLlm {
        async fn complete(&self, request: &ChatRequest) -> Result<String, LlmError> {
            self.requests.lock().unwrap().push(request.clone());
            if let Some(status) = self.reject {
                return Err(LlmError::ApiResponse { status, body: "rejected".into() });
            }
            Ok(self
                .chunks
                .iter()
                .filter_map(|c| c.as_ref().ok())
                .cloned()
                .collect())
        }

        async fn stream(&self, request: &ChatRequest) -> Result<ChunkStream, LlmError> {
            self.requests.lock().unwrap().push(request.clone());
            if let Some(status) = self.reject {
                return Err(LlmError::ApiResponse { status, body: "rejected".into() });
            }
            let delay = self.delay;
            let items = self.chunks.clone();
            let stream = futures::stream::iter(items).then(move |item| async move {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                item.map_err(LlmError::Stream)
            });
            Ok(Box::pin(stream))
        }
    }
}

#[cfg(test)]
#[path = "ai_test.rs"]
mod tests;
