//! Server-Sent Events decoding for streamed chat completions.
//!
//! DESIGN
//! ======
//! Bytes arrive in arbitrary slices: a line (or a multi-byte character) can
//! be split across network reads, so the decoder buffers raw bytes and only
//! decodes complete lines. A blank line dispatches the accumulated `data:`
//! lines as one event. `data: [DONE]` ends the stream.
//!
//! A live stream has no total deadline. [`idle_timeout`] fails it only when
//! no bytes arrive for a whole idle period.

use std::collections::VecDeque;
use std::fmt::Display;
use std::time::Duration;

use futures::{Stream, StreamExt};
use serde_json::Value;

use super::types::{ChunkStream, LlmError};

/// One dispatched SSE event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    Data(String),
    Done,
}

#[derive(Debug, Default)]
pub struct SseDecoder {
    buf: Vec<u8>,
    data: Vec<String>,
}

impl SseDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes; returns every event completed by them.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<SseEvent> {
        self.buf.extend_from_slice(bytes);
        let mut events = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.buf.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw);
            self.process_line(line.trim_end_matches(['\n', '\r']), &mut events);
        }
        events
    }

    /// Flush a trailing unterminated line and any undispatched data.
    pub fn finish(&mut self) -> Vec<SseEvent> {
        let mut events = Vec::new();
        if !self.buf.is_empty() {
            let raw = std::mem::take(&mut self.buf);
            let line = String::from_utf8_lossy(&raw);
            self.process_line(line.trim_end_matches('\r'), &mut events);
        }
        self.dispatch(&mut events);
        events
    }

    fn process_line(&mut self, line: &str, events: &mut Vec<SseEvent>) {
        if line.is_empty() {
            self.dispatch(events);
            return;
        }
        if line.starts_with(':') {
            return;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        // `event`, `id` and `retry` carry nothing for chat completions.
        if field == "data" {
            self.data.push(value.to_string());
        }
    }

    fn dispatch(&mut self, events: &mut Vec<SseEvent>) {
        if self.data.is_empty() {
            return;
        }
        let payload = self.data.join("\n");
        self.data.clear();
        if payload.trim() == "[DONE]" {
            events.push(SseEvent::Done);
        } else {
            events.push(SseEvent::Data(payload));
        }
    }
}

/// Extract `choices[0].delta.content` from one streamed chunk.
///
/// # Errors
///
/// Returns [`LlmError::ApiParse`] for invalid JSON and [`LlmError::Stream`]
/// when the provider sends an inline error object.
pub fn parse_stream_delta(data: &str) -> Result<Option<String>, LlmError> {
    let root: Value = serde_json::from_str(data).map_err(|e| LlmError::ApiParse(e.to_string()))?;
    if let Some(error) = root.get("error") {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .map_or_else(|| error.to_string(), str::to_owned);
        return Err(LlmError::Stream(message));
    }
    let content = root
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|arr| arr.first())
        .and_then(|choice| choice.get("delta"))
        .and_then(|delta| delta.get("content"))
        .and_then(Value::as_str)
        .filter(|text| !text.is_empty())
        .map(str::to_owned);
    Ok(content)
}

// =============================================================================
// BYTES → TEXT CHUNKS
// =============================================================================

struct ChunkState<S> {
    bytes: S,
    decoder: SseDecoder,
    pending: VecDeque<String>,
    failed: Option<LlmError>,
    done: bool,
}

impl<S> ChunkState<S> {
    fn absorb(&mut self, events: Vec<SseEvent>) -> Result<(), LlmError> {
        for event in events {
            match event {
                SseEvent::Done => {
                    self.done = true;
                    return Ok(());
                }
                SseEvent::Data(data) => {
                    if let Some(text) = parse_stream_delta(&data)? {
                        self.pending.push_back(text);
                    }
                }
            }
        }
        Ok(())
    }
}

/// Turn a raw SSE byte stream into an ordered stream of text chunks.
///
/// The first error ends the stream, after any text decoded before it. A body
/// that ends without `[DONE]` is treated as complete.
pub fn text_chunks<S, B, E>(bytes: S) -> ChunkStream
where
    S: Stream<Item = Result<B, E>> + Send + Unpin + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    let state = ChunkState { bytes, decoder: SseDecoder::new(), pending: VecDeque::new(), failed: None, done: false };
    let stream = futures::stream::unfold(state, |mut st| async move {
        loop {
            if let Some(text) = st.pending.pop_front() {
                return Some((Ok(text), st));
            }
            if let Some(e) = st.failed.take() {
                return Some((Err(e), st));
            }
            if st.done {
                return None;
            }
            let events = match st.bytes.next().await {
                Some(Ok(bytes)) => st.decoder.push(bytes.as_ref()),
                Some(Err(e)) => {
                    st.done = true;
                    st.failed = Some(LlmError::Stream(e.to_string()));
                    continue;
                }
                None => {
                    st.done = true;
                    st.decoder.finish()
                }
            };
            if let Err(e) = st.absorb(events) {
                st.done = true;
                st.failed = Some(e);
            }
        }
    });
    Box::pin(stream)
}

// =============================================================================
// IDLE TIMEOUT
// =============================================================================

/// Fail `bytes` once it goes `idle` without yielding anything.
///
/// Each item gets its own deadline; a slow but steady stream runs as long as
/// it keeps producing. The stream ends after the timeout error.
pub fn idle_timeout<S, B, E>(
    bytes: S,
    idle: Duration,
) -> impl Stream<Item = Result<B, String>> + Send + Unpin + 'static
where
    S: Stream<Item = Result<B, E>> + Send + Unpin + 'static,
    B: Send + 'static,
    E: Display + Send + 'static,
{
    Box::pin(futures::stream::unfold(Some(bytes), move |state| async move {
        let mut bytes = state?;
        match tokio::time::timeout(idle, bytes.next()).await {
            Ok(Some(item)) => Some((item.map_err(|e| e.to_string()), Some(bytes))),
            Ok(None) => None,
            Err(_) => Some((Err(format!("no data for {}s", idle.as_secs_f64())), None)),
        }
    }))
}

#[cfg(test)]
#[path = "sse_test.rs"]
mod tests;
