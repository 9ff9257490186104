//! PlotContinuum — a local Markdown writing editor with streamed AI continuation.
//!
//! ARCHITECTURE
//! ============
//! - [`storage`]: the key-value storage port and its memory and file adapters.
//! - [`services`]: document, draft, settings and session stores, the AI
//!   bridge, and Markdown file export.
//! - [`llm`]: the OpenAI-compatible chat-completion client.
//! - [`editor`]: the controller that owns the open buffer and its timers.
//! - [`config`]: environment-driven settings for the binary.

pub mod config;
pub mod editor;
pub mod error;
pub mod llm;
pub mod services;
pub mod storage;
