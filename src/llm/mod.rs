//! LLM — OpenAI-compatible chat-completion adapter for the AI bridge.
//!
//! DESIGN
//! ======
//! The endpoint, model and sampling parameters are user settings rather than
//! deployment config, so a client is built per request from the stored
//! [`AiSettings`] and API key. Callers depend on the [`LlmChat`] trait.

pub mod config;
pub mod openai;
pub mod sse;
pub mod types;

use config::LlmConfig;
pub use openai::OpenAiClient;
pub use types::{ChatMessage, ChatRequest, ChunkStream, LlmChat, LlmError};

use crate::services::settings::AiSettings;

/// Build a client for the configured endpoint.
///
/// # Errors
///
/// Returns an error if no API key is available, the base URL is invalid, or
/// the HTTP client fails to build.
pub fn client_for(settings: &AiSettings, stored_key: Option<String>) -> Result<OpenAiClient, LlmError> {
    let config = LlmConfig::resolve(settings, stored_key)?;
    OpenAiClient::new(&config)
}
