//! OpenAI-compatible chat-completions client.
//!
//! Talks to `{base_url}/chat/completions` with bearer auth. Streaming
//! requests set `stream: true` and decode the SSE body through
//! [`super::sse::text_chunks`]; dropping the returned stream drops the
//! response body and aborts the request.
//!
//! Non-streamed requests carry a whole-request deadline. Streamed requests
//! have no total deadline: they fail only when the headers or the body stall
//! for the idle period.

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::config::LlmConfig;
use super::config::LlmTimeouts;
use super::sse::{idle_timeout, text_chunks};
use super::types::{ChatMessage, ChatRequest, ChunkStream, LlmChat, LlmError};

const VALIDATION_MAX_TOKENS: u32 = 5;

pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    timeouts: LlmTimeouts,
}

impl OpenAiClient {
    /// # Errors
    ///
    /// Returns [`LlmError::HttpClientBuild`] if the HTTP client cannot be built.
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .build()
            .map_err(|e| LlmError::HttpClientBuild(e.to_string()))?;
        Ok(Self {
            http,
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
            timeouts: config.timeouts,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send a minimal request to check that the key is accepted.
    pub async fn validate_key(&self, model: &str) -> bool {
        let request = ChatRequest {
            model: model.to_string(),
            messages: vec![ChatMessage::user("Hello")],
            temperature: 0.0,
            max_tokens: VALIDATION_MAX_TOKENS,
        };
        match self.complete(&request).await {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "openai: API key validation failed");
                false
            }
        }
    }

    async fn post(&self, request: &ChatRequest, stream: bool) -> Result<reqwest::Response, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = CcRequest {
            model: &request.model,
            messages: &request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream,
        };
        debug!(%url, model = %request.model, stream, "openai: sending request");
        let builder = self.http.post(url).bearer_auth(&self.api_key).json(&body);
        let sent = if stream {
            let idle = Duration::from_secs(self.timeouts.stream_idle_secs);
            tokio::time::timeout(idle, builder.send())
                .await
                .map_err(|_| LlmError::ApiRequest(format!("no response within {}s", idle.as_secs())))?
        } else {
            builder.timeout(Duration::from_secs(self.timeouts.request_secs)).send().await
        };
        let response = sent.map_err(|e| LlmError::ApiRequest(e.to_string()))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::ApiResponse { status, body });
        }
        Ok(response)
    }
}

#[async_trait::async_trait]
impl LlmChat for OpenAiClient {
    async fn complete(&self, request: &ChatRequest) -> Result<String, LlmError> {
        let response = self.post(request, false).await?;
        let text = response
            .text()
            .await
            .map_err(|e| LlmError::ApiRequest(e.to_string()))?;
        parse_chat_completions_text(&text)
    }

    async fn stream(&self, request: &ChatRequest) -> Result<ChunkStream, LlmError> {
        let response = self.post(request, true).await?;
        let idle = Duration::from_secs(self.timeouts.stream_idle_secs);
        Ok(text_chunks(idle_timeout(Box::pin(response.bytes_stream()), idle)))
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Serialize)]
struct CcRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

/// Extract `choices[0].message.content` from a non-streamed response.
pub(crate) fn parse_chat_completions_text(json_text: &str) -> Result<String, LlmError> {
    let root: Value = serde_json::from_str(json_text).map_err(|e| LlmError::ApiParse(e.to_string()))?;
    let Some(choice) = root
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|arr| arr.first())
    else {
        return Err(LlmError::ApiParse("chat_completions: missing choices[0]".to_string()));
    };
    Ok(choice
        .get("message")
        .and_then(|m| m.get("content"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string())
}

#[cfg(test)]
#[path = "openai_test.rs"]
mod tests;
