//! LLM configuration — stored AI settings plus credentials and timeouts.
//!
//! The base URL, model and sampling parameters come from the settings store;
//! the API key comes from the environment when `PLOTCONTINUUM_API_KEY` is set
//! and from the stored key otherwise. Timeouts are environment-only.

use super::types::LlmError;
use crate::config::env_parse;
use crate::services::settings::AiSettings;

pub const API_KEY_ENV: &str = "PLOTCONTINUUM_API_KEY";
pub const DEFAULT_LLM_REQUEST_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_LLM_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_LLM_STREAM_IDLE_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LlmTimeouts {
    /// Whole-request deadline for non-streamed completions.
    pub request_secs: u64,
    pub connect_secs: u64,
    /// Longest gap between bytes of a streamed response.
    pub stream_idle_secs: u64,
}

impl Default for LlmTimeouts {
    fn default() -> Self {
        Self {
            request_secs: DEFAULT_LLM_REQUEST_TIMEOUT_SECS,
            connect_secs: DEFAULT_LLM_CONNECT_TIMEOUT_SECS,
            stream_idle_secs: DEFAULT_LLM_STREAM_IDLE_TIMEOUT_SECS,
        }
    }
}

impl LlmTimeouts {
    /// Read `LLM_REQUEST_TIMEOUT_SECS`, `LLM_CONNECT_TIMEOUT_SECS` and
    /// `LLM_STREAM_IDLE_TIMEOUT_SECS`.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            request_secs: env_parse("LLM_REQUEST_TIMEOUT_SECS", DEFAULT_LLM_REQUEST_TIMEOUT_SECS),
            connect_secs: env_parse("LLM_CONNECT_TIMEOUT_SECS", DEFAULT_LLM_CONNECT_TIMEOUT_SECS),
            stream_idle_secs: env_parse("LLM_STREAM_IDLE_TIMEOUT_SECS", DEFAULT_LLM_STREAM_IDLE_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeouts: LlmTimeouts,
}

impl LlmConfig {
    /// Build a client config from stored settings and the stored API key.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::MissingApiKey`] when neither the environment nor
    /// the store provides a key, and [`LlmError::ConfigParse`] for a base URL
    /// that is not http(s).
    pub fn resolve(settings: &AiSettings, stored_key: Option<String>) -> Result<Self, LlmError> {
        let api_key = std::env::var(API_KEY_ENV)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .or(stored_key)
            .ok_or_else(|| LlmError::MissingApiKey { var: API_KEY_ENV.into() })?;
        let base_url = normalize_base_url(&settings.base_url)?;
        Ok(Self { api_key, base_url, timeouts: LlmTimeouts::from_env() })
    }
}

/// Trim whitespace and trailing slashes; reject non-http(s) URLs.
pub(crate) fn normalize_base_url(raw: &str) -> Result<String, LlmError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        Ok(trimmed.to_string())
    } else {
        Err(LlmError::ConfigParse(format!("base URL must start with http:// or https://, got '{raw}'")))
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
