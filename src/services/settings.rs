//! Settings store — AI settings, API key and the user-managed model list.
//!
//! DESIGN
//! ======
//! Stored settings are merged over [`AiSettings::default`] field by field, so
//! a partially written object still loads. A corrupt settings or model value
//! is logged and replaced by the defaults rather than blocking the editor.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::storage::{
    AI_MODELS_KEY, AI_SETTINGS_KEY, API_KEY_KEY, KvStore, StorageError, read_json, write_json,
};

pub const DEFAULT_MODEL: &str = "deepseek-ai/DeepSeek-V2.5";
pub const DEFAULT_BASE_URL: &str = "https://api.siliconflow.cn/v1";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 1000;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AiSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub base_url: String,
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

/// Partial update; `None` fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AiSettingsPatch {
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub base_url: Option<String>,
}

impl AiSettings {
    #[must_use]
    pub fn merged(mut self, patch: AiSettingsPatch) -> Self {
        if let Some(model) = patch.model {
            self.model = model;
        }
        if let Some(temperature) = patch.temperature {
            self.temperature = temperature;
        }
        if let Some(max_tokens) = patch.max_tokens {
            self.max_tokens = max_tokens;
        }
        if let Some(base_url) = patch.base_url {
            self.base_url = base_url;
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiModel {
    pub id: String,
    pub name: String,
    /// Model identifier sent to the API.
    pub value: String,
}

impl AiModel {
    fn new(id: &str, name: &str, value: &str) -> Self {
        Self { id: id.to_string(), name: name.to_string(), value: value.to_string() }
    }
}

/// Model list used until the user saves their own.
#[must_use]
pub fn default_models() -> Vec<AiModel> {
    vec![
        AiModel::new("1", "DeepSeek-V2.5", "deepseek-ai/DeepSeek-V2.5"),
        AiModel::new("2", "DeepSeek-Coder", "deepseek-ai/deepseek-coder"),
        AiModel::new("3", "Llama-3-70b", "meta-llama/Llama-3-70b-chat-hf"),
        AiModel::new("4", "Llama-3-8b", "meta-llama/Llama-3-8b-chat-hf"),
    ]
}

// =============================================================================
// STORE
// =============================================================================

#[derive(Clone)]
pub struct SettingsStore {
    store: Arc<dyn KvStore>,
}

impl SettingsStore {
    #[must_use]
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Current settings, merged over the defaults.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the backend cannot be read.
    pub fn load(&self) -> Result<AiSettings, StorageError> {
        match read_json::<AiSettings>(self.store.as_ref(), AI_SETTINGS_KEY) {
            Ok(settings) => Ok(settings.unwrap_or_default()),
            Err(e @ StorageError::Corrupt { .. }) => {
                warn!(error = %e, "settings: corrupt value, using defaults");
                Ok(AiSettings::default())
            }
            Err(e) => Err(e),
        }
    }

    /// Merge `patch` over the current settings and persist the result.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the settings cannot be read or written.
    pub fn update(&self, patch: AiSettingsPatch) -> Result<AiSettings, StorageError> {
        let updated = self.load()?.merged(patch);
        write_json(self.store.as_ref(), AI_SETTINGS_KEY, &updated)?;
        info!(model = %updated.model, max_tokens = updated.max_tokens, "settings: updated");
        Ok(updated)
    }

    /// Stored API key; an empty value counts as unset.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the backend cannot be read.
    pub fn api_key(&self) -> Result<Option<String>, StorageError> {
        Ok(self
            .store
            .get(API_KEY_KEY)?
            .filter(|key| !key.trim().is_empty()))
    }

    /// # Errors
    ///
    /// Returns a [`StorageError`] if the write fails.
    pub fn set_api_key(&self, key: &str) -> Result<(), StorageError> {
        self.store.set(API_KEY_KEY, key.trim())
    }

    // =========================================================================
    // MODELS
    // =========================================================================

    /// Saved model list, or [`default_models`] when none has been saved.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the backend cannot be read.
    pub fn models(&self) -> Result<Vec<AiModel>, StorageError> {
        match read_json::<Vec<AiModel>>(self.store.as_ref(), AI_MODELS_KEY) {
            Ok(models) => Ok(models.unwrap_or_else(default_models)),
            Err(e @ StorageError::Corrupt { .. }) => {
                warn!(error = %e, "settings: corrupt model list, using defaults");
                Ok(default_models())
            }
            Err(e) => Err(e),
        }
    }

    /// # Errors
    ///
    /// Returns a [`StorageError`] if the write fails.
    pub fn save_models(&self, models: &[AiModel]) -> Result<(), StorageError> {
        write_json(self.store.as_ref(), AI_MODELS_KEY, models)
    }

    /// Append a model with a generated id and return the updated list.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the list cannot be read or written.
    pub fn add_model(&self, name: &str, value: &str) -> Result<Vec<AiModel>, StorageError> {
        let mut models = self.models()?;
        models.push(AiModel { id: Uuid::new_v4().to_string(), name: name.to_string(), value: value.to_string() });
        self.save_models(&models)?;
        Ok(models)
    }

    /// Remove a model by id and return the updated list.
    ///
    /// If the removed model was the selected one and models remain, the
    /// selection moves to the first remaining model.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the list or settings cannot be written.
    pub fn remove_model(&self, id: &str) -> Result<Vec<AiModel>, StorageError> {
        let models = self.models()?;
        let removed = models.iter().find(|m| m.id == id).cloned();
        let remaining: Vec<AiModel> = models.into_iter().filter(|m| m.id != id).collect();

        if let (Some(removed), Some(first)) = (removed, remaining.first()) {
            let settings = self.load()?;
            if settings.model == removed.value {
                self.update(AiSettingsPatch { model: Some(first.value.clone()), ..AiSettingsPatch::default() })?;
            }
        }

        self.save_models(&remaining)?;
        Ok(remaining)
    }

    /// Replace the saved list with [`default_models`].
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the write fails.
    pub fn reset_models(&self) -> Result<Vec<AiModel>, StorageError> {
        let models = default_models();
        self.save_models(&models)?;
        Ok(models)
    }
}

#[cfg(test)]
#[path = "settings_test.rs"]
mod tests;
