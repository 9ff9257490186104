use super::*;
use crate::storage::MemoryStore;

fn store() -> (Arc<MemoryStore>, SettingsStore) {
    let memory = Arc::new(MemoryStore::new());
    (memory.clone(), SettingsStore::new(memory))
}

// =============================================================================
// AI settings
// =============================================================================

#[test]
fn load_defaults_when_unset() {
    let (_, settings) = store();
    let loaded = settings.load().unwrap();
    assert_eq!(loaded, AiSettings::default());
    assert_eq!(loaded.model, DEFAULT_MODEL);
    assert_eq!(loaded.max_tokens, DEFAULT_MAX_TOKENS);
}

#[test]
fn partial_stored_object_merges_over_defaults() {
    let (memory, settings) = store();
    memory.set(AI_SETTINGS_KEY, r#"{"maxTokens":42}"#).unwrap();
    let loaded = settings.load().unwrap();
    assert_eq!(loaded.max_tokens, 42);
    assert_eq!(loaded.base_url, DEFAULT_BASE_URL);
}

#[test]
fn corrupt_settings_fall_back_to_defaults() {
    let (memory, settings) = store();
    memory.set(AI_SETTINGS_KEY, "not json").unwrap();
    assert_eq!(settings.load().unwrap(), AiSettings::default());
}

#[test]
fn update_merges_patch_and_persists() {
    let (_, settings) = store();
    let patch = AiSettingsPatch { temperature: Some(0.2), ..AiSettingsPatch::default() };
    let updated = settings.update(patch).unwrap();
    assert!((updated.temperature - 0.2).abs() < f32::EPSILON);
    assert_eq!(updated.model, DEFAULT_MODEL);
    assert_eq!(settings.load().unwrap(), updated);
}

#[test]
fn api_key_is_trimmed_and_blank_counts_as_unset() {
    let (_, settings) = store();
    assert_eq!(settings.api_key().unwrap(), None);
    settings.set_api_key("  sk-test \n").unwrap();
    assert_eq!(settings.api_key().unwrap().as_deref(), Some("sk-test"));
    settings.set_api_key("   ").unwrap();
    assert_eq!(settings.api_key().unwrap(), None);
}

// =============================================================================
// Models
// =============================================================================

#[test]
fn models_default_until_saved() {
    let (_, settings) = store();
    let models = settings.models().unwrap();
    assert_eq!(models, default_models());
    assert_eq!(models.len(), 4);
}

#[test]
fn add_model_generates_id() {
    let (_, settings) = store();
    let models = settings.add_model("Qwen", "Qwen/Qwen2-7B").unwrap();
    let added = models.last().unwrap();
    assert_eq!(added.value, "Qwen/Qwen2-7B");
    assert!(default_models().iter().all(|m| m.id != added.id));
    assert_eq!(settings.models().unwrap().len(), 5);
}

#[test]
fn removing_selected_model_moves_selection_to_first_remaining() {
    let (_, settings) = store();
    let removed = settings.remove_model("1").unwrap();
    assert_eq!(removed.len(), 3);
    assert_eq!(settings.load().unwrap().model, removed[0].value);
}

#[test]
fn removing_other_model_keeps_selection() {
    let (_, settings) = store();
    settings.remove_model("3").unwrap();
    assert_eq!(settings.load().unwrap().model, DEFAULT_MODEL);
}

#[test]
fn removing_last_model_leaves_selection_alone() {
    let (_, settings) = store();
    settings
        .save_models(&[AiModel::new("x", "Only", DEFAULT_MODEL)])
        .unwrap();
    assert!(settings.remove_model("x").unwrap().is_empty());
    assert_eq!(settings.load().unwrap().model, DEFAULT_MODEL);
}

#[test]
fn reset_restores_defaults() {
    let (_, settings) = store();
    settings.remove_model("2").unwrap();
    assert_eq!(settings.reset_models().unwrap(), default_models());
    assert_eq!(settings.models().unwrap(), default_models());
}

#[test]
fn corrupt_model_list_falls_back_to_defaults() {
    let (memory, settings) = store();
    memory.set(AI_MODELS_KEY, "[1,2").unwrap();
    assert_eq!(settings.models().unwrap(), default_models());
}
