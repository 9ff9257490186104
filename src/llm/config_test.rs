use super::*;

#[test]
fn base_url_is_trimmed() {
    assert_eq!(normalize_base_url(" https://api.example.com/v1/ ").unwrap(), "https://api.example.com/v1");
    assert_eq!(normalize_base_url("http://localhost:8080").unwrap(), "http://localhost:8080");
}

#[test]
fn non_http_base_url_is_rejected() {
    for raw in ["", "ftp://example.com", "api.example.com/v1"] {
        assert!(matches!(normalize_base_url(raw), Err(LlmError::ConfigParse(_))), "{raw:?}");
    }
}

#[test]
fn default_timeouts() {
    let timeouts = LlmTimeouts::default();
    assert_eq!(timeouts.request_secs, 120);
    assert_eq!(timeouts.connect_secs, 10);
    assert_eq!(timeouts.stream_idle_secs, 60);
}

#[test]
fn stored_key_is_used_without_environment_override() {
    if std::env::var_os(API_KEY_ENV).is_some() {
        return;
    }
    let config = LlmConfig::resolve(&AiSettings::default(), Some("sk-stored".into())).unwrap();
    assert_eq!(config.api_key, "sk-stored");
    assert_eq!(config.base_url, crate::services::settings::DEFAULT_BASE_URL);
}

#[test]
fn missing_key_is_reported() {
    if std::env::var_os(API_KEY_ENV).is_some() {
        return;
    }
    let err = LlmConfig::resolve(&AiSettings::default(), None).unwrap_err();
    assert!(matches!(err, LlmError::MissingApiKey { ref var } if var == API_KEY_ENV));
}

#[test]
fn invalid_base_url_fails_resolution() {
    let settings = AiSettings { base_url: "localhost".into(), ..AiSettings::default() };
    assert!(matches!(
        LlmConfig::resolve(&settings, Some("sk".into())),
        Err(LlmError::ConfigParse(_))
    ));
}
