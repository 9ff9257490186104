use super::*;

#[test]
fn auth_statuses_share_one_code() {
    for status in [401, 403] {
        let err = LlmError::ApiResponse { status, body: String::new() };
        assert_eq!(err.error_code(), "E_API_AUTH");
        assert!(!err.retryable());
    }
}

#[test]
fn throttling_and_server_errors_are_retryable() {
    for status in [429, 500, 503] {
        let err = LlmError::ApiResponse { status, body: String::new() };
        assert_eq!(err.error_code(), "E_API_RESPONSE");
        assert!(err.retryable(), "status {status}");
    }
    assert!(!LlmError::ApiResponse { status: 400, body: String::new() }.retryable());
}

#[test]
fn transport_failures_are_retryable() {
    assert!(LlmError::ApiRequest("timeout".into()).retryable());
    assert!(LlmError::Stream("reset".into()).retryable());
    assert!(!LlmError::ApiParse("bad".into()).retryable());
}

#[test]
fn missing_key_names_the_variable() {
    let err = LlmError::MissingApiKey { var: "PLOTCONTINUUM_API_KEY".into() };
    assert_eq!(err.error_code(), "E_MISSING_API_KEY");
    assert!(err.to_string().contains("PLOTCONTINUUM_API_KEY"));
}

#[test]
fn user_message_serializes_role_and_content() {
    assert_eq!(ChatMessage::user("hi").role, "user");
    let json = serde_json::to_value(ChatMessage::user("hi")).unwrap();
    assert_eq!(json, serde_json::json!({ "role": "user", "content": "hi" }));
}
