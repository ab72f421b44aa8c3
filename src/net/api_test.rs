use super::*;
use crate::storage::MemoryStore;

// =============================================================================
// endpoints
// =============================================================================

#[test]
fn endpoints_join_base_and_path() {
    assert_eq!(login_endpoint("http://auth:8081"), "http://auth:8081/api/auth/login");
    assert_eq!(users_endpoint("http://auth:8081"), "http://auth:8081/api/usuarios");
    assert_eq!(user_endpoint("http://auth:8081", "u-7"), "http://auth:8081/api/usuarios/u-7");
    assert_eq!(reservations_endpoint("http://labs"), "http://labs/api/asignacion_lab");
    assert_eq!(
        user_reservations_endpoint("http://labs", "u-7"),
        "http://labs/api/asignacion_lab/usuario/u-7"
    );
}

// =============================================================================
// auth_headers / stored_token
// =============================================================================

#[test]
fn auth_headers_with_token_sets_bearer() {
    let headers = auth_headers(Some("abc.def"));
    assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer abc.def");
    assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "application/json");
}

#[test]
fn auth_headers_without_token_is_empty() {
    let headers = auth_headers(None);
    assert!(headers.get(AUTHORIZATION).is_none());
    assert!(headers.is_empty());
}

#[test]
fn auth_headers_invalid_token_is_dropped() {
    let headers = auth_headers(Some("bad\ntoken"));
    assert!(headers.get(AUTHORIZATION).is_none());
}

#[test]
fn stored_token_reads_raw_value() {
    let storage = MemoryStore::new();
    assert_eq!(stored_token(&storage), None);

    storage.set(TOKEN_KEY, "tok-1").unwrap();
    assert_eq!(stored_token(&storage).as_deref(), Some("tok-1"));

    storage.set(TOKEN_KEY, "  ").unwrap();
    assert_eq!(stored_token(&storage), None);
}

// =============================================================================
// ApiError
// =============================================================================

#[test]
fn unauthorized_covers_401_and_403() {
    assert!(ApiError::Status { status: 401, body: String::new() }.is_unauthorized());
    assert!(ApiError::Status { status: 403, body: String::new() }.is_unauthorized());
    assert!(!ApiError::Status { status: 500, body: String::new() }.is_unauthorized());
    assert!(!ApiError::Request("refused".into()).is_unauthorized());
}

#[test]
fn user_message_prefers_backend_message() {
    let err = ApiError::Status { status: 409, body: r#"{"message":"Usuario o email ya existen."}"#.into() };
    assert_eq!(err.user_message(), "Usuario o email ya existen.");
}

#[test]
fn user_message_falls_back_to_display() {
    let err = ApiError::Status { status: 502, body: "<html>bad gateway</html>".into() };
    assert_eq!(err.user_message(), "server responded with status 502");
}

// =============================================================================
// HttpLabApi
// =============================================================================

#[test]
fn http_client_builds_from_default_config() {
    let api = HttpLabApi::new(&ClientConfig::default(), Arc::new(MemoryStore::new())).unwrap();
    assert_eq!(api.labs_url, crate::config::DEFAULT_LABS_URL);
    assert!(api.headers().is_empty());
}

#[tokio::test]
async fn unreachable_backend_is_request_error() {
    let config = ClientConfig::default()
        .with_labs_url("http://127.0.0.1:1")
        .unwrap();
    let api = HttpLabApi::new(&config, Arc::new(MemoryStore::new())).unwrap();
    let err = api.list_laboratories().await.unwrap_err();
    assert!(matches!(err, ApiError::Request(_)));
}
