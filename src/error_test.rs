use super::*;

#[test]
fn status_is_exposed_only_for_status_errors() {
    let err = ApiError::Status { status: 404, body: String::new() };
    assert_eq!(err.status(), Some(404));
    assert_eq!(ApiError::Timeout.status(), None);
    assert_eq!(ApiError::Network("reset".into()).status(), None);
}

#[test]
fn is_unauthorized_matches_only_401() {
    assert!(ApiError::Status { status: 401, body: String::new() }.is_unauthorized());
    assert!(!ApiError::Status { status: 403, body: String::new() }.is_unauthorized());
    assert!(!ApiError::RefreshFailed(Box::new(ApiError::Status { status: 401, body: String::new() })).is_unauthorized());
}

#[test]
fn retryable_covers_transport_and_server_errors() {
    assert!(ApiError::Network("down".into()).retryable());
    assert!(ApiError::Timeout.retryable());
    assert!(ApiError::Status { status: 429, body: String::new() }.retryable());
    assert!(ApiError::Status { status: 503, body: String::new() }.retryable());
    assert!(!ApiError::Status { status: 400, body: String::new() }.retryable());
    assert!(!ApiError::Status { status: 401, body: String::new() }.retryable());
    assert!(!ApiError::MissingToken.retryable());
}

#[test]
fn refresh_failed_display_includes_cause() {
    let err = ApiError::RefreshFailed(Box::new(ApiError::Status { status: 401, body: "expired".into() }));
    assert_eq!(err.to_string(), "token refresh failed: request failed with status 401");
}

#[test]
fn config_error_display_quotes_value() {
    let err = ConfigError::InvalidValue { var: "JOBBOARD_LEGACY_TOKEN_HEADER", value: "maybe".into() };
    assert_eq!(err.to_string(), "invalid value for JOBBOARD_LEGACY_TOKEN_HEADER: \"maybe\"");
}
