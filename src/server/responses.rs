use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// `{"error": message}` with the given status.
pub fn json_error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

/// A feature whose upstream integration was not configured.
pub fn not_configured(feature: &str, setting: &str) -> Response {
    json_error(
        StatusCode::SERVICE_UNAVAILABLE,
        format!("{} is not configured, set [{}] in the config file", feature, setting),
    )
}
