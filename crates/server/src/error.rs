//! Maps `ragcore_core::Error` onto HTTP status codes (spec §7 error handling
//! design), the way the teacher's `ServerError` -> `StatusCode` conversion
//! does for its own error enum.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use ragcore_core::Error as CoreError;
use serde_json::json;

/// Thin wrapper so handlers can `?` a `ragcore_core::Error` straight into an
/// axum response.
pub struct ApiError(pub CoreError);

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = status_for(&self.0);
        let body = match &self.0 {
            CoreError::ValidationFailed(issues) => json!({
                "error": code,
                "message": self.0.to_string(),
                "issues": issues,
            }),
            CoreError::CircuitOpen { remaining_secs } => json!({
                "error": code,
                "message": self.0.to_string(),
                "retry_after_secs": remaining_secs,
            }),
            _ => json!({ "error": code, "message": self.0.to_string() }),
        };

        let mut response = (status, Json(body)).into_response();
        if let CoreError::CircuitOpen { remaining_secs } = &self.0 {
            if let Ok(value) = axum::http::HeaderValue::from_str(&remaining_secs.ceil().to_string()) {
                response.headers_mut().insert(axum::http::header::RETRY_AFTER, value);
            }
        }
        response
    }
}

fn status_for(err: &CoreError) -> (StatusCode, &'static str) {
    match err {
        CoreError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
        CoreError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
        CoreError::AlreadyExists(_) => (StatusCode::CONFLICT, "already_exists"),
        CoreError::Provider(_) => (StatusCode::BAD_GATEWAY, "provider_error"),
        CoreError::Retrieval(_) => (StatusCode::BAD_GATEWAY, "retrieval_error"),
        CoreError::CircuitOpen { .. } => (StatusCode::SERVICE_UNAVAILABLE, "circuit_open"),
        CoreError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "timeout"),
        CoreError::ValidationFailed(_) => (StatusCode::UNPROCESSABLE_ENTITY, "validation_failed"),
        CoreError::Auth(_) => (StatusCode::UNAUTHORIZED, "auth_error"),
        CoreError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_404() {
        let (status, code) = status_for(&CoreError::NotFound("pipeline".into()));
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(code, "not_found");
    }

    #[test]
    fn circuit_open_maps_to_503() {
        let (status, _) = status_for(&CoreError::CircuitOpen { remaining_secs: 12.0 });
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }
}
