//! API error types and conversions

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::error;

use crate::store::FleetError;

/// API result type
pub type ApiResult<T> = Result<T, ApiError>;

/// API error types
#[derive(Debug)]
pub enum ApiError {
    /// Invalid request parameters or body
    InvalidRequest(String),

    /// Resource not found
    NotFound(String),

    /// Internal server error
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            ApiError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Internal(msg) => {
                error!("internal API error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<FleetError> for ApiError {
    fn from(err: FleetError) -> Self {
        if err.is_not_found() {
            ApiError::NotFound(err.to_string())
        } else if err.is_invalid_input() {
            ApiError::InvalidRequest(err.to_string())
        } else {
            ApiError::Internal(err.to_string())
        }
    }
}

/// Malformed, mistyped or missing JSON bodies are all client errors
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidRequest(rejection.body_text())
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_fleet_errors_map_to_status_classes() {
        assert_matches!(
            ApiError::from(FleetError::AgentNotFound("9".into())),
            ApiError::NotFound(_)
        );
        assert_matches!(
            ApiError::from(FleetError::PolicyNotFound {
                agent_id: "1".into(),
                policy_id: "p9".into()
            }),
            ApiError::NotFound(_)
        );
        assert_matches!(
            ApiError::from(FleetError::InvalidStatus("sleeping".into())),
            ApiError::InvalidRequest(msg) if msg.contains("sleeping")
        );
        assert_matches!(ApiError::from(FleetError::Unavailable), ApiError::Internal(_));
    }

    #[test]
    fn test_response_status_codes() {
        let cases = [
            (ApiError::InvalidRequest("bad".into()), StatusCode::BAD_REQUEST),
            (ApiError::NotFound("gone".into()), StatusCode::NOT_FOUND),
            (ApiError::Internal("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }
}
