use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
///
/// Everything except `Validation` is a fatal request failure and is reported
/// as a 500 with an `{error, message}` body, matching what the web client
/// already handles for these functions.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Auth service error: {0}")]
    Auth(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "Invalid request", msg.clone()),
            AppError::Unauthorized(msg) => {
                tracing::warn!("Unauthorized request: {msg}");
                (StatusCode::INTERNAL_SERVER_ERROR, "Unauthorized", msg.clone())
            }
            AppError::NotFound(msg) => {
                tracing::warn!("Lookup failed: {msg}");
                (StatusCode::INTERNAL_SERVER_ERROR, "Not found", msg.clone())
            }
            AppError::Auth(msg) => {
                tracing::error!("Auth service error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Unauthorized",
                    "Could not validate credentials".to_string(),
                )
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error",
                    "A database error occurred".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error",
                    e.to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": error,
            "message": message,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_is_bad_request() {
        let response = AppError::Validation("contactIds cannot be empty".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_fatal_errors_are_internal_server_error() {
        let cases = [
            AppError::Unauthorized("missing token".into()),
            AppError::NotFound("campaign".into()),
            AppError::Auth("timeout".into()),
            AppError::Internal(anyhow::anyhow!("boom")),
        ];
        for err in cases {
            assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
        }
    }
}
