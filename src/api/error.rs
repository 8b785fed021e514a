use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::core::MvfError;

use super::types::ErrorResponse;

/// API-specific errors with HTTP status code mapping.
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    InvalidRequest(String),
    Internal(String),
}

impl From<MvfError> for ApiError {
    fn from(err: MvfError) -> Self {
        match &err {
            MvfError::NotFound(_) | MvfError::IndexOutOfRange { .. } => {
                ApiError::NotFound(err.to_string())
            }
            _ => ApiError::Internal(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
        };

        let body = ErrorResponse {
            error: message,
            code: code.to_string(),
        };

        (status, Json(body)).into_response()
    }
}
