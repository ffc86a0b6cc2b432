//! HTTP error responses

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::tasks::TaskError;

/// API error responses
/// Converted to HTTP status codes via IntoResponse
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        };

        // Client mistakes, not server faults
        tracing::debug!("API error: {} - {}", status, message);

        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<TaskError> for ApiError {
    fn from(err: TaskError) -> Self {
        match err {
            TaskError::NotFound(_) => ApiError::NotFound(err.to_string()),
        }
    }
}
