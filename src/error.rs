use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::store::RosterError;

#[derive(Debug)]
pub enum ApiError {
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    Validation(String),
    InvalidState(String),
    Conflict(String),
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Validation(msg) | ApiError::InvalidState(msg) => {
                (StatusCode::BAD_REQUEST, msg)
            }
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Internal(msg) => {
                tracing::error!("internal error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".into(),
                )
            }
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

// Malformed or incomplete request bodies share the validation shape
// instead of axum's default 422 plain-text rejection.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<RosterError> for ApiError {
    fn from(value: RosterError) -> Self {
        let message = value.to_string();
        match value {
            RosterError::NotFound(_) => ApiError::NotFound(message),
            RosterError::Forbidden(_) => ApiError::Forbidden(message),
            RosterError::Validation(_) => ApiError::Validation(message),
            RosterError::InvalidState(_) => ApiError::InvalidState(message),
            RosterError::Conflict(_) => ApiError::Conflict(message),
        }
    }
}
