//! Mapping of domain errors onto HTTP responses.
//!
//! Every failure body has the same shape: `{"error": "...", "code": "..."}`.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use serde::Serialize;

use nakshatra_core::error::{ChartError, Error, SessionError};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, code: &'static str, error: impl Into<String>) -> ApiError {
    (status, Json(ErrorResponse { error: error.into(), code }))
}

/// Status and machine-readable code for a domain error.
pub fn classify(error: &Error) -> (StatusCode, &'static str) {
    match error {
        Error::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
        Error::Chart(ChartError::PlaceNotFound(_)) => (StatusCode::NOT_FOUND, "place_not_found"),
        Error::Chart(ChartError::InvalidBirthData(_)) => (StatusCode::BAD_REQUEST, "invalid_birth_data"),
        Error::Chart(_) => (StatusCode::BAD_GATEWAY, "chart_service_error"),
        Error::Session(SessionError::NotFound(_)) => (StatusCode::NOT_FOUND, "session_not_found"),
        Error::Session(_) => (StatusCode::INTERNAL_SERVER_ERROR, "session_storage_error"),
        Error::Generation(_) | Error::Provider(_) => (StatusCode::BAD_GATEWAY, "generation_failed"),
        Error::Knowledge(_) => (StatusCode::BAD_GATEWAY, "knowledge_store_error"),
        Error::Config { .. } | Error::Serialization(_) | Error::Internal(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
        }
    }
}

/// Log and convert a domain error.
pub fn from_domain(error: Error) -> ApiError {
    let (status, code) = classify(&error);
    if status.is_server_error() {
        tracing::error!(code, error = %error, "Request failed");
    } else {
        tracing::debug!(code, error = %error, "Request rejected");
    }
    api_error(status, code, error.to_string())
}

/// A request body that was too large or did not deserialize.
pub fn from_rejection(rejection: JsonRejection) -> ApiError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return api_error(StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large", rejection.body_text());
    }
    api_error(StatusCode::BAD_REQUEST, "invalid_request", rejection.body_text())
}

pub fn session_not_found(session_id: &str) -> ApiError {
    from_domain(SessionError::NotFound(session_id.to_string()).into())
}
