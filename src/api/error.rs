//! API error types with structured JSON responses.
//!
//! Taxonomy: missing/foreign entities answer with the same NOT_FOUND
//! signal; malformed input is VALIDATION; lifecycle violations are
//! INVALID_STATE; persistence failures are logged and surfaced as a
//! generic INTERNAL. Upstream LLM failures never reach this type on
//! generation paths — those fall back to deterministic content.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::chat::ChatError;
use crate::db::DatabaseError;
use crate::journal::JournalError;
use crate::report::ReportError;

/// Structured error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Authentication required")]
    Unauthorized,
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid request: {0}")]
    Validation(String),
    #[error("Invalid state: {0}")]
    InvalidState(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "AUTH_REQUIRED",
                "Authentication required".to_string(),
            ),
            ApiError::NotFound(detail) => (StatusCode::NOT_FOUND, "NOT_FOUND", detail.clone()),
            ApiError::Validation(detail) => (StatusCode::BAD_REQUEST, "VALIDATION", detail.clone()),
            ApiError::InvalidState(detail) => {
                (StatusCode::CONFLICT, "INVALID_STATE", detail.clone())
            }
            ApiError::Internal(detail) => {
                tracing::error!(detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ErrorBody {
            error: ErrorDetail { code, message },
        };
        (status, Json(body)).into_response()
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound { entity_type, .. } => {
                ApiError::NotFound(format!("{entity_type} not found"))
            }
            DatabaseError::InvalidEnum { field, value } => {
                ApiError::Validation(format!("Invalid value for {field}: {value}"))
            }
            DatabaseError::ConstraintViolation(detail) => ApiError::Validation(detail),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::NotFound => ApiError::NotFound("Conversation not found".into()),
            ChatError::InvalidState(detail) => ApiError::InvalidState(detail),
            ChatError::Validation(detail) => ApiError::Validation(detail),
            ChatError::Database(e) => e.into(),
        }
    }
}

impl From<JournalError> for ApiError {
    fn from(err: JournalError) -> Self {
        match err {
            JournalError::NotFound => ApiError::NotFound("Symptom not found".into()),
            JournalError::Validation(detail) => ApiError::Validation(detail),
            JournalError::Database(e) => e.into(),
        }
    }
}

impl From<ReportError> for ApiError {
    fn from(err: ReportError) -> Self {
        match err {
            ReportError::NotFound => ApiError::NotFound("Report or conversation not found".into()),
            ReportError::EmptyTranscript => {
                ApiError::Validation("Conversation has no messages to report on".into())
            }
            ReportError::Pdf(detail) => ApiError::Internal(detail),
            ReportError::Database(e) => e.into(),
        }
    }
}
