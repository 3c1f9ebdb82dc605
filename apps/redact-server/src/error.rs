//! Error types for the redaction server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use redact_core::{ErrorBody, GenerationError, PdfError, ValidationError};
use thiserror::Error;

use crate::media::MediaError;
use crate::render;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Document not found: {0}")]
    DocumentNotFound(i64),

    #[error("Redaction not found: {0}")]
    RedactionNotFound(i64),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Stored document is unreadable: {0}")]
    Pdf(#[from] PdfError),

    #[error("Failed to generate redacted PDF: {0}")]
    Generation(#[from] GenerationError),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DocumentNotFound(id) => ApiError::DocumentNotFound(id),
            StoreError::RedactionNotFound(id) => ApiError::RedactionNotFound(id),
            StoreError::Validation(e) => ApiError::Validation(e),
            StoreError::Pdf(e) => ApiError::Pdf(e),
            StoreError::Media(e) => ApiError::Media(e),
            StoreError::Database(e) => ApiError::Database(e),
        }
    }
}

impl ApiError {
    /// Status and structured body; server-side failures are logged and not leaked
    pub fn body(&self) -> (StatusCode, ErrorBody) {
        let (status, code, message) = match self {
            ApiError::DocumentNotFound(_) => {
                (StatusCode::NOT_FOUND, "DOCUMENT_NOT_FOUND", self.to_string())
            }
            ApiError::RedactionNotFound(_) => {
                (StatusCode::NOT_FOUND, "REDACTION_NOT_FOUND", self.to_string())
            }
            ApiError::Validation(e) => (StatusCode::UNPROCESSABLE_ENTITY, e.code(), e.to_string()),
            ApiError::InvalidRequest(msg) => {
                (StatusCode::BAD_REQUEST, "INVALID_REQUEST", msg.clone())
            }
            ApiError::Pdf(e) => {
                tracing::error!("Unreadable document: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INVALID_DOCUMENT",
                    "Stored document could not be read".to_string(),
                )
            }
            ApiError::Generation(e) => {
                tracing::error!("Generation error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "GENERATION_FAILED",
                    "Failed to generate redacted PDF".to_string(),
                )
            }
            ApiError::Media(e) => {
                tracing::error!("Media error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "MEDIA_ERROR",
                    "Document file unavailable".to_string(),
                )
            }
            ApiError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "Database error".to_string(),
                )
            }
            ApiError::Internal(e) => {
                tracing::error!("Internal error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal error".to_string(),
                )
            }
        };

        let body = ErrorBody {
            success: false,
            error: message,
            code: code.to_string(),
            status: status.as_u16(),
        };
        (status, body)
    }

    /// Reason patched into `#redaction-error`, sent with a 200 status
    pub fn into_datastar_response(self) -> Response {
        let (_, body) = self.body();
        render::patch_elements([render::error_notice(&body.error)]).into_response()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = self.body();
        (status, Json(body)).into_response()
    }
}
