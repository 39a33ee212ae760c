//! Error handling for the image tagging service
//!
//! Lower layer failures are translated into `AppError` at the service
//! boundary; only the messages chosen here ever reach a client.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shared::ValidationError;
use thiserror::Error;

use crate::external::TaggingError;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Invalid multipart payload: {0}")]
    InvalidMultipart(String),

    #[error("No Image found with the id {id}")]
    NotFound { id: i64 },

    // Tagging errors
    #[error("{message}")]
    Processing {
        message: &'static str,
        #[source]
        source: TaggingError,
    },

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::InvalidMultipart(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Processing { .. } | AppError::DatabaseError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let error_detail = match &self {
            AppError::Validation(err) => ErrorDetail {
                code: "VALIDATION_ERROR".to_string(),
                message: err.to_string(),
            },
            AppError::InvalidMultipart(msg) => ErrorDetail {
                code: "INVALID_MULTIPART".to_string(),
                message: format!("Invalid multipart payload: {}", msg),
            },
            AppError::NotFound { id } => ErrorDetail {
                code: "NOT_FOUND".to_string(),
                message: format!("No Image found with the id {}", id),
            },
            AppError::Processing { message, .. } => ErrorDetail {
                code: "PROCESSING_ERROR".to_string(),
                message: (*message).to_string(),
            },
            AppError::DatabaseError(_) => ErrorDetail {
                code: "INTERNAL_ERROR".to_string(),
                message: "An internal server error occurred".to_string(),
            },
        };

        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Error: {:?}", self);
        } else {
            tracing::debug!("Rejected request: {}", self);
        }

        (status, Json(ErrorResponse { error: error_detail })).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;
