use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

use crate::store::StoreError;
use crate::voting::error::VoteError;

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Vote rejected: {0}")]
    Vote(#[from] VoteError),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => AppError::NotFound("Poll not found".to_string()),
            StoreError::Duplicate(id) => AppError::InternalError(format!("duplicate record id {id}")),
            StoreError::Unavailable(msg) => AppError::Vote(VoteError::Unavailable(msg)),
        }
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        AppError::AuthenticationError(err.to_string())
    }
}

impl AppError {
    fn parts(self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Vote(rejection) => {
                let message = rejection.to_string();
                match rejection {
                    VoteError::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND", message),
                    VoteError::Expired => (StatusCode::GONE, "POLL_EXPIRED", message),
                    VoteError::InvalidOption => (StatusCode::BAD_REQUEST, "INVALID_OPTION", message),
                    VoteError::AlreadyVoted => (StatusCode::CONFLICT, "ALREADY_VOTED", message),
                    VoteError::CapacityReached => (StatusCode::CONFLICT, "CAPACITY_REACHED", message),
                    VoteError::Unavailable(msg) => {
                        error!("Poll store unavailable: {msg}");
                        (
                            StatusCode::SERVICE_UNAVAILABLE,
                            "STORE_UNAVAILABLE",
                            "Storage is temporarily unavailable, please retry".to_string(),
                        )
                    }
                }
            }
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg),
            AppError::AuthenticationError(msg) => {
                (StatusCode::UNAUTHORIZED, "AUTHENTICATION_ERROR", msg)
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            AppError::InternalError(msg) => {
                error!("Internal error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Something went wrong".to_string(),
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let details = match &self {
            AppError::Vote(rejection) if rejection.is_retryable() => Some("retryable".to_string()),
            _ => None,
        };
        let (status, error_type, message) = self.parts();

        let error_response = ErrorResponse {
            error: error_type.to_string(),
            message,
            details,
        };

        (status, Json(error_response)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
