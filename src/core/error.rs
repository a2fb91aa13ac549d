use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::shared::flash::{redirect_with_notice, Notice};
use crate::shared::views;

/// Generic message shown for server-side failures
const GENERIC_ERROR_MESSAGE: &str = "Something went wrong!";

#[derive(Debug, Error)]
#[allow(dead_code)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("External service error: {0}")]
    ExternalServiceError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            // Recoverable conditions become a redirect carrying a notice
            AppError::NotFound(msg) => redirect_with_notice("/listings", Notice::error(msg)),
            AppError::Unauthorized(msg) => redirect_with_notice("/login", Notice::error(msg)),
            AppError::Forbidden(msg) => redirect_with_notice("/listings", Notice::error(msg)),

            AppError::Validation(msg) | AppError::BadRequest(msg) => {
                views::render_error(StatusCode::BAD_REQUEST, &msg)
            }
            AppError::Conflict(msg) => views::render_error(StatusCode::CONFLICT, &msg),
            AppError::Database(ref e) => {
                tracing::error!("Database error: {:?}", e);
                views::render_error(StatusCode::INTERNAL_SERVER_ERROR, GENERIC_ERROR_MESSAGE)
            }
            AppError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                views::render_error(StatusCode::INTERNAL_SERVER_ERROR, GENERIC_ERROR_MESSAGE)
            }
            AppError::ExternalServiceError(ref msg) => {
                tracing::error!("External service error: {}", msg);
                views::render_error(
                    StatusCode::BAD_GATEWAY,
                    "An external service is unavailable. Please try again later.",
                )
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
