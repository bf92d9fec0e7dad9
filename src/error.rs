use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::views;

/// AppError
///
/// The single error type flowing out of handlers, extractors and the repository layer.
/// Authorization and missing-listing cases never reach this type: they are recovered
/// locally with a redirect and a flash message.
#[derive(Debug, Error)]
pub enum AppError {
    /// Payload failed the boundary schema. Carries the joined field messages.
    #[error("{0}")]
    Validation(String),

    #[error("Page Not Found!")]
    NotFound,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    #[error("Password hashing failed: {0}")]
    Password(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Database(_)
            | AppError::Session(_)
            | AppError::Password(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Centralized error responder.
///
/// Client errors show their message; server errors are logged with full detail and the
/// client only sees a generic page.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            "Something went wrong!".to_string()
        } else {
            tracing::debug!(error = %self, "request rejected");
            self.to_string()
        };

        (status, views::error_page(status, &message)).into_response()
    }
}
