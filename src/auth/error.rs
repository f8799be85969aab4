use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::error;

use crate::auth::dto::MessageResponse;

/// User-facing error taxonomy. Every variant maps to a status code and a
/// short message; infrastructure failures collapse to a generic 500 so no
/// internal detail crosses the boundary.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Please provide {0}")]
    MissingField(&'static str),
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("User already exists")]
    AlreadyExists,
    #[error("Invalid or expired reset token")]
    InvalidOrExpiredToken,
    #[error("User not found")]
    NotFound,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::MissingField(_) | AuthError::AlreadyExists => StatusCode::BAD_REQUEST,
            AuthError::InvalidCredentials | AuthError::InvalidOrExpiredToken => {
                StatusCode::UNAUTHORIZED
            }
            AuthError::NotFound => StatusCode::NOT_FOUND,
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AuthError::Internal(e) => {
                error!(error = %e, "internal error");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(MessageResponse { message })).into_response()
    }
}
