//! Error taxonomy for the HTTP boundary.
//!
//! Every handler returns `Result<_, ApiError>`. Store and internal failures are
//! logged here and surface as a bare `500` so no internal detail leaks.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::error;

use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// No bearer token on an authenticated route.
    #[error("Authentication required")]
    Unauthenticated,
    /// Bad signature, malformed or expired token, or the user is gone.
    #[error("Please authenticate")]
    InvalidToken,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Google authentication failed")]
    InvalidAssertion,
    #[error("Username already exists")]
    DuplicateUsername,
    #[error("{0}")]
    Validation(String),
    /// Also returned when the book exists but belongs to someone else.
    #[error("Book not found")]
    NotFound,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated
            | Self::InvalidToken
            | Self::InvalidCredentials
            | Self::InvalidAssertion => StatusCode::UNAUTHORIZED,
            Self::DuplicateUsername | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Store(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::Store(err) => {
                error!("Store error: {err}");
                "Internal server error".to_string()
            }
            Self::Internal(err) => {
                error!("Internal error: {err}");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
