use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::auth::repo::StoreError;

/// Errors surfaced at the handler boundary. Every variant renders as `{"message": ...}`.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("email already exists")]
    EmailExists,
    #[error("user not found")]
    UserNotFound,
    #[error("user is not verified")]
    NotVerified,
    #[error("invalid credential")]
    InvalidCredential,
    #[error("{0}")]
    Unauthorized(&'static str),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, Serialize)]
pub struct MessageBody {
    pub message: String,
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            // 402 and the shared 404 are kept for compatibility with existing clients
            AuthError::EmailExists => StatusCode::PAYMENT_REQUIRED,
            AuthError::UserNotFound | AuthError::NotVerified | AuthError::InvalidCredential => {
                StatusCode::NOT_FOUND
            }
            AuthError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Duplicate => AuthError::EmailExists,
            StoreError::Database(e) => AuthError::Internal(e.into()),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AuthError::Internal(e) => {
                error!(error = ?e, "internal error");
                "something went wrong".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(MessageBody { message })).into_response()
    }
}
