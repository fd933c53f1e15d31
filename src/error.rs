use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::db::StoreError;
use crate::validator::FieldErrors;

const INTERNAL_MESSAGE: &str =
    "the server encountered a problem and could not process your request";

/// Outcome of every domain operation that did not succeed.
///
/// Credential and token failures each collapse into a single variant so that
/// nothing downstream can tell which sub-case occurred.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("the requested resource could not be found")]
    NotFound,
    #[error("invalid or expired token")]
    InvalidOrExpiredToken,
    #[error("invalid authentication credentials")]
    InvalidCredentials,
    #[error("a user with this email address already exists")]
    DuplicateEmail,
    #[error("unable to update the record due to an edit conflict, please try again")]
    EditConflict,
    #[error("request failed validation")]
    ValidationFailed(FieldErrors),
    #[error("you must be authenticated to access this resource")]
    AuthenticationRequired,
    #[error("your user account must be activated to access this resource")]
    InactiveAccount,
    #[error("rate limit exceeded")]
    RateLimitExceeded,
    #[error("the {0} method is not supported for this resource")]
    MethodNotAllowed(Method),
    #[error("store unavailable: {0}")]
    TransientStore(#[source] StoreError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::InvalidOrExpiredToken
            | AppError::InvalidCredentials
            | AppError::AuthenticationRequired => StatusCode::UNAUTHORIZED,
            AppError::InactiveAccount => StatusCode::FORBIDDEN,
            AppError::EditConflict => StatusCode::CONFLICT,
            AppError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            AppError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            AppError::DuplicateEmail | AppError::ValidationFailed(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::TransientStore(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => AppError::NotFound,
            StoreError::EditConflict => AppError::EditConflict,
            StoreError::DuplicateEmail => AppError::DuplicateEmail,
            other => AppError::TransientStore(other),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            AppError::ValidationFailed(fields) => json!({ "error": fields }),
            AppError::DuplicateEmail => json!({ "error": { "email": self.to_string() } }),
            AppError::TransientStore(_) | AppError::Internal(_) => {
                error!(error = %self, "request failed");
                json!({ "error": INTERNAL_MESSAGE })
            }
            _ => json!({ "error": self.to_string() }),
        };

        let mut res = (status, Json(body)).into_response();
        if matches!(
            self,
            AppError::AuthenticationRequired | AppError::InvalidOrExpiredToken
        ) {
            res.headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        res
    }
}
