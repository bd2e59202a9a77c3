use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::repository::RepositoryError;

/// Message returned for every token failure. Expired, tampered and
/// unknown-subject tokens are indistinguishable to the caller.
pub const CREDENTIALS_DETAIL: &str = "Could not validate credentials";
pub const LOGIN_FAILED_DETAIL: &str = "Invalid credentials";
pub const FORBIDDEN_DETAIL: &str = "You do not have permission to perform this action";
pub const DUPLICATE_DETAIL: &str = "Username already exists";

/// AuthError
///
/// The failure taxonomy of the authentication and authorization core. Every
/// variant is terminal for the request; nothing here is retried.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Bad username or password at login. Never says which.
    #[error("invalid username or password")]
    InvalidCredentials,
    /// Malformed, unsigned, tampered or wrongly-signed bearer token, or a
    /// subject that no longer resolves to an account.
    #[error("invalid token")]
    InvalidToken,
    /// Structurally valid token past its validity window.
    #[error("token expired")]
    Expired,
    /// Valid identity, insufficient role or namespace ownership.
    #[error("forbidden")]
    Forbidden,
    /// Registration conflict on username.
    #[error("username already exists")]
    DuplicateAccount,
    /// The token could not be signed.
    #[error("token signing failed: {0}")]
    Signing(String),
}

/// ErrorBody
///
/// JSON error payload: `{"detail": "..."}`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct ErrorBody {
    pub detail: String,
}

/// ApiError
///
/// Handler-level error. Wraps the auth taxonomy and adds the plain CRUD
/// failures. Rendering happens in one place so status codes and messages stay
/// uniform across endpoints.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Auth(AuthError::InvalidCredentials)
            | ApiError::Auth(AuthError::InvalidToken)
            | ApiError::Auth(AuthError::Expired) => StatusCode::UNAUTHORIZED,
            ApiError::Auth(AuthError::Forbidden) => StatusCode::FORBIDDEN,
            ApiError::Auth(AuthError::DuplicateAccount) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Auth(AuthError::Signing(_))
            | ApiError::Storage(_)
            | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn detail(&self) -> String {
        match self {
            ApiError::Auth(AuthError::InvalidCredentials) => LOGIN_FAILED_DETAIL.to_string(),
            ApiError::Auth(AuthError::InvalidToken) | ApiError::Auth(AuthError::Expired) => {
                CREDENTIALS_DETAIL.to_string()
            }
            ApiError::Auth(AuthError::Forbidden) => FORBIDDEN_DETAIL.to_string(),
            ApiError::Auth(AuthError::DuplicateAccount) => DUPLICATE_DETAIL.to_string(),
            ApiError::NotFound(what) => format!("{what} not found"),
            ApiError::Validation(message) => message.clone(),
            ApiError::Auth(AuthError::Signing(_))
            | ApiError::Storage(_)
            | ApiError::Internal(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            // Details stay server-side.
            tracing::error!(error = %self, "request failed");
        }

        let mut response = (status, Json(ErrorBody { detail: self.detail() })).into_response();

        if matches!(
            self,
            ApiError::Auth(AuthError::InvalidToken) | ApiError::Auth(AuthError::Expired)
        ) {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Duplicate => ApiError::Auth(AuthError::DuplicateAccount),
            RepositoryError::Database(db) => ApiError::Internal(db.to_string()),
        }
    }
}

// Malformed bodies and query strings share the 422 `{"detail": ...}` shape
// with field validation.

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ApiError::Auth(self).into_response()
    }
}
