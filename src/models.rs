use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use thiserror::Error;
use ts_rs::TS;
use utoipa::{IntoParams, ToSchema};

use crate::error::ApiError;

pub const MIN_USERNAME_LEN: usize = 3;
pub const MIN_PASSWORD_LEN: usize = 6;

// --- Roles ---

/// Role
///
/// The RBAC value attached to every account. New roles are added as variants;
/// authorization checks are membership tests over a set of roles, so existing
/// gates keep working.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema, Default,
)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl TryFrom<String> for Role {
    type Error = UnknownRole;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            _ => Err(UnknownRole(value)),
        }
    }
}

// --- Credential Store Row ---

/// Account
///
/// A row of the `users` table. Deliberately not `Serialize`: it carries the
/// password hash, and only the response types below ever leave the process.
#[derive(Clone, FromRow)]
pub struct Account {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
    pub name: String,
    pub age: i32,
    pub created_at: DateTime<Utc>,
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("password_hash", &"<redacted>")
            .field("role", &self.role)
            .field("name", &self.name)
            .field("age", &self.age)
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// NewAccount
///
/// Insert payload for the repository. `password_hash` is already the PHC
/// string produced by the hasher.
#[derive(Clone)]
pub struct NewAccount {
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    pub name: String,
    pub age: i32,
}

// --- Request Payloads ---

/// RegisterRequest
///
/// Input payload for `POST /auth/register`. The password is hashed before it
/// reaches the repository and is never logged.
#[derive(Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RegisterRequest {
    #[schema(example = "alice", min_length = 3)]
    pub username: String,
    #[schema(example = "secret1", min_length = 6)]
    pub password: String,
    pub name: String,
    pub age: i32,
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        validate_credentials(&self.username, &self.password)?;
        validate_age(self.age)
    }
}

/// LoginRequest
#[derive(Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// CreateUserRequest
///
/// Admin-only account creation (`POST /users`). Role defaults to `user`.
#[derive(Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    pub name: String,
    pub age: i32,
    #[serde(default)]
    #[ts(optional)]
    pub role: Option<Role>,
}

impl CreateUserRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        validate_credentials(&self.username, &self.password)?;
        validate_age(self.age)
    }
}

/// UpdateUserRequest
///
/// Partial profile update (`PUT /users/{id}`). Omitted fields keep their
/// stored value.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateUserRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub age: Option<i32>,
}

impl UpdateUserRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        match self.age {
            Some(age) => validate_age(age),
            None => Ok(()),
        }
    }
}

/// UploadUrlQuery
///
/// `POST /files/upload-url?filename=...`
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UploadUrlQuery {
    /// Free-form file name. Stored under the caller's own prefix.
    pub filename: String,
}

/// DownloadUrlQuery
///
/// `GET /files/download-url?object_name=...`
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DownloadUrlQuery {
    /// Full object name, `"{owner_id}/{name}"`.
    pub object_name: String,
}

// --- Response Payloads ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct RegisterResponse {
    pub message: String,
    pub username: String,
    pub role: Role,
}

/// TokenResponse
///
/// OAuth2-style bearer token payload returned by `POST /auth/login`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

impl TokenResponse {
    pub fn bearer(access_token: String) -> Self {
        Self {
            access_token,
            token_type: "bearer".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct MeResponse {
    pub id: i64,
    pub username: String,
    pub role: Role,
}

/// UserResponse
///
/// Public profile view. No credentials, no role.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct UserResponse {
    pub id: i64,
    pub name: String,
    pub age: i32,
}

impl From<Account> for UserResponse {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            name: account.name,
            age: account.age,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct UploadUrlResponse {
    /// Presigned PUT URL, valid for 10 minutes.
    pub upload_url: String,
    pub object_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct DownloadUrlResponse {
    /// Presigned GET URL, valid for 10 minutes.
    pub download_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct MessageResponse {
    pub message: String,
}

// --- Validation ---

fn validate_credentials(username: &str, password: &str) -> Result<(), ApiError> {
    if username.chars().count() < MIN_USERNAME_LEN {
        return Err(ApiError::Validation(format!(
            "username must be at least {MIN_USERNAME_LEN} characters"
        )));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

fn validate_age(age: i32) -> Result<(), ApiError> {
    if age < 0 {
        return Err(ApiError::Validation("Age must be positive".to_string()));
    }
    Ok(())
}
