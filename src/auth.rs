use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use std::sync::Arc;

use crate::{
    error::{ApiError, AuthError},
    models::Role,
    repository::RepositoryState,
    token::TokenService,
};

/// TokenState
///
/// The shared, immutable issuer/verifier held in the application state.
pub type TokenState = Arc<TokenService>;

/// AuthUser Extractor Result
///
/// The resolved identity of an authenticated request. `role` and `username`
/// come from the Credential Store at request time, not from the token, so a
/// role change takes effect on the next request.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub id: i64,
    pub username: String,
    pub role: Role,
}

/// AuthUser Extractor Implementation
///
/// Makes `AuthUser` usable as a handler argument. The flow:
/// 1. Dependency Resolution: repository and token service from the state.
/// 2. Token Extraction: `Authorization: Bearer <token>`.
/// 3. Token Verification: signature, structure, then expiry.
/// 4. DB Lookup: the subject must still resolve to an account. A token that
///    outlives its account does not authenticate.
///
/// Rejection: every token failure renders as the same 401 with a bearer
/// challenge. A Credential Store error is a 500.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    TokenState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let tokens = TokenState::from_ref(state);

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(bearer_token)
            .ok_or(AuthError::InvalidToken)?;

        let verified = tokens.verify_now(token).map_err(|e| {
            // Only the logs may tell an expired token from a forged one.
            match e {
                AuthError::Expired => tracing::info!("rejected expired token"),
                _ => tracing::warn!("rejected invalid token"),
            }
            e
        })?;

        // A store failure is a 500, never a token rejection.
        let account = repo
            .get_account(verified.subject_id)
            .await?
            .ok_or_else(|| {
                tracing::warn!(
                    user_id = verified.subject_id,
                    "token subject no longer exists"
                );
                AuthError::InvalidToken
            })?;

        Ok(AuthUser {
            id: account.id,
            username: account.username,
            role: account.role,
        })
    }
}

/// Token part of an `Authorization` value. The scheme name is matched
/// case-insensitively, so `bearer <token>` (the `token_type` login returns)
/// works as well as `Bearer <token>`.
fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// authorize
///
/// Single-role gate: `Forbidden` unless `identity` holds `required_role`.
/// Returns the identity unchanged on success.
pub fn authorize(identity: AuthUser, required_role: Role) -> Result<AuthUser, AuthError> {
    authorize_any(identity, &[required_role])
}

/// authorize_any
///
/// Membership form of the gate: the identity's role must be one of `allowed`.
pub fn authorize_any(identity: AuthUser, allowed: &[Role]) -> Result<AuthUser, AuthError> {
    if allowed.contains(&identity.role) {
        Ok(identity)
    } else {
        tracing::warn!(
            user_id = identity.id,
            role = %identity.role,
            "role check failed"
        );
        Err(AuthError::Forbidden)
    }
}

/// AdminUser
///
/// An `AuthUser` that has passed `authorize(_, Role::Admin)`. Handlers taking
/// this extractor never run for anyone else: unauthenticated callers get 401,
/// authenticated non-admins get 403.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    TokenState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        Ok(AdminUser(authorize(user, Role::Admin)?))
    }
}
