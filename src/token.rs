use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{error::AuthError, models::Role};

/// Fixed validity window for access tokens.
pub const ACCESS_TOKEN_TTL: Duration = Duration::from_secs(30 * 60);

const ALGORITHM: Algorithm = Algorithm::HS256;

/// Claims
///
/// Payload signed into every access token. `sub` is the account id rendered as
/// a string (JWT requires a string subject).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

/// Optional claims carried alongside the subject.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtraClaims {
    pub username: Option<String>,
    pub role: Option<Role>,
}

/// Result of a successful verification.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedToken {
    pub subject_id: i64,
    pub extra: ExtraClaims,
    pub issued_at: i64,
    pub expires_at: i64,
}

/// TokenService
///
/// Stateless issuer/verifier keyed by the process-wide symmetric secret. Built
/// once at startup and shared read-only; it holds no per-token state, so there
/// is nothing to revoke and expiry is the only bound on a token's lifetime.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl: ACCESS_TOKEN_TTL,
        }
    }

    /// Signs `{sub, iat: now, exp: now + ttl, ..extra}`. `now` is unix seconds.
    pub fn issue(
        &self,
        subject_id: i64,
        extra: ExtraClaims,
        now: i64,
    ) -> Result<String, AuthError> {
        let claims = Claims {
            sub: subject_id.to_string(),
            iat: now,
            exp: now + self.ttl.as_secs() as i64,
            username: extra.username,
            role: extra.role,
        };

        encode(&Header::new(ALGORITHM), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }

    /// Checks signature and structure first, then `now < exp`.
    ///
    /// Expiry is checked here against the caller's clock rather than by the
    /// JWT library, so there is no leeway: a token is dead at exactly
    /// `iat + ttl`.
    pub fn verify(&self, token: &str, now: i64) -> Result<VerifiedToken, AuthError> {
        let mut validation = Validation::new(ALGORITHM);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            tracing::debug!(kind = ?e.kind(), "token rejected");
            AuthError::InvalidToken
        })?;
        let claims = data.claims;

        if now >= claims.exp {
            tracing::debug!(exp = claims.exp, now, "token expired");
            return Err(AuthError::Expired);
        }

        let subject_id = claims.sub.parse::<i64>().map_err(|_| {
            tracing::debug!("token subject is not an account id");
            AuthError::InvalidToken
        })?;

        Ok(VerifiedToken {
            subject_id,
            extra: ExtraClaims {
                username: claims.username,
                role: claims.role,
            },
            issued_at: claims.iat,
            expires_at: claims.exp,
        })
    }

    pub fn issue_now(&self, subject_id: i64, extra: ExtraClaims) -> Result<String, AuthError> {
        self.issue(subject_id, extra, Utc::now().timestamp())
    }

    pub fn verify_now(&self, token: &str) -> Result<VerifiedToken, AuthError> {
        self.verify(token, Utc::now().timestamp())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000;

    #[test]
    fn claims_carry_fixed_window() {
        let service = TokenService::new("unit-secret");
        let token = service.issue(7, ExtraClaims::default(), NOW).unwrap();
        let verified = service.verify(&token, NOW).unwrap();

        assert_eq!(verified.issued_at, NOW);
        assert_eq!(verified.expires_at, NOW + 30 * 60);
    }

    #[test]
    fn garbage_is_invalid_not_expired() {
        let service = TokenService::new("unit-secret");
        assert_eq!(service.verify("", NOW), Err(AuthError::InvalidToken));
        assert_eq!(service.verify("a.b.c", NOW), Err(AuthError::InvalidToken));
    }

    #[test]
    fn non_numeric_subject_is_rejected() {
        let service = TokenService::new("unit-secret");
        let claims = Claims {
            sub: "alice".to_string(),
            iat: NOW,
            exp: NOW + 60,
            username: None,
            role: None,
        };
        let token = encode(
            &Header::new(ALGORITHM),
            &claims,
            &EncodingKey::from_secret(b"unit-secret"),
        )
        .unwrap();

        assert_eq!(service.verify(&token, NOW), Err(AuthError::InvalidToken));
    }

    #[test]
    fn other_algorithm_is_rejected() {
        let service = TokenService::new("unit-secret");
        let claims = Claims {
            sub: "1".to_string(),
            iat: NOW,
            exp: NOW + 60,
            username: None,
            role: None,
        };
        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(b"unit-secret"),
        )
        .unwrap();

        assert_eq!(service.verify(&token, NOW), Err(AuthError::InvalidToken));
    }
}
