use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without a token. Registration and login are the only
/// way to obtain credentials.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers.
        .route("/health", get(|| async { "ok" }))
        // POST /auth/register
        // Creates a `user`-role account. Duplicate usernames get 400.
        .route("/auth/register", post(handlers::register_user))
        // POST /auth/login
        // Exchanges username/password for a 30-minute bearer token.
        .route("/auth/login", post(handlers::login))
}
