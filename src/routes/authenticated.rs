use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Authenticated Router Module
///
/// Every handler here receives a verified `AuthUser`. Per-user isolation
/// (own profile, own storage prefix) is enforced inside the handlers.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /auth/me
        .route("/auth/me", get(handlers::get_me))
        // GET /users
        .route("/users", get(handlers::list_users))
        // GET/PUT /users/{id}
        // Updates are limited to the caller's own profile unless admin.
        .route(
            "/users/{id}",
            get(handlers::get_user).put(handlers::update_user),
        )
        // POST /files/upload-url?filename=...
        // Presigned PUT under "{caller_id}/", 10-minute validity.
        .route("/files/upload-url", post(handlers::get_upload_url))
        // GET /files/download-url?object_name=...
        // Presigned GET, refused with 403 outside the caller's prefix.
        .route("/files/download-url", get(handlers::get_download_url))
}
