use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, post},
};

/// Admin Router Module
///
/// User management restricted to the `admin` role. The handlers take the
/// `AdminUser` extractor, which authenticates and then applies the role gate,
/// so these routes are safe even without an outer middleware layer.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // POST /users
        // Creates an account with an explicit role.
        .route("/users", post(handlers::create_user))
        // DELETE /users/{id}
        .route("/users/{id}", delete(handlers::delete_user))
}
