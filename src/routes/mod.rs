/// Router Module Index
///
/// Routing is split by access level so protection is applied per module
/// rather than per handler registration.

/// Routes accessible without a token: health, registration, login.
pub mod public;

/// Routes behind the `AuthUser` middleware. Requires a valid bearer token.
pub mod authenticated;

/// Routes whose handlers take `AdminUser`: 401 without a token, 403 for
/// non-admins.
pub mod admin;
