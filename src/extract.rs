use axum::extract::{FromRequest, FromRequestParts};

use crate::error::ApiError;

/// ApiJson
///
/// `axum::Json` whose rejection is an `ApiError`: a body that does not
/// deserialize gets the same 422 `{"detail": ...}` as a failed `validate()`.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// ApiQuery
///
/// `axum::extract::Query` with the same 422 rejection, so a missing or
/// malformed query parameter is reported as JSON too.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);
