pub mod admin;
pub mod auth;
pub mod booking;
pub mod event;
pub mod user;

use actix_web::{HttpMessage, HttpRequest};

use crate::{errors::ApiError, service::auth::UserAuthData};

/// Caller identity injected by the auth middleware. Absence means the
/// route was wired outside an authenticated scope.
pub fn auth_data(req: &HttpRequest) -> Result<UserAuthData, ApiError> {
    req.extensions()
        .get::<UserAuthData>()
        .cloned()
        .ok_or(ApiError::Unauthorized)
}
