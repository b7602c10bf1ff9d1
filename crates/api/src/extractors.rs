//! Request extensions populated by [`crate::middleware::auth_middleware`].

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use relay_common::AppError;
use relay_db::entities::user;

use crate::middleware::AppState;

/// The authenticated admin user, pulled from request extensions.
///
/// # Errors
/// Rejects with [`AppError::Unauthorized`] if `auth_middleware` did not run
/// for this route, or found no valid token.
pub struct AuthUser(pub user::Model);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &AppState) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<user::Model>()
            .cloned()
            .map(AuthUser)
            .ok_or(AppError::Unauthorized)
    }
}
