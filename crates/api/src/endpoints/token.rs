//! `POST /api/v1/token` — issues a bearer token for an admin account (§6).

use axum::{
    extract::State,
    http::header::{HeaderValue, SET_COOKIE},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use relay_common::{verify_password, AppError, AppResult};
use serde::{Deserialize, Serialize};

use crate::middleware::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct TokenResponse {
    pub code: String,
}

/// Authenticates `username`/`password`, mints a fresh bearer token, and sets
/// it as the `user-token` cookie for the (out-of-core) web admin UI in
/// addition to returning it in the body for CLI/API consumers (§6).
async fn create_token(State(state): State<AppState>, Json(req): Json<TokenRequest>) -> AppResult<Response> {
    let user = state
        .user_repo
        .find_by_username(&req.username)
        .await?
        .ok_or(AppError::Unauthorized)?;

    if !verify_password(&req.password, &user.hash)? {
        return Err(AppError::Unauthorized);
    }

    let token = state.token_repo.create(&user.id).await?;
    let cookie = format!("user-token={}; Path=/; HttpOnly; SameSite=Strict", token.id);
    let cookie_value = HeaderValue::from_str(&cookie).map_err(|e| AppError::Internal(e.to_string()))?;

    let mut response = Json(TokenResponse { code: token.id }).into_response();
    response.headers_mut().insert(SET_COOKIE, cookie_value);
    Ok(response)
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(create_token))
}
