//! `/api/v1/whitelist` — explicitly allowed domains (§4.E, effective only
//! while `whitelist-enabled=true`).

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use relay_common::AppResult;
use relay_db::entities::whitelist;
use serde::Deserialize;

use crate::extractors::AuthUser;
use crate::middleware::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhitelistRequest {
    pub domain: String,
}

async fn list_whitelist(_user: AuthUser, State(state): State<AppState>) -> AppResult<Json<Vec<whitelist::Model>>> {
    Ok(Json(state.whitelist_repo.find_all().await?))
}

async fn add_whitelist(
    _user: AuthUser,
    State(state): State<AppState>,
    Json(req): Json<WhitelistRequest>,
) -> AppResult<Json<whitelist::Model>> {
    Ok(Json(state.whitelist_repo.add(&req.domain).await?))
}

async fn remove_whitelist(_user: AuthUser, State(state): State<AppState>, Path(domain): Path<String>) -> AppResult<()> {
    state.whitelist_repo.remove(&domain).await
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_whitelist).post(add_whitelist))
        .route("/{domain}", axum::routing::delete(remove_whitelist))
}
