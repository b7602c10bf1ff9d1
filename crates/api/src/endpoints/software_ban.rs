//! `/api/v1/software_ban` — banned-nodeinfo-software CRUD (§3, §4.E).

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use relay_common::AppResult;
use relay_db::entities::software_ban;
use serde::Deserialize;

use crate::extractors::AuthUser;
use crate::middleware::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BanSoftwareRequest {
    pub name: String,
    pub reason: String,
    pub note: Option<String>,
}

async fn list_bans(_user: AuthUser, State(state): State<AppState>) -> AppResult<Json<Vec<software_ban::Model>>> {
    Ok(Json(state.software_ban_repo.find_all().await?))
}

/// Bans a nodeinfo software name. `name == "relays"` is the magic token that
/// expands at evaluation time to every entry in
/// [`relay_policy::WELL_KNOWN_RELAYS`], rather than being stored per-name.
async fn ban_software(
    _user: AuthUser,
    State(state): State<AppState>,
    Json(req): Json<BanSoftwareRequest>,
) -> AppResult<Json<software_ban::Model>> {
    Ok(Json(
        state
            .software_ban_repo
            .ban(&req.name, &req.reason, req.note)
            .await?,
    ))
}

async fn unban_software(_user: AuthUser, State(state): State<AppState>, Path(name): Path<String>) -> AppResult<()> {
    state.software_ban_repo.unban(&name).await
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_bans).post(ban_software))
        .route("/{name}", axum::routing::delete(unban_software))
}
