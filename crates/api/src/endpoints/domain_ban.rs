//! `/api/v1/domain_ban` — banned-domain CRUD (§6, Testable Property 4).

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use relay_common::AppResult;
use relay_db::entities::domain_ban;
use serde::Deserialize;

use crate::extractors::AuthUser;
use crate::middleware::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BanDomainRequest {
    pub domain: String,
    pub reason: String,
    pub note: Option<String>,
}

async fn list_bans(_user: AuthUser, State(state): State<AppState>) -> AppResult<Json<Vec<domain_ban::Model>>> {
    Ok(Json(state.domain_ban_repo.find_all().await?))
}

/// Bans a domain, cascading into removal of its subscriber row and any
/// whitelist entry in the same transaction (Testable Property 4).
async fn ban_domain(
    _user: AuthUser,
    State(state): State<AppState>,
    Json(req): Json<BanDomainRequest>,
) -> AppResult<Json<domain_ban::Model>> {
    Ok(Json(
        state
            .domain_ban_repo
            .ban(&req.domain, &req.reason, req.note)
            .await?,
    ))
}

async fn unban_domain(_user: AuthUser, State(state): State<AppState>, Path(domain): Path<String>) -> AppResult<()> {
    state.domain_ban_repo.unban(&domain).await
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_bans).post(ban_domain))
        .route("/{domain}", axum::routing::delete(unban_domain))
}
