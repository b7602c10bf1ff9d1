//! `GET /.well-known/nodeinfo` and `GET /nodeinfo/2.0.json` (§6).

use axum::{extract::State, response::IntoResponse, Json};
use relay_common::AppResult;

use crate::context::FederationState;
use crate::nodeinfo::{build_nodeinfo_discovery, build_nodeinfo_document};

pub async fn nodeinfo_discovery_handler(State(state): State<FederationState>) -> impl IntoResponse {
    Json(build_nodeinfo_discovery(&state.domain))
}

pub async fn nodeinfo_handler(State(state): State<FederationState>) -> AppResult<impl IntoResponse> {
    let subscribers = state.inbox_repo.find_all().await?;
    let count = subscribers.iter().filter(|row| !row.pending).count() as u64;
    Ok(Json(build_nodeinfo_document(&state.domain, count)))
}
