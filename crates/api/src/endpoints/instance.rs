//! `/api/v1/instance` — subscribed-instance CRUD, and `/api/v1/request` —
//! pending-Follow approval (§4.H).

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use relay_common::{AppError, AppResult};
use relay_db::entities::inbox;
use serde::Deserialize;

use crate::extractors::AuthUser;
use crate::middleware::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInstanceRequest {
    /// IRI of the remote actor to subscribe, e.g. `https://a.example/actor`.
    pub actor: String,
}

/// Initiates a subscription toward a remote instance: resolves its actor
/// document and enqueues the relay's own `Follow` (§4.H: "`POST /v1/instance`
/// enqueues a Follow"). The `inbox` row itself is created once the remote
/// instance's `Accept` arrives back through the ingest pipeline.
async fn create_instance(
    _user: AuthUser,
    State(state): State<AppState>,
    Json(req): Json<CreateInstanceRequest>,
) -> AppResult<()> {
    let remote_actor = state
        .federation
        .client
        .get_actor(&req.actor)
        .await
        .map_err(|e| AppError::BadRequest(format!("could not resolve actor {}: {e}", req.actor)))?;

    let domain = remote_actor
        .domain()
        .map_err(|e| AppError::BadRequest(format!("actor id is not a valid url: {e}")))?;

    relay_federation::initiate_follow(&state.federation, &domain, &req.actor, &remote_actor.inbox).await
}

async fn list_instances(_user: AuthUser, State(state): State<AppState>) -> AppResult<Json<Vec<inbox::Model>>> {
    Ok(Json(state.inbox_repo.find_all().await?))
}

async fn get_instance(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(domain): Path<String>,
) -> AppResult<Json<Option<inbox::Model>>> {
    Ok(Json(state.inbox_repo.find_by_domain(&domain).await?))
}

async fn delete_instance(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(domain): Path<String>,
) -> AppResult<()> {
    state.inbox_repo.del_by_domain(&domain).await
}

async fn list_pending_requests(
    _user: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<inbox::Model>>> {
    Ok(Json(state.inbox_repo.find_pending().await?))
}

/// Admin acceptance of a pending Follow (§4.F subscriber state machine:
/// `PendingApproval` → `Subscribed`). Flips `pending` off, then completes
/// the handshake the immediate-activation path would have taken: `Accept`
/// of the stored Follow plus a reciprocal `Follow`, both enqueued to the
/// subscriber's inbox.
async fn approve_request(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(domain): Path<String>,
) -> AppResult<Json<inbox::Model>> {
    let row = state.inbox_repo.approve(&domain).await?;
    relay_federation::activate_pending_follow(&state.federation, &row.domain, &row.actor, &row.followid, &row.inbox).await?;
    Ok(Json(row))
}

pub fn instance_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_instances).post(create_instance))
        .route("/{domain}", get(get_instance).delete(delete_instance))
}

pub fn request_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_pending_requests))
        .route("/{domain}", post(approve_request))
}
