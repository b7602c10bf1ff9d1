//! `GET /actor` (§6).

use axum::{extract::State, response::IntoResponse, Json};

use crate::actor::build_actor_document;
use crate::context::FederationState;

pub async fn actor_handler(State(state): State<FederationState>) -> impl IntoResponse {
    Json(build_actor_document(&state.domain, &state.keypair.public_key_pem))
}
