//! `GET /.well-known/webfinger` (§6).

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::context::FederationState;
use crate::nodeinfo::build_webfinger_document;

#[derive(Debug, Deserialize)]
pub struct WebfingerQuery {
    resource: String,
}

pub async fn webfinger_handler(State(state): State<FederationState>, Query(query): Query<WebfingerQuery>) -> Response {
    let expected = format!("acct:relay@{}", state.domain);
    if query.resource != expected {
        return (StatusCode::NOT_FOUND, Json(json!({"error": "unknown resource"}))).into_response();
    }
    Json(build_webfinger_document(&state.domain)).into_response()
}
