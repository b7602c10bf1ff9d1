//! Axum handlers for the relay's public `ActivityPub` surface (§6).

pub mod actor;
pub mod inbox;
pub mod nodeinfo;
pub mod webfinger;

use axum::{routing::get, routing::post, Router};

use crate::context::FederationState;

/// Builds the router for the relay's public federation endpoints:
/// `/actor`, `/inbox`, `/.well-known/nodeinfo`, `/nodeinfo/2.0.json`,
/// `/.well-known/webfinger` (§6).
#[must_use]
pub fn router() -> Router<FederationState> {
    Router::new()
        .route("/actor", get(actor::actor_handler))
        .route("/inbox", post(inbox::inbox_handler))
        .route("/.well-known/nodeinfo", get(nodeinfo::nodeinfo_discovery_handler))
        .route("/nodeinfo/2.0.json", get(nodeinfo::nodeinfo_handler))
        .route("/.well-known/webfinger", get(webfinger::webfinger_handler))
}
