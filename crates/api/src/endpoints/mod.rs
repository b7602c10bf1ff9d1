//! Management-API endpoints, one module per resource (§4.H).

mod config;
mod domain_ban;
mod instance;
mod software_ban;
mod token;
mod user;
mod whitelist;

use axum::{middleware, Router};

use crate::middleware::{auth_middleware, AppState};

/// Assembles the `/api/v1/*` router. `POST /token` is unauthenticated; every
/// other route requires a valid bearer token, checked once by
/// [`auth_middleware`] rather than per-handler.
#[must_use]
pub fn router(state: AppState) -> Router {
    let authenticated = Router::new()
        .nest("/config", config::router())
        .nest("/instance", instance::instance_router())
        .nest("/request", instance::request_router())
        .nest("/domain_ban", domain_ban::router())
        .nest("/software_ban", software_ban::router())
        .nest("/whitelist", whitelist::router())
        .nest("/user", user::router())
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .nest("/token", token::router())
        .merge(authenticated)
        .with_state(state)
}
