//! `/api/v1/config` — CRUD over admin-mutable runtime settings (§6).

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use relay_common::logging::directive_for_log_level;
use relay_common::AppResult;
use relay_db::entities::config_kv;
use serde::Deserialize;

use crate::extractors::AuthUser;
use crate::middleware::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetConfigRequest {
    pub value: String,
    #[serde(default = "default_value_type")]
    pub value_type: String,
}

fn default_value_type() -> String {
    "str".to_string()
}

async fn list_config(_user: AuthUser, State(state): State<AppState>) -> AppResult<Json<Vec<config_kv::Model>>> {
    Ok(Json(state.config_repo.find_all().await?))
}

async fn get_config(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> AppResult<Json<Option<config_kv::Model>>> {
    Ok(Json(state.config_repo.get(&key).await?))
}

async fn set_config(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(req): Json<SetConfigRequest>,
) -> AppResult<Json<config_kv::Model>> {
    let row = state.config_repo.set(&key, &req.value, &req.value_type).await?;

    // §3.1: changing `log-level` takes effect immediately rather than on
    // next restart.
    if key == "log-level" {
        state.log_filter.set(directive_for_log_level(&req.value))?;
    }

    Ok(Json(row))
}

async fn delete_config(_user: AuthUser, State(state): State<AppState>, Path(key): Path<String>) -> AppResult<()> {
    state.config_repo.delete(&key).await
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_config))
        .route("/{key}", get(get_config).patch(set_config).put(set_config).delete(delete_config))
}
