//! `/api/v1/user` — admin account CRUD (§6).

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use relay_common::AppResult;
use relay_db::entities::user;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::extractors::AuthUser;
use crate::middleware::AppState;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = 100))]
    pub username: String,

    #[validate(length(min = 8, max = 128))]
    pub password: String,

    pub handle: Option<String>,
}

/// An admin account, without the password hash (Invariant: never echo
/// credential material back to a caller).
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub handle: Option<String>,
    pub created_at: String,
}

impl From<user::Model> for UserResponse {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            handle: model.handle,
            created_at: model.created_at.to_rfc3339(),
        }
    }
}

async fn list_users(_user: AuthUser, State(state): State<AppState>) -> AppResult<Json<Vec<UserResponse>>> {
    let users = state.user_repo.find_all().await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

async fn create_user(
    _caller: AuthUser,
    State(state): State<AppState>,
    Json(req): Json<CreateUserRequest>,
) -> AppResult<Json<UserResponse>> {
    req.validate()?;

    let created = state
        .user_repo
        .create(&req.username, &req.password, req.handle)
        .await?;
    Ok(Json(created.into()))
}

async fn delete_user(_caller: AuthUser, State(state): State<AppState>, Path(id): Path<String>) -> AppResult<()> {
    state.user_repo.delete(&id).await
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/{id}", axum::routing::delete(delete_user))
}
