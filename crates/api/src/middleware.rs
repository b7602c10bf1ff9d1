//! Shared state and bearer-token authentication for the management API (§4.H, §6).

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use relay_common::{AppError, AppResult, LogFilterHandle};
use relay_db::repositories::{
    ConfigKvRepository, DomainBanRepository, InboxRepository, SoftwareBanRepository, TokenRepository,
    UserRepository, WhitelistRepository,
};
use relay_federation::FederationState;

/// Shared state for every management-API handler.
#[derive(Clone)]
pub struct AppState {
    pub inbox_repo: InboxRepository,
    pub domain_ban_repo: DomainBanRepository,
    pub software_ban_repo: SoftwareBanRepository,
    pub whitelist_repo: WhitelistRepository,
    pub config_repo: ConfigKvRepository,
    pub user_repo: UserRepository,
    pub token_repo: TokenRepository,
    pub federation: FederationState,
    /// Live handle to the process's tracing filter, reloaded when an admin
    /// changes the `log-level` config-kv key (§3.1, §6) through this API.
    pub log_filter: LogFilterHandle,
}

/// Authenticates a request by its `Authorization: Bearer <token>` header
/// against the `token` table, rejecting with [`AppError::Unauthorized`]
/// otherwise (§6, Testable Scenario F).
pub async fn auth_middleware(State(state): State<AppState>, mut req: Request, next: Next) -> AppResult<Response> {
    let token_value = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(AppError::Unauthorized)?;

    let token = state
        .token_repo
        .find_by_value(token_value)
        .await?
        .ok_or(AppError::Unauthorized)?;

    let user = state
        .user_repo
        .find_by_id(&token.user_id)
        .await?
        .ok_or(AppError::Unauthorized)?;

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}
