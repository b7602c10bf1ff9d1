//! Process supervisor (§4.I): loads config, opens the store, runs
//! migrations, starts the cache and fan-out engine, binds the HTTP
//! listener, and drains everything in order on shutdown.
//!
//! This is the one place in the relay that is allowed to hold every
//! collaborator at once; everything downstream gets an explicit context
//! (`FederationState`, `AppState`) rather than reaching back up into this
//! module (§9 design note: no process-wide application object).

use std::sync::Arc;
use std::time::Duration;

use fred::clients::Client as RedisClient;
use fred::interfaces::ClientLike;
use relay_api::AppState;
use relay_cache::{DbKvCache, KvCache, RedisKvCache};
use relay_common::config::CacheType;
use relay_common::crypto::parse_private_key;
use relay_common::logging::directive_for_log_level;
use relay_common::{generate_rsa_keypair, AppError, AppResult, Config, LogFilterHandle};
use relay_db::repositories::{
    ConfigKvRepository, DomainBanRepository, InboxRepository, SoftwareBanRepository, TokenRepository, UserRepository,
    WhitelistRepository,
};
use relay_federation::client::ApClient;
use relay_federation::dedup::DedupRing;
use relay_federation::{FederationState, RelayKeypair};
use relay_queue::FanoutQueue;
use rsa::pkcs8::{EncodePublicKey, LineEnding};
use rsa::RsaPublicKey;
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// How long the listener waits for in-flight handlers to finish once
/// shutdown begins (§4.I, §5).
const DRAIN_DEADLINE: Duration = Duration::from_secs(20);

/// Runs the relay until a shutdown signal arrives, then drains in order.
///
/// # Errors
/// Returns an error for any unrecoverable startup failure (bad config, DB
/// unreachable, listener bind failure) — callers should exit(2) per §6.
pub async fn run(config: Config, log_filter: LogFilterHandle) -> AppResult<()> {
    info!(domain = %config.domain, "starting relay");

    let db = Arc::new(relay_db::init(&config).await?);
    info!("connected to database");

    relay_db::migrate(&db).await?;
    info!("migrations complete");

    let inbox_repo = InboxRepository::new(db.clone());
    let domain_ban_repo = DomainBanRepository::new(db.clone());
    let software_ban_repo = SoftwareBanRepository::new(db.clone());
    let whitelist_repo = WhitelistRepository::new(db.clone());
    let config_repo = ConfigKvRepository::new(db.clone());
    let user_repo = UserRepository::new(db.clone());
    let token_repo = TokenRepository::new(db.clone());

    if let Some(row) = config_repo.get("log-level").await? {
        if let Err(e) = log_filter.set(directive_for_log_level(&row.value)) {
            warn!(error = %e, level = %row.value, "failed to apply stored log-level");
        }
    }

    let cache = build_cache(&config, db.clone()).await?;
    info!(backend = ?config.cache_type, "cache ready");

    let keypair = bootstrap_keypair(&config_repo, &config.domain).await?;
    info!(key_id = %keypair.key_id, "relay signing key ready");

    let client = ApClient::new(&config.domain, cache.clone());

    let worker_cancellation = CancellationToken::new();
    let fanout = FanoutQueue::spawn(
        config.resolved_workers(),
        client.clone(),
        keypair.clone(),
        inbox_repo.clone(),
        worker_cancellation.clone(),
    );
    info!(workers = config.resolved_workers(), "fan-out engine started");

    tokio::spawn(relay_queue::run_failure_sweep(
        inbox_repo.clone(),
        worker_cancellation.clone(),
    ));

    let federation = FederationState {
        domain: config.domain.clone(),
        keypair,
        inbox_repo: inbox_repo.clone(),
        domain_ban_repo: domain_ban_repo.clone(),
        software_ban_repo: software_ban_repo.clone(),
        whitelist_repo: whitelist_repo.clone(),
        config_repo: config_repo.clone(),
        cache,
        client,
        dedup: Arc::new(DedupRing::new()),
        fanout: Arc::new(fanout),
    };

    let app_state = AppState {
        inbox_repo,
        domain_ban_repo,
        software_ban_repo,
        whitelist_repo,
        config_repo,
        user_repo,
        token_repo,
        federation: federation.clone(),
        log_filter,
    };

    let app = build_router(federation, app_state);

    let addr = format!("{}:{}", config.listen, config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::Config(format!("failed to bind {addr}: {e}")))?;
    info!(%addr, "listening");

    let listener_shutdown = CancellationToken::new();
    let serve_token = listener_shutdown.clone();
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(serve_token.cancelled_owned())
            .await
    });

    wait_for_shutdown_signal().await;
    info!("shutdown signal received, draining in-flight requests");
    listener_shutdown.cancel();

    match tokio::time::timeout(DRAIN_DEADLINE, server).await {
        Ok(Ok(Ok(()))) => info!("http listener drained cleanly"),
        Ok(Ok(Err(e))) => error!(error = %e, "http listener exited with error"),
        Ok(Err(e)) => error!(error = %e, "http listener task panicked"),
        Err(_) => warn!("drain deadline exceeded, forcing shutdown"),
    }

    info!("signalling delivery workers to finish in-flight deliveries");
    worker_cancellation.cancel();

    info!("relay shut down");
    Ok(())
}

fn build_router(federation: FederationState, app_state: AppState) -> axum::Router {
    use tower_http::trace::TraceLayer;

    let federation_router = relay_federation::handlers::router().with_state(federation);
    let api_router = relay_api::router(app_state);

    axum::Router::new()
        .merge(federation_router)
        .nest("/api/v1", api_router)
        .layer(TraceLayer::new_for_http())
}

async fn build_cache(config: &Config, db: Arc<sea_orm::DatabaseConnection>) -> AppResult<Arc<dyn KvCache>> {
    match config.cache_type {
        CacheType::Database => Ok(Arc::new(DbKvCache::new(db))),
        CacheType::Redis => {
            let redis_config = config
                .redis
                .as_ref()
                .ok_or_else(|| AppError::Config("cache_type=redis requires [redis]".to_string()))?;
            if redis_config.prefix.contains(':') {
                return Err(AppError::Config("redis.prefix must not contain ':'".to_string()));
            }

            let fred_config = fred::types::config::Config::from_url(&redis_config.connection_url())
                .map_err(|e| AppError::Config(format!("invalid redis url: {e}")))?;
            let client = RedisClient::new(fred_config, None, None, None);
            client.connect();
            client
                .wait_for_connect()
                .await
                .map_err(|e| AppError::Config(format!("failed to connect to redis: {e}")))?;

            Ok(Arc::new(RedisKvCache::new(Arc::new(client), redis_config.prefix.clone())))
        }
    }
}

/// Loads the relay's RSA keypair from `config_kv`, generating and
/// persisting one on first start (§4.C, §6 `private-key`).
async fn bootstrap_keypair(config_repo: &ConfigKvRepository, domain: &str) -> AppResult<RelayKeypair> {
    if let Some(row) = config_repo.get("private-key").await? {
        let private_key = parse_private_key(&row.value)?;
        let public_key_pem = public_key_pem(&private_key)?;
        let key_id = config_repo
            .get("private-key-id")
            .await?
            .map(|row| row.value)
            .unwrap_or_else(|| default_key_id(domain));
        return Ok(RelayKeypair {
            private_key: Arc::new(private_key),
            public_key_pem,
            key_id,
        });
    }

    info!("no signing key in config_kv, generating one");
    let generated = generate_rsa_keypair()?;
    let key_id = default_key_id(domain);
    config_repo.set("private-key", &generated.private_key_pem, "str").await?;
    config_repo.set("private-key-id", &key_id, "str").await?;

    let private_key = parse_private_key(&generated.private_key_pem)?;
    Ok(RelayKeypair {
        private_key: Arc::new(private_key),
        public_key_pem: generated.public_key_pem,
        key_id,
    })
}

fn default_key_id(domain: &str) -> String {
    format!("https://{domain}/actor#main-key")
}

fn public_key_pem(private_key: &rsa::RsaPrivateKey) -> AppResult<String> {
    RsaPublicKey::from(private_key)
        .to_public_key_pem(LineEnding::LF)
        .map_err(|e| AppError::Internal(format!("failed to encode public key: {e}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use relay_db::test_utils::in_memory_db;

    #[tokio::test]
    async fn bootstrap_keypair_generates_once_then_reuses_stored_key() {
        let db = Arc::new(in_memory_db().await.unwrap());
        let config_repo = ConfigKvRepository::new(db);

        let first = bootstrap_keypair(&config_repo, "relay.example").await.unwrap();
        assert_eq!(first.key_id, "https://relay.example/actor#main-key");
        assert!(config_repo.get("private-key").await.unwrap().is_some());

        let second = bootstrap_keypair(&config_repo, "relay.example").await.unwrap();
        assert_eq!(first.public_key_pem, second.public_key_pem);
        assert_eq!(first.key_id, second.key_id);
    }
}

async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => warn!(error = %e, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received SIGINT"),
        () = terminate => info!("received SIGTERM"),
    }
}
