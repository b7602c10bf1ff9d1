//! ActivityRelay server entry point.
//!
//! Loads configuration, then hands off to the supervisor (§4.I) for the
//! rest of the process lifecycle. CLI subcommands (`setup`, `convert`,
//! `user`, `inbox`, `ban`, ...) are out of scope for this binary (§1) — it
//! only implements `run`.

mod supervisor;

use relay_common::{Config, LogFilterHandle};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("relay=info,tower_http=info"));
    let (filter_layer, reload_handle) = tracing_subscriber::reload::Layer::new(env_filter);

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let log_filter = LogFilterHandle::new(reload_handle);

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "failed to load configuration");
            std::process::exit(1);
        }
    };

    if let Err(e) = supervisor::run(config, log_filter).await {
        tracing::error!(error = %e, "relay exited with error");
        std::process::exit(2);
    }
}
