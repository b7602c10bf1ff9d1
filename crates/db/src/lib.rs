//! Database layer for the relay: entities, migrations, and repositories.

pub mod entities;
pub mod migrations;
pub mod repositories;
pub mod test_utils;

use std::time::Duration;

use relay_common::{AppError, Config};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use tracing::log::LevelFilter;

use relay_common::config::DatabaseType;

/// Connects to the configured SQL backend, sizing the pool from `workers`
/// (§5: pool size is `2 * worker count`, minimum 1).
pub async fn init(config: &Config) -> Result<DatabaseConnection, AppError> {
    let url = match config.database_type {
        DatabaseType::Sqlite => format!("sqlite://{}?mode=rwc", config.sqlite_path),
        DatabaseType::Postgres => config
            .pg
            .as_ref()
            .ok_or_else(|| AppError::Config("database_type=postgres requires [pg]".to_string()))?
            .connection_url(),
    };

    let max_connections = config
        .pg
        .as_ref()
        .and_then(|pg| pg.max_connections)
        .unwrap_or_else(|| (config.resolved_workers() as u32 * 2).max(1));

    let mut opt = ConnectOptions::new(url);
    opt.max_connections(max_connections)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(10))
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .sqlx_logging(true)
        .sqlx_logging_level(LevelFilter::Debug);

    Database::connect(opt)
        .await
        .map_err(|e| AppError::Database(e.to_string()))
}

/// Runs pending migrations. Idempotent: already-applied migrations are skipped.
pub async fn migrate(db: &DatabaseConnection) -> Result<(), AppError> {
    use sea_orm_migration::MigratorTrait;
    migrations::Migrator::up(db, None)
        .await
        .map_err(|e| AppError::Database(e.to_string()))
}
