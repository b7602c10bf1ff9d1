//! Static, file-backed relay configuration.
//!
//! Loaded once at startup from a YAML file plus `RELAY__`-prefixed
//! environment overrides. Runtime-mutable settings (instance name, note,
//! whitelist toggle, log level, ...) live in the database `config_kv` table
//! instead — see `relay_db::repositories::ConfigRepository`.

use serde::Deserialize;
use std::path::Path;

/// Top-level relay configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Domain this relay is reachable at (used to build actor/inbox IRIs).
    pub domain: String,
    /// Address to listen on.
    #[serde(default = "default_listen")]
    pub listen: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Number of delivery worker tasks. 0 selects the available parallelism.
    #[serde(default)]
    pub workers: usize,
    /// Which SQL backend to use.
    #[serde(default = "default_database_type")]
    pub database_type: DatabaseType,
    /// Path to the sqlite database file, used when `database_type = sqlite`.
    #[serde(default = "default_sqlite_path")]
    pub sqlite_path: String,
    /// `PostgreSQL` connection settings, used when `database_type = postgres`.
    #[serde(default)]
    pub pg: Option<PostgresConfig>,
    /// Which cache backend to use.
    #[serde(default = "default_cache_type")]
    pub cache_type: CacheType,
    /// Redis connection settings, used when `cache_type = redis`.
    #[serde(default)]
    pub redis: Option<RedisConfig>,
}

/// SQL backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    /// Single-file SQLite database, suitable for small relays.
    Sqlite,
    /// `PostgreSQL`, suitable for larger deployments.
    Postgres,
}

/// Cache backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheType {
    /// Cache rows stored in the same SQL database as everything else.
    Database,
    /// Cache values stored in Redis.
    Redis,
}

/// `PostgreSQL` connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PostgresConfig {
    /// Host name.
    pub host: String,
    /// Port.
    #[serde(default = "default_pg_port")]
    pub port: u16,
    /// Database name.
    pub name: String,
    /// Username.
    pub user: String,
    /// Password.
    pub pass: String,
    /// Maximum pool size. If unset, the supervisor derives it from `workers`.
    #[serde(default)]
    pub max_connections: Option<u32>,
}

impl PostgresConfig {
    /// Builds a `postgres://` connection URL from the structured fields.
    #[must_use]
    pub fn connection_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.user, self.pass, self.host, self.port, self.name
        )
    }
}

/// Redis connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    /// Host name.
    pub host: String,
    /// Port.
    #[serde(default = "default_redis_port")]
    pub port: u16,
    /// Username, if the Redis instance requires authentication.
    #[serde(default)]
    pub user: Option<String>,
    /// Password, if the Redis instance requires authentication.
    #[serde(default)]
    pub pass: Option<String>,
    /// Logical database index.
    #[serde(default)]
    pub database: u8,
    /// Key prefix for all relay keys stored in Redis. Must not contain `:`.
    #[serde(default = "default_redis_prefix")]
    pub prefix: String,
}

impl RedisConfig {
    /// Builds a `redis://` connection URL from the structured fields.
    #[must_use]
    pub fn connection_url(&self) -> String {
        let auth = match (&self.user, &self.pass) {
            (Some(user), Some(pass)) => format!("{user}:{pass}@"),
            (None, Some(pass)) => format!(":{pass}@"),
            _ => String::new(),
        };
        format!("redis://{auth}{}:{}/{}", self.host, self.port, self.database)
    }
}

fn default_listen() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    8080
}

const fn default_pg_port() -> u16 {
    5432
}

const fn default_redis_port() -> u16 {
    6379
}

const fn default_database_type() -> DatabaseType {
    DatabaseType::Sqlite
}

fn default_sqlite_path() -> String {
    "relay.db".to_string()
}

const fn default_cache_type() -> CacheType {
    CacheType::Database
}

fn default_redis_prefix() -> String {
    "relay".to_string()
}

impl Config {
    /// Loads configuration from `config/relay.yaml` (or the file named by
    /// `RELAY_CONFIG`) layered with `RELAY__`-prefixed environment variables.
    pub fn load() -> Result<Self, config::ConfigError> {
        let path = std::env::var("RELAY_CONFIG").unwrap_or_else(|_| "config/relay.yaml".to_string());

        let config = config::Config::builder()
            .add_source(
                config::File::new(&path, config::FileFormat::Yaml).required(false),
            )
            .add_source(
                config::Environment::with_prefix("RELAY")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Loads configuration from a specific YAML file, ignoring `RELAY_CONFIG`.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::new(
                path.as_ref().to_string_lossy().as_ref(),
                config::FileFormat::Yaml,
            ))
            .add_source(
                config::Environment::with_prefix("RELAY")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Number of worker tasks to spawn, resolving the `0 = auto` sentinel.
    #[must_use]
    pub fn resolved_workers(&self) -> usize {
        if self.workers == 0 {
            std::thread::available_parallelism().map_or(4, std::num::NonZeroUsize::get)
        } else {
            self.workers
        }
    }
}
