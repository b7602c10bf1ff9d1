//! Two-tier key/value cache (§4.B): a `cache_row` table or Redis, selected by
//! `CacheType` in the static config.

mod db;
mod redis;

pub use db::DbKvCache;
pub use redis::RedisKvCache;

use std::time::Duration;

use async_trait::async_trait;
use relay_common::AppResult;
use serde::{Deserialize, Serialize};

/// Cached `nodeinfo` documents, refreshed every hour (§4.D).
pub const NS_NODEINFO: &str = "nodeinfo";
/// Cached remote actor objects, refreshed every six hours (§4.D).
pub const NS_ACTOR: &str = "actor";

/// Default max age for the `nodeinfo` namespace, in seconds.
pub const NODEINFO_MAX_AGE_SECS: i64 = 3600;
/// Default max age for the `actor` namespace, in seconds.
pub const ACTOR_MAX_AGE_SECS: i64 = 6 * 3600;

/// A cached value, carrying an explicit type tag rather than relying on the
/// caller to know how to decode an opaque string (§9 redesign note).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum CacheValue {
    Str(String),
    Int(i64),
    Bool(bool),
    Json(serde_json::Value),
}

impl CacheValue {
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Json(v) => Some(v),
            _ => None,
        }
    }
}

/// Common interface over both cache backends.
#[async_trait]
pub trait KvCache: Send + Sync {
    /// Fetches a value and how long ago it was written, if present and not
    /// past its namespace's max age (lazy TTL eviction, Invariant 5).
    async fn get(&self, namespace: &str, key: &str) -> AppResult<Option<(CacheValue, Duration)>>;

    async fn set(&self, namespace: &str, key: &str, value: CacheValue) -> AppResult<()>;

    async fn del(&self, namespace: &str, key: &str) -> AppResult<()>;

    /// Deletes every key in a namespace. Used when an admin changes a
    /// setting that invalidates a whole cache tier.
    async fn del_ns(&self, namespace: &str) -> AppResult<()>;

    async fn clear_all(&self) -> AppResult<()>;
}

/// Returns the configured max age for a known namespace, or `None` for an
/// unrecognized one (callers should then supply their own).
#[must_use]
pub fn default_max_age(namespace: &str) -> Option<Duration> {
    match namespace {
        NS_NODEINFO => Some(Duration::from_secs(NODEINFO_MAX_AGE_SECS as u64)),
        NS_ACTOR => Some(Duration::from_secs(ACTOR_MAX_AGE_SECS as u64)),
        _ => None,
    }
}
