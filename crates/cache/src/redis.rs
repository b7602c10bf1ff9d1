//! Redis-backed [`crate::KvCache`], used when `cache_type = redis`.
//!
//! Grounded in the teacher's `federation::cache::RemoteActorCache`, which
//! used `fred` with a `{prefix}:...` key scheme and native `EXPIRE`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fred::clients::Client as RedisClient;
use fred::interfaces::KeysInterface;
use fred::types::Expiration;
use relay_common::{AppError, AppResult};

use crate::{CacheValue, KvCache};

pub struct RedisKvCache {
    client: Arc<RedisClient>,
    prefix: String,
}

impl RedisKvCache {
    #[must_use]
    pub fn new(client: Arc<RedisClient>, prefix: impl Into<String>) -> Self {
        Self {
            client,
            prefix: prefix.into(),
        }
    }

    fn key(&self, namespace: &str, key: &str) -> String {
        format!("{}:{namespace}:{key}", self.prefix)
    }

    fn ns_pattern(&self, namespace: &str) -> String {
        format!("{}:{namespace}:*", self.prefix)
    }
}

#[derive(serde::Serialize, serde::Deserialize)]
struct Envelope {
    value: CacheValue,
    written_at: chrono::DateTime<chrono::Utc>,
}

#[async_trait]
impl KvCache for RedisKvCache {
    async fn get(&self, namespace: &str, key: &str) -> AppResult<Option<(CacheValue, Duration)>> {
        let raw: Option<String> = self
            .client
            .get(self.key(namespace, key))
            .await
            .map_err(|e| AppError::Cache(e.to_string()))?;

        let Some(raw) = raw else {
            return Ok(None);
        };
        let envelope: Envelope =
            serde_json::from_str(&raw).map_err(|e| AppError::Cache(e.to_string()))?;
        let age = (chrono::Utc::now() - envelope.written_at)
            .to_std()
            .unwrap_or(Duration::ZERO);
        Ok(Some((envelope.value, age)))
    }

    async fn set(&self, namespace: &str, key: &str, value: CacheValue) -> AppResult<()> {
        let max_age = crate::default_max_age(namespace).unwrap_or(Duration::from_secs(3600));
        let envelope = Envelope {
            value,
            written_at: chrono::Utc::now(),
        };
        let raw = serde_json::to_string(&envelope).map_err(|e| AppError::Cache(e.to_string()))?;

        self.client
            .set::<(), _, _>(
                self.key(namespace, key),
                raw,
                Some(Expiration::EX(max_age.as_secs() as i64)),
                None,
                false,
            )
            .await
            .map_err(|e| AppError::Cache(e.to_string()))
    }

    async fn del(&self, namespace: &str, key: &str) -> AppResult<()> {
        self.client
            .del::<(), _>(self.key(namespace, key))
            .await
            .map_err(|e| AppError::Cache(e.to_string()))
    }

    async fn del_ns(&self, namespace: &str) -> AppResult<()> {
        let keys: Vec<String> = self
            .client
            .keys(self.ns_pattern(namespace))
            .await
            .map_err(|e| AppError::Cache(e.to_string()))?;
        if keys.is_empty() {
            return Ok(());
        }
        self.client
            .del::<(), _>(keys)
            .await
            .map_err(|e| AppError::Cache(e.to_string()))
    }

    async fn clear_all(&self) -> AppResult<()> {
        for namespace in [crate::NS_NODEINFO, crate::NS_ACTOR] {
            self.del_ns(namespace).await?;
        }
        Ok(())
    }
}
