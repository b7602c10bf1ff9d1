//! `cache_row`-backed [`crate::KvCache`], used when `cache_type = database`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use relay_common::{AppError, AppResult};
use relay_db::entities::cache_row;
use relay_db::repositories::CacheRowRepository;
use sea_orm::DatabaseConnection;

use crate::{CacheValue, KvCache};

pub struct DbKvCache {
    repo: CacheRowRepository,
}

impl DbKvCache {
    #[must_use]
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            repo: CacheRowRepository::new(db),
        }
    }
}

fn encode(value: &CacheValue) -> AppResult<(String, &'static str)> {
    Ok(match value {
        CacheValue::Str(s) => (s.clone(), "str"),
        CacheValue::Int(i) => (i.to_string(), "int"),
        CacheValue::Bool(b) => (b.to_string(), "bool"),
        CacheValue::Json(v) => (
            serde_json::to_string(v).map_err(|e| AppError::Cache(e.to_string()))?,
            "json",
        ),
    })
}

fn decode(row: &cache_row::Model) -> AppResult<CacheValue> {
    Ok(match row.value_type.as_str() {
        "str" => CacheValue::Str(row.value.clone()),
        "int" => CacheValue::Int(
            row.value
                .parse()
                .map_err(|_| AppError::Cache(format!("corrupt int cache row: {}", row.value)))?,
        ),
        "bool" => CacheValue::Bool(
            row.value
                .parse()
                .map_err(|_| AppError::Cache(format!("corrupt bool cache row: {}", row.value)))?,
        ),
        "json" => CacheValue::Json(
            serde_json::from_str(&row.value).map_err(|e| AppError::Cache(e.to_string()))?,
        ),
        other => return Err(AppError::Cache(format!("unknown cache value type: {other}"))),
    })
}

#[async_trait]
impl KvCache for DbKvCache {
    async fn get(&self, namespace: &str, key: &str) -> AppResult<Option<(CacheValue, Duration)>> {
        let Some(row) = self.repo.get(namespace, key).await? else {
            return Ok(None);
        };
        let age = (Utc::now().fixed_offset() - row.updated_at)
            .to_std()
            .unwrap_or(Duration::ZERO);
        Ok(Some((decode(&row)?, age)))
    }

    async fn set(&self, namespace: &str, key: &str, value: CacheValue) -> AppResult<()> {
        let (encoded, value_type) = encode(&value)?;
        self.repo.set(namespace, key, &encoded, value_type).await?;
        Ok(())
    }

    async fn del(&self, namespace: &str, key: &str) -> AppResult<()> {
        self.repo.delete(namespace, key).await
    }

    async fn del_ns(&self, namespace: &str) -> AppResult<()> {
        self.repo
            .evict_older_than(namespace, Utc::now().fixed_offset())
            .await?;
        Ok(())
    }

    async fn clear_all(&self) -> AppResult<()> {
        for namespace in [crate::NS_NODEINFO, crate::NS_ACTOR] {
            self.del_ns(namespace).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use relay_db::test_utils::in_memory_db;

    #[tokio::test]
    async fn set_then_get_round_trips_typed_value() {
        let db = Arc::new(in_memory_db().await.unwrap());
        let cache = DbKvCache::new(db);

        cache
            .set("actor", "https://example.com/u/a", CacheValue::Int(42))
            .await
            .unwrap();

        let (value, age) = cache.get("actor", "https://example.com/u/a").await.unwrap().unwrap();
        assert_eq!(value, CacheValue::Int(42));
        assert!(age < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn missing_key_returns_none() {
        let db = Arc::new(in_memory_db().await.unwrap());
        let cache = DbKvCache::new(db);
        assert!(cache.get("nodeinfo", "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn set_overwrites_existing_value() {
        let db = Arc::new(in_memory_db().await.unwrap());
        let cache = DbKvCache::new(db);

        cache.set("nodeinfo", "a", CacheValue::Str("old".into())).await.unwrap();
        cache.set("nodeinfo", "a", CacheValue::Str("new".into())).await.unwrap();

        let (value, _) = cache.get("nodeinfo", "a").await.unwrap().unwrap();
        assert_eq!(value, CacheValue::Str("new".to_string()));
    }
}
