//! Repository over the `cache_row` table: DB-backed KV cache storage (§4.B).
//!
//! TTL is enforced by the caller (`relay-cache`), which compares `updated_at`
//! against a namespace-specific max age — a stale row reads as absent
//! (Invariant 5, lazy eviction).

use std::sync::Arc;

use chrono::Utc;
use relay_common::{AppError, AppResult, IdGenerator};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter, Set,
};

use crate::entities::{cache_row, CacheRow};

#[derive(Clone)]
pub struct CacheRowRepository {
    db: Arc<DatabaseConnection>,
    id_gen: IdGenerator,
}

impl CacheRowRepository {
    #[must_use]
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            db,
            id_gen: IdGenerator::new(),
        }
    }

    pub async fn get(&self, namespace: &str, key: &str) -> AppResult<Option<cache_row::Model>> {
        CacheRow::find()
            .filter(
                Condition::all()
                    .add(cache_row::Column::Namespace.eq(namespace))
                    .add(cache_row::Column::CacheKey.eq(key)),
            )
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    pub async fn set(
        &self,
        namespace: &str,
        key: &str,
        value: &str,
        value_type: &str,
    ) -> AppResult<cache_row::Model> {
        let now = Utc::now().fixed_offset();

        if let Some(existing) = self.get(namespace, key).await? {
            let model = cache_row::ActiveModel {
                id: Set(existing.id),
                value: Set(value.to_string()),
                value_type: Set(value_type.to_string()),
                updated_at: Set(now),
                ..Default::default()
            };
            return model
                .update(self.db.as_ref())
                .await
                .map_err(|e| AppError::Database(e.to_string()));
        }

        let model = cache_row::ActiveModel {
            id: Set(self.id_gen.generate()),
            namespace: Set(namespace.to_string()),
            cache_key: Set(key.to_string()),
            value: Set(value.to_string()),
            value_type: Set(value_type.to_string()),
            updated_at: Set(now),
        };
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    pub async fn delete(&self, namespace: &str, key: &str) -> AppResult<()> {
        CacheRow::delete_many()
            .filter(
                Condition::all()
                    .add(cache_row::Column::Namespace.eq(namespace))
                    .add(cache_row::Column::CacheKey.eq(key)),
            )
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Deletes every row whose `updated_at` is older than `cutoff`, scoped to
    /// `namespace`. Used by the periodic sweep mentioned in Invariant 5.
    pub async fn evict_older_than(
        &self,
        namespace: &str,
        cutoff: chrono::DateTime<chrono::FixedOffset>,
    ) -> AppResult<u64> {
        let result = CacheRow::delete_many()
            .filter(
                Condition::all()
                    .add(cache_row::Column::Namespace.eq(namespace))
                    .add(cache_row::Column::UpdatedAt.lt(cutoff)),
            )
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected)
    }
}
