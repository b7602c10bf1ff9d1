//! Repository over the `config_kv` table: admin-mutable runtime settings (§6).

use std::sync::Arc;

use chrono::Utc;
use relay_common::{AppError, AppResult};
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};

use crate::entities::{config_kv, ConfigKv};

#[derive(Clone)]
pub struct ConfigKvRepository {
    db: Arc<DatabaseConnection>,
}

impl ConfigKvRepository {
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn get(&self, key: &str) -> AppResult<Option<config_kv::Model>> {
        ConfigKv::find_by_id(key)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    pub async fn find_all(&self) -> AppResult<Vec<config_kv::Model>> {
        ConfigKv::find()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Upserts a key. `value_type` is one of `str`, `int`, `bool`, `json`.
    pub async fn set(
        &self,
        key: &str,
        value: &str,
        value_type: &str,
    ) -> AppResult<config_kv::Model> {
        let model = config_kv::ActiveModel {
            key: Set(key.to_string()),
            value: Set(value.to_string()),
            value_type: Set(value_type.to_string()),
            updated_at: Set(Utc::now().fixed_offset()),
        };

        match self.get(key).await? {
            Some(_) => model
                .update(self.db.as_ref())
                .await
                .map_err(|e| AppError::Database(e.to_string())),
            None => model
                .insert(self.db.as_ref())
                .await
                .map_err(|e| AppError::Database(e.to_string())),
        }
    }

    pub async fn delete(&self, key: &str) -> AppResult<()> {
        ConfigKv::delete_by_id(key)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}
