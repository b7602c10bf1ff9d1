//! Repository over the `whitelist` table (§3, §4.E).

use std::sync::Arc;

use chrono::Utc;
use relay_common::{AppError, AppResult, IdGenerator};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

use crate::entities::{whitelist, Whitelist};

#[derive(Clone)]
pub struct WhitelistRepository {
    db: Arc<DatabaseConnection>,
    id_gen: IdGenerator,
}

impl WhitelistRepository {
    #[must_use]
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            db,
            id_gen: IdGenerator::new(),
        }
    }

    pub async fn is_whitelisted(&self, domain: &str) -> AppResult<bool> {
        Ok(self.find_by_domain(domain).await?.is_some())
    }

    pub async fn find_by_domain(&self, domain: &str) -> AppResult<Option<whitelist::Model>> {
        Whitelist::find()
            .filter(whitelist::Column::Domain.eq(domain))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    pub async fn find_all(&self) -> AppResult<Vec<whitelist::Model>> {
        Whitelist::find()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    pub async fn add(&self, domain: &str) -> AppResult<whitelist::Model> {
        if let Some(existing) = self.find_by_domain(domain).await? {
            return Ok(existing);
        }
        let model = whitelist::ActiveModel {
            id: Set(self.id_gen.generate()),
            domain: Set(domain.to_string()),
            created_at: Set(Utc::now().fixed_offset()),
        };
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    pub async fn remove(&self, domain: &str) -> AppResult<()> {
        Whitelist::delete_many()
            .filter(whitelist::Column::Domain.eq(domain))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}
