//! Repository over the `software_ban` table.

use std::sync::Arc;

use chrono::Utc;
use relay_common::{AppError, AppResult, IdGenerator};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

use crate::entities::{software_ban, SoftwareBan};

#[derive(Clone)]
pub struct SoftwareBanRepository {
    db: Arc<DatabaseConnection>,
    id_gen: IdGenerator,
}

impl SoftwareBanRepository {
    #[must_use]
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            db,
            id_gen: IdGenerator::new(),
        }
    }

    /// Looks up a ban by software name, case-insensitively (§3: names are
    /// stored lowercased, so `"Mastodon"` and `"mastodon"` must resolve to
    /// the same row).
    pub async fn find_by_name(&self, name: &str) -> AppResult<Option<software_ban::Model>> {
        SoftwareBan::find()
            .filter(software_ban::Column::Name.eq(name.to_lowercase()))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    pub async fn is_banned(&self, name: &str) -> AppResult<bool> {
        Ok(self.find_by_name(name).await?.is_some())
    }

    pub async fn find_all(&self) -> AppResult<Vec<software_ban::Model>> {
        SoftwareBan::find()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    pub async fn ban(
        &self,
        name: &str,
        reason: &str,
        note: Option<String>,
    ) -> AppResult<software_ban::Model> {
        if let Some(existing) = self.find_by_name(name).await? {
            return Ok(existing);
        }
        let model = software_ban::ActiveModel {
            id: Set(self.id_gen.generate()),
            name: Set(name.to_lowercase()),
            reason: Set(reason.to_string()),
            note: Set(note),
            created_at: Set(Utc::now().fixed_offset()),
        };
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    pub async fn unban(&self, name: &str) -> AppResult<()> {
        SoftwareBan::delete_many()
            .filter(software_ban::Column::Name.eq(name.to_lowercase()))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}
