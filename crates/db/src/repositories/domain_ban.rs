//! Repository over the `domain_ban` table.
//!
//! Creating a ban transactionally deletes the matching [`crate::entities::inbox`]
//! row and any `whitelist` row for the same domain (Testable Property 4).

use std::sync::Arc;

use chrono::Utc;
use relay_common::{AppError, AppResult, IdGenerator};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};

use crate::entities::{domain_ban, inbox, whitelist, DomainBan, Inbox, Whitelist};

#[derive(Clone)]
pub struct DomainBanRepository {
    db: Arc<DatabaseConnection>,
    id_gen: IdGenerator,
}

impl DomainBanRepository {
    #[must_use]
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            db,
            id_gen: IdGenerator::new(),
        }
    }

    pub async fn find_by_domain(&self, domain: &str) -> AppResult<Option<domain_ban::Model>> {
        DomainBan::find()
            .filter(domain_ban::Column::Domain.eq(domain))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    pub async fn is_banned(&self, domain: &str) -> AppResult<bool> {
        Ok(self.find_by_domain(domain).await?.is_some())
    }

    pub async fn find_all(&self) -> AppResult<Vec<domain_ban::Model>> {
        DomainBan::find()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Bans `domain`, cascading into deletion of any subscribed inbox and
    /// whitelist entry for that domain within a single transaction.
    pub async fn ban(
        &self,
        domain: &str,
        reason: &str,
        note: Option<String>,
    ) -> AppResult<domain_ban::Model> {
        if let Some(existing) = self.find_by_domain(domain).await? {
            return Ok(existing);
        }

        let id = self.id_gen.generate();
        let domain = domain.to_string();
        let reason = reason.to_string();
        let created_at = Utc::now().fixed_offset();

        self.db
            .transaction::<_, domain_ban::Model, sea_orm::DbErr>(move |txn| {
                Box::pin(async move {
                    let model = domain_ban::ActiveModel {
                        id: Set(id),
                        domain: Set(domain.clone()),
                        reason: Set(reason),
                        note: Set(note),
                        created_at: Set(created_at),
                    };
                    let inserted = model.insert(txn).await?;

                    Inbox::delete_many()
                        .filter(inbox::Column::Domain.eq(domain.clone()))
                        .exec(txn)
                        .await?;

                    Whitelist::delete_many()
                        .filter(whitelist::Column::Domain.eq(domain))
                        .exec(txn)
                        .await?;

                    Ok(inserted)
                })
            })
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    pub async fn unban(&self, domain: &str) -> AppResult<()> {
        DomainBan::delete_many()
            .filter(domain_ban::Column::Domain.eq(domain))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}
