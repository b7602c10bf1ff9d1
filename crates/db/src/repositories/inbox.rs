//! Repository over the `inbox` table: subscribed instances (§3, §4.A).

use std::sync::Arc;

use chrono::Utc;
use relay_common::{AppError, AppResult, IdGenerator};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter, Set,
};

use crate::entities::{inbox, Inbox};

/// How long an inbox may fail continuous delivery before the sweep removes it (§4.G).
pub const FAILURE_EVICTION: chrono::Duration = chrono::Duration::days(7);

#[derive(Clone)]
pub struct InboxRepository {
    db: Arc<DatabaseConnection>,
    id_gen: IdGenerator,
}

impl InboxRepository {
    #[must_use]
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            db,
            id_gen: IdGenerator::new(),
        }
    }

    /// Looks up a row by domain, actor IRI, or inbox IRI — whichever the
    /// caller has on hand (§4.A `get_inbox(needle)`).
    pub async fn find_by_any(&self, needle: &str) -> AppResult<Option<inbox::Model>> {
        Inbox::find()
            .filter(
                Condition::any()
                    .add(inbox::Column::Domain.eq(needle))
                    .add(inbox::Column::Actor.eq(needle))
                    .add(inbox::Column::Inbox.eq(needle)),
            )
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    pub async fn find_by_domain(&self, domain: &str) -> AppResult<Option<inbox::Model>> {
        Inbox::find()
            .filter(inbox::Column::Domain.eq(domain))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    pub async fn find_by_followid(&self, followid: &str) -> AppResult<Option<inbox::Model>> {
        Inbox::find()
            .filter(inbox::Column::Followid.eq(followid))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Creates a row if the domain is unseen, or refreshes `actor`/`inbox`/
    /// `followid` on an existing one (Testable Property 3: re-Follow updates
    /// `followid` rather than duplicating the row).
    pub async fn put_inbox(
        &self,
        domain: &str,
        actor: &str,
        inbox_url: &str,
        followid: &str,
        software: Option<String>,
        pending: bool,
    ) -> AppResult<inbox::Model> {
        let now = Utc::now().fixed_offset();

        if let Some(existing) = self.find_by_domain(domain).await? {
            let model = inbox::ActiveModel {
                id: Set(existing.id),
                actor: Set(actor.to_string()),
                inbox: Set(inbox_url.to_string()),
                followid: Set(followid.to_string()),
                software: Set(software),
                pending: Set(pending),
                failed: Set(false),
                failing_since: Set(None),
                updated_at: Set(Some(now)),
                ..Default::default()
            };
            return model
                .update(self.db.as_ref())
                .await
                .map_err(|e| AppError::Database(e.to_string()));
        }

        let model = inbox::ActiveModel {
            id: Set(self.id_gen.generate()),
            domain: Set(domain.to_string()),
            actor: Set(actor.to_string()),
            inbox: Set(inbox_url.to_string()),
            followid: Set(followid.to_string()),
            software: Set(software),
            pending: Set(pending),
            failed: Set(false),
            failing_since: Set(None),
            created_at: Set(now),
            updated_at: Set(None),
        };

        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    pub async fn del_by_domain(&self, domain: &str) -> AppResult<()> {
        Inbox::delete_many()
            .filter(inbox::Column::Domain.eq(domain))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    pub async fn del_by_followid(&self, followid: &str) -> AppResult<()> {
        Inbox::delete_many()
            .filter(inbox::Column::Followid.eq(followid))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Admin approval: clears `pending` for a domain awaiting a decision.
    pub async fn approve(&self, domain: &str) -> AppResult<inbox::Model> {
        let existing = self
            .find_by_domain(domain)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("no pending request for {domain}")))?;

        let model = inbox::ActiveModel {
            id: Set(existing.id),
            pending: Set(false),
            updated_at: Set(Some(Utc::now().fixed_offset())),
            ..Default::default()
        };
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    pub async fn find_pending(&self) -> AppResult<Vec<inbox::Model>> {
        Inbox::find()
            .filter(inbox::Column::Pending.eq(true))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    pub async fn find_all(&self) -> AppResult<Vec<inbox::Model>> {
        Inbox::find()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Subscribed, non-pending inboxes eligible to receive a rebroadcast,
    /// excluding the domain the activity originated from (§4.G).
    pub async fn find_recipients(&self, exclude_domain: &str) -> AppResult<Vec<inbox::Model>> {
        Ok(Inbox::find()
            .filter(inbox::Column::Pending.eq(false))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .into_iter()
            .filter(|row| row.domain != exclude_domain)
            .collect())
    }

    /// Records a failed delivery attempt, starting the failure clock if this
    /// is the first consecutive failure.
    pub async fn mark_failed(&self, domain: &str) -> AppResult<()> {
        let Some(existing) = self.find_by_domain(domain).await? else {
            return Ok(());
        };
        let failing_since = existing.failing_since.or(Some(Utc::now().fixed_offset()));
        let model = inbox::ActiveModel {
            id: Set(existing.id),
            failed: Set(true),
            failing_since: Set(failing_since),
            updated_at: Set(Some(Utc::now().fixed_offset())),
            ..Default::default()
        };
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    pub async fn clear_failure(&self, domain: &str) -> AppResult<()> {
        let Some(existing) = self.find_by_domain(domain).await? else {
            return Ok(());
        };
        if !existing.failed && existing.failing_since.is_none() {
            return Ok(());
        }
        let model = inbox::ActiveModel {
            id: Set(existing.id),
            failed: Set(false),
            failing_since: Set(None),
            updated_at: Set(Some(Utc::now().fixed_offset())),
            ..Default::default()
        };
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Removes inboxes that have been failing continuously for longer than
    /// [`FAILURE_EVICTION`]. Returns the domains removed.
    pub async fn sweep_expired_failures(&self) -> AppResult<Vec<String>> {
        let cutoff = Utc::now().fixed_offset() - FAILURE_EVICTION;
        let candidates = Inbox::find()
            .filter(inbox::Column::Failed.eq(true))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let mut removed = Vec::new();
        for row in candidates {
            if row.failing_since.is_some_and(|since| since < cutoff) {
                self.del_by_domain(&row.domain).await?;
                removed.push(row.domain);
            }
        }
        Ok(removed)
    }
}
