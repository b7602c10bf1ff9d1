//! Repository over the `user` table: admin accounts for the management API.

use std::sync::Arc;

use chrono::Utc;
use relay_common::{hash_password, AppError, AppResult, IdGenerator};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

use crate::entities::{user, User};

#[derive(Clone)]
pub struct UserRepository {
    db: Arc<DatabaseConnection>,
    id_gen: IdGenerator,
}

impl UserRepository {
    #[must_use]
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            db,
            id_gen: IdGenerator::new(),
        }
    }

    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<user::Model>> {
        User::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    pub async fn find_by_username(&self, username: &str) -> AppResult<Option<user::Model>> {
        User::find()
            .filter(user::Column::Username.eq(username))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    pub async fn get_by_username(&self, username: &str) -> AppResult<user::Model> {
        self.find_by_username(username)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user '{username}' not found")))
    }

    pub async fn find_all(&self) -> AppResult<Vec<user::Model>> {
        User::find()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Creates an admin account, hashing `password` with argon2.
    pub async fn create(
        &self,
        username: &str,
        password: &str,
        handle: Option<String>,
    ) -> AppResult<user::Model> {
        if self.find_by_username(username).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "user '{username}' already exists"
            )));
        }

        let hash = hash_password(password)?;
        let model = user::ActiveModel {
            id: Set(self.id_gen.generate()),
            username: Set(username.to_string()),
            hash: Set(hash),
            handle: Set(handle),
            created_at: Set(Utc::now().fixed_offset()),
        };

        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Deletes a user. Owned tokens cascade-delete via the FK (Invariant 4).
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        let result = User::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound(format!("user '{id}' not found")));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn sample(id: &str, username: &str) -> user::Model {
        user::Model {
            id: id.to_string(),
            username: username.to_string(),
            hash: "argon2-hash".to_string(),
            handle: None,
            created_at: Utc::now().fixed_offset(),
        }
    }

    #[tokio::test]
    async fn find_by_username_returns_existing_row() {
        let row = sample("u1", "admin");
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Sqlite)
                .append_query_results([[row.clone()]])
                .into_connection(),
        );

        let repo = UserRepository::new(db);
        let found = repo.find_by_username("admin").await.unwrap();
        assert_eq!(found.unwrap().id, "u1");
    }

    #[tokio::test]
    async fn get_by_username_errors_when_missing() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Sqlite)
                .append_query_results([Vec::<user::Model>::new()])
                .into_connection(),
        );

        let repo = UserRepository::new(db);
        let result = repo.get_by_username("ghost").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
