//! Repository over the `token` table: opaque bearer tokens for the management API.

use std::sync::Arc;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::Utc;
use rand::RngCore;
use relay_common::{AppError, AppResult};
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};

use crate::entities::{token, Token};

#[derive(Clone)]
pub struct TokenRepository {
    db: Arc<DatabaseConnection>,
}

impl TokenRepository {
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn find_by_value(&self, value: &str) -> AppResult<Option<token::Model>> {
        Token::find_by_id(value.to_string())
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Mints a fresh token for `user_id` from 32 random bytes.
    pub async fn create(&self, user_id: &str) -> AppResult<token::Model> {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        let value = URL_SAFE_NO_PAD.encode(bytes);

        let model = token::ActiveModel {
            id: Set(value),
            user_id: Set(user_id.to_string()),
            created_at: Set(Utc::now().fixed_offset()),
        };

        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    pub async fn revoke(&self, value: &str) -> AppResult<()> {
        let result = Token::delete_by_id(value.to_string())
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound("token not found".to_string()));
        }
        Ok(())
    }
}
