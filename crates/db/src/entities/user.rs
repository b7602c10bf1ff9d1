//! Management-API user entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// An admin account authenticated against the management API.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(unique)]
    pub username: String,

    /// Argon2-encoded password hash (salt and cost parameter inline).
    pub hash: String,

    /// Optional `ActivityPub` handle for the account, e.g. `@admin@example.com`.
    #[sea_orm(nullable)]
    pub handle: Option<String>,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::token::Entity")]
    Tokens,
}

impl Related<super::token::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tokens.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
