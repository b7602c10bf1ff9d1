//! Runtime-mutable admin configuration entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One admin-mutable configuration setting (`name`, `whitelist-enabled`,
/// `schema-version`, `private-key`, ...). The value is stored as text with
/// an explicit type tag so readers can decode without a per-key schema.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "config_kv")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub key: String,

    #[sea_orm(column_type = "Text")]
    pub value: String,

    /// One of `str`, `int`, `bool`, `json`.
    pub value_type: String,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
