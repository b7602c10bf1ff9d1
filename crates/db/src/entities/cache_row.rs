//! DB-backed KV cache row entity (used when `cache_type = database`).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One cached value, keyed by `(namespace, key)`. `updated_at` is compared
/// by the cache layer against a namespace-specific max age; rows past their
/// TTL are treated as absent (lazy eviction, Invariant 5).
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cache_row")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub namespace: String,

    pub cache_key: String,

    #[sea_orm(column_type = "Text")]
    pub value: String,

    /// One of `str`, `int`, `bool`, `json`.
    pub value_type: String,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
