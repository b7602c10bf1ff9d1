//! Domain ban entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A banned domain. Creating one cascades into deleting any subscribed
/// [`super::inbox::Model`] row sharing the same domain (Testable Property 4).
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "domain_ban")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(unique)]
    pub domain: String,

    #[sea_orm(column_type = "Text")]
    pub reason: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub note: Option<String>,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
