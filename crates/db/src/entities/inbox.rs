//! Subscribed instance entity — one row per federated follower of the relay.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A subscribing instance: a domain that has `Follow`ed the relay actor.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inbox")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// DNS name of the subscribing instance. Natural key (Invariant 1).
    #[sea_orm(unique)]
    pub domain: String,

    /// IRI of the actor that sent the Follow.
    pub actor: String,

    /// IRI to deliver activities to. Must be non-null before fan-out
    /// selects this row (Invariant 3).
    pub inbox: String,

    /// IRI of the Follow activity, used to match a later Undo.
    pub followid: String,

    /// Short software name from nodeinfo, lowercased, nullable until fetched.
    #[sea_orm(nullable)]
    pub software: Option<String>,

    /// True while awaiting admin approval (`approval-required=true`).
    #[sea_orm(default_value = false)]
    pub pending: bool,

    /// True once delivery has failed continuously; candidate for sweep
    /// removal after 7 days (§4.G).
    #[sea_orm(default_value = false)]
    pub failed: bool,

    /// Timestamp of the first continuous failure, cleared on success.
    #[sea_orm(nullable)]
    pub failing_since: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
