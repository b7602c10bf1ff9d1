//! `ActivityPub` federation: the inbox ingest pipeline, the public actor/
//! nodeinfo/webfinger surface, and the client used both for resolving
//! remote actors and for signed delivery (§4, §6).

pub mod activity;
pub mod actor;
pub mod client;
pub mod context;
pub mod dedup;
pub mod dispatch;
pub mod fanout;
pub mod handlers;
pub mod nodeinfo;

pub use context::{FederationState, RelayKeypair};
pub use dispatch::{activate_pending_follow, initiate_follow};
pub use fanout::{DeliveryRecipient, Fanout, NullFanout};
