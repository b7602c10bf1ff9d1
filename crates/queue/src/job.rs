//! A single `(activity, recipient)` delivery unit (§4.G).
//!
//! The wire spec describes a delivery job as `(activity_json, recipients[],
//! attempt, next_due)`, but "each worker takes ONE `(job, recipient)` pair at
//! a time" — so the queue is flattened to one task per recipient up front;
//! each recipient then retries independently of its siblings.

use std::sync::Arc;

use relay_federation::DeliveryRecipient;
use serde_json::Value;

/// One pending delivery: a signed activity addressed to a single inbox.
#[derive(Debug, Clone)]
pub struct DeliveryTask {
    pub activity: Arc<Value>,
    pub recipient: DeliveryRecipient,
    /// Zero on first attempt; incremented on each transient-failure retry.
    pub attempt: u32,
}
