//! The seam between ingest and the fan-out engine (§4.G).
//!
//! `relay-federation` decides *what* needs rebroadcasting and *to whom*;
//! `relay-queue` decides *when* (worker pool, retries, backoff). This trait
//! is the boundary, implemented by `relay-queue::FanoutQueue` — keeping the
//! dependency one-directional (queue depends on federation, not vice versa).

use async_trait::async_trait;
use relay_common::AppResult;
use serde_json::Value;

/// A subscribed instance eligible to receive a rebroadcast.
#[derive(Debug, Clone)]
pub struct DeliveryRecipient {
    pub domain: String,
    pub inbox: String,
}

/// Accepts a signed activity plus its recipient set for asynchronous,
/// backpressured delivery.
#[async_trait]
pub trait Fanout: Send + Sync {
    /// Enqueues `activity` for delivery to every recipient.
    ///
    /// # Errors
    /// Returns [`relay_common::AppError::Backpressure`] if the queue is
    /// saturated and stays so for the hard 30s wait (§4.G, §5).
    async fn enqueue(&self, activity: Value, recipients: Vec<DeliveryRecipient>) -> AppResult<()>;
}

/// A [`Fanout`] that drops everything, for tests that don't care about
/// delivery.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullFanout;

#[async_trait]
impl Fanout for NullFanout {
    async fn enqueue(&self, _activity: Value, _recipients: Vec<DeliveryRecipient>) -> AppResult<()> {
        Ok(())
    }
}
