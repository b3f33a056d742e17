use anyhow::{Error, Result};
use async_trait::async_trait;

use crate::{error::EmitError, models::acknowledgment::AcknowledgmentRecord};

/// One message taken from the inbound queue, not yet committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub delivery_tag: u64,
    pub payload: Vec<u8>,
    pub redelivered: bool,
}

/// Source of notification requests.
#[async_trait]
pub trait InboundQueue: Send {
    /// Waits for the next delivery. Must be cancel-safe: dropping the future
    /// before it resolves loses no message. `Ok(None)` means the source is
    /// closed and nothing more will arrive.
    async fn next_delivery(&mut self) -> Result<Option<Delivery>, Error>;

    /// Marks the delivery consumed so it is not handed out again.
    async fn commit(&mut self, delivery: &Delivery) -> Result<(), Error>;
}

/// Sink for acknowledgment records. `key` groups records of the same
/// notification where the transport supports it.
#[async_trait]
pub trait AckPublisher: Send + Sync {
    async fn publish(&self, key: &str, record: &AcknowledgmentRecord) -> Result<(), EmitError>;
}
