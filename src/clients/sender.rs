use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::{
    error::SendError,
    models::channel::{Channel, ChannelMessage},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendReceipt {
    /// Identifier assigned by the provider (or generated locally when the
    /// provider assigns none).
    pub message_id: String,
}

impl SendReceipt {
    pub fn new(message_id: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
        }
    }
}

/// Delivers one composed message through a channel provider.
///
/// Implementations return by `deadline` at the latest and never retry on
/// their own.
#[async_trait]
pub trait ChannelSender: Send + Sync {
    async fn send(
        &self,
        message: ChannelMessage,
        deadline: Instant,
    ) -> Result<SendReceipt, SendError>;

    fn channel(&self) -> Channel;
}

/// Readiness probe for providers that can check credentials without sending.
#[async_trait]
pub trait ConnectionProbe: Send + Sync {
    async fn test_connection(&self) -> Result<(), SendError>;
}

pub(crate) fn unexpected_shape(expected: Channel, message: &ChannelMessage) -> SendError {
    SendError::Serialization(format!(
        "{} sender cannot deliver a {} message",
        expected,
        message.channel()
    ))
}
