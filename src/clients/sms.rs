use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{Instant, sleep, timeout_at};
use tracing::info;
use uuid::Uuid;

use crate::{
    clients::sender::{ChannelSender, SendReceipt, unexpected_shape},
    error::SendError,
    models::channel::{Channel, ChannelMessage},
};

/// Stand-in for an SMS provider: logs the message and reports success after
/// a fixed latency.
pub struct SimulatedSmsGateway {
    latency: Duration,
}

impl SimulatedSmsGateway {
    pub fn new(latency: Duration) -> Self {
        info!(latency_ms = latency.as_millis() as u64, "Simulated SMS gateway initialized");
        Self { latency }
    }
}

#[async_trait]
impl ChannelSender for SimulatedSmsGateway {
    async fn send(
        &self,
        message: ChannelMessage,
        deadline: Instant,
    ) -> Result<SendReceipt, SendError> {
        let message = match message {
            ChannelMessage::Sms(message) => message,
            other => return Err(unexpected_shape(Channel::Sms, &other)),
        };

        timeout_at(deadline, sleep(self.latency))
            .await
            .map_err(|_| {
                SendError::Timeout("SMS gateway did not answer before the deadline".to_string())
            })?;

        let message_id = Uuid::new_v4().to_string();

        info!(
            to = %message.to,
            body = %message.body,
            message_id = %message_id,
            "SMS sent (simulated)"
        );

        Ok(SendReceipt::new(message_id))
    }

    fn channel(&self) -> Channel {
        Channel::Sms
    }
}
