use std::{sync::Arc, time::Duration};

use tokio::time::Instant;
use tracing::{info, warn};

use crate::{
    clients::sender::{ChannelSender, SendReceipt},
    composer::MessageComposer,
    error::DispatchError,
    models::{channel::Channel, message::NotificationRequest, validation::validate_request},
};

/// Outcome of a successful dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatched {
    pub recipient: String,
    pub receipt: SendReceipt,
}

/// Validate, compose and send one request. Shared by the consumer loop and
/// the synchronous `/send-test` endpoint.
#[derive(Clone)]
pub struct NotificationDispatcher {
    composer: MessageComposer,
    sender: Arc<dyn ChannelSender>,
    processing_timeout: Duration,
}

impl NotificationDispatcher {
    pub fn new(sender: Arc<dyn ChannelSender>, processing_timeout: Duration) -> Self {
        Self {
            composer: MessageComposer::new(sender.channel()),
            sender,
            processing_timeout,
        }
    }

    pub fn channel(&self) -> Channel {
        self.composer.channel()
    }

    pub async fn dispatch(
        &self,
        request: &NotificationRequest,
    ) -> Result<Dispatched, DispatchError> {
        validate_request(request, self.channel())?;

        let message = self.composer.compose(request)?;
        let recipient = message.recipient().to_string();

        let deadline = Instant::now() + self.processing_timeout;

        match self.sender.send(message, deadline).await {
            Ok(receipt) => {
                info!(
                    notification_id = %request.notification_id,
                    channel = %self.channel(),
                    recipient = %recipient,
                    message_id = %receipt.message_id,
                    "Notification sent"
                );
                Ok(Dispatched { recipient, receipt })
            }
            Err(e) => {
                warn!(
                    notification_id = %request.notification_id,
                    channel = %self.channel(),
                    transient = e.is_transient(),
                    error = %e,
                    "Notification send failed"
                );
                Err(e.into())
            }
        }
    }
}
