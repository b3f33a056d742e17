use std::{sync::Arc, time::Duration};

use tokio::time::timeout;
use tracing::{debug, warn};

use crate::{
    clients::queue::AckPublisher,
    error::EmitError,
    models::{acknowledgment::AcknowledgmentRecord, status::AckStatus},
};

/// Stamps and publishes acknowledgment records, keyed by notification id.
#[derive(Clone)]
pub struct AckEmitter {
    publisher: Arc<dyn AckPublisher>,
    timeout: Duration,
}

impl AckEmitter {
    pub fn new(publisher: Arc<dyn AckPublisher>, timeout: Duration) -> Self {
        Self { publisher, timeout }
    }

    pub async fn emit(
        &self,
        notification_id: &str,
        status: AckStatus,
        details: impl Into<String>,
    ) -> Result<AcknowledgmentRecord, EmitError> {
        let record = AcknowledgmentRecord::new(notification_id.to_string(), status, details.into());

        match timeout(self.timeout, self.publisher.publish(notification_id, &record)).await {
            Ok(Ok(())) => {
                debug!(notification_id, status = %status, "Acknowledgment emitted");
                Ok(record)
            }
            Ok(Err(e)) => {
                warn!(
                    notification_id,
                    status = %status,
                    error = %e,
                    "Failed to emit acknowledgment"
                );
                Err(e)
            }
            Err(_) => {
                let e = EmitError::Timeout(self.timeout.as_millis());
                warn!(
                    notification_id,
                    status = %status,
                    error = %e,
                    "Failed to emit acknowledgment"
                );
                Err(e)
            }
        }
    }
}
