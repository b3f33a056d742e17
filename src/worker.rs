use std::sync::LazyLock;

use anyhow::{Error, Result};
use regex::Regex;
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::{
    clients::queue::{Delivery, InboundQueue},
    dispatcher::NotificationDispatcher,
    emitter::AckEmitter,
    error::PipelineError,
    models::{
        message::NotificationRequest,
        status::{AckStatus, LoopState},
    },
};

pub const INVALID_JSON_DETAILS: &str = "Invalid JSON payload";

static NOTIFICATION_ID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""notificationId"\s*:\s*"((?:[^"\\]|\\.)*)""#)
        .expect("notification id pattern is valid")
});

/// Counters reported when the loop stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub received: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub malformed: u64,
    pub ack_failures: u64,
    pub commit_failures: u64,
}

/// What happened to one delivery before it was committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Succeeded,
    Failed,
    Malformed,
}

/// Fetch, process and commit, one message at a time, until shut down.
pub struct ConsumerLoop<Q> {
    queue: Q,
    dispatcher: NotificationDispatcher,
    emitter: AckEmitter,
    state: LoopState,
    stats: LoopStats,
}

impl<Q: InboundQueue> ConsumerLoop<Q> {
    pub fn new(queue: Q, dispatcher: NotificationDispatcher, emitter: AckEmitter) -> Self {
        Self {
            queue,
            dispatcher,
            emitter,
            state: LoopState::Idle,
            stats: LoopStats::default(),
        }
    }

    /// Runs until `shutdown` turns true, its sender is dropped, or the queue
    /// fails. A message already taken off the queue is always finished and
    /// committed before the loop exits.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Result<LoopStats, Error> {
        let channel = self.dispatcher.channel();
        info!(channel = %channel, "Consumer loop started");

        loop {
            if *shutdown.borrow() {
                break;
            }

            self.transition(LoopState::Fetching);

            let next = tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
                next = self.queue.next_delivery() => next,
            };

            let delivery = match next {
                Ok(Some(delivery)) => delivery,
                Ok(None) => {
                    info!(channel = %channel, "Inbound queue closed");
                    break;
                }
                Err(e) => {
                    self.transition(LoopState::Stopped);
                    error!(channel = %channel, error = %e, "Consumer loop failed");
                    return Err(e);
                }
            };

            self.stats.received += 1;
            self.transition(LoopState::Processing);

            match process(&self.dispatcher, &self.emitter, &delivery).await {
                Ok(Outcome::Succeeded) => self.stats.succeeded += 1,
                Ok(Outcome::Failed) => self.stats.failed += 1,
                Ok(Outcome::Malformed) => self.stats.malformed += 1,
                Err(e) => {
                    self.stats.ack_failures += 1;
                    error!(
                        delivery_tag = delivery.delivery_tag,
                        error = %e,
                        "Failure was not acknowledged"
                    );
                }
            }

            self.transition(LoopState::Committing);

            if let Err(e) = self.queue.commit(&delivery).await {
                self.stats.commit_failures += 1;
                warn!(delivery_tag = delivery.delivery_tag, error = %e, "Failed to commit message");
            }

            self.transition(LoopState::Idle);
        }

        self.transition(LoopState::Stopped);
        info!(channel = %channel, stats = ?self.stats, "Consumer loop stopped");

        Ok(self.stats)
    }

    fn transition(&mut self, next: LoopState) {
        debug!(from = %self.state, to = %next, "Consumer loop state");
        self.state = next;
    }
}

async fn process(
    dispatcher: &NotificationDispatcher,
    emitter: &AckEmitter,
    delivery: &Delivery,
) -> Result<Outcome, PipelineError> {
    let request: NotificationRequest = match serde_json::from_slice(&delivery.payload) {
        Ok(request) => request,
        Err(e) => {
            let notification_id = extract_notification_id(&delivery.payload);
            warn!(
                notification_id = %notification_id,
                delivery_tag = delivery.delivery_tag,
                error = %e,
                "Malformed message payload"
            );

            report_failure(emitter, &notification_id, INVALID_JSON_DETAILS.to_string()).await?;
            return Ok(Outcome::Malformed);
        }
    };

    info!(
        notification_id = %request.notification_id,
        delivery_tag = delivery.delivery_tag,
        redelivered = delivery.redelivered,
        "Processing notification"
    );

    match dispatcher.dispatch(&request).await {
        Ok(dispatched) => {
            let details = format!(
                "{} message sent successfully (message ID: {})",
                dispatcher.channel(),
                dispatched.receipt.message_id
            );

            // The send already happened; a lost SUCCESS ack is only logged.
            let _ = emitter
                .emit(&request.notification_id, AckStatus::Success, details)
                .await;

            Ok(Outcome::Succeeded)
        }
        Err(e) => {
            report_failure(emitter, &request.notification_id, e.to_string()).await?;
            Ok(Outcome::Failed)
        }
    }
}

async fn report_failure(
    emitter: &AckEmitter,
    notification_id: &str,
    details: String,
) -> Result<(), PipelineError> {
    emitter
        .emit(notification_id, AckStatus::Failure, details.clone())
        .await
        .map(|_| ())
        .map_err(|source| PipelineError::AckNotPublished {
            notification_id: notification_id.to_string(),
            details,
            source,
        })
}

/// Pulls `notificationId` out of a payload that did not decode as a request:
/// first from any JSON object, then from the raw text. Empty when neither
/// finds one.
pub fn extract_notification_id(payload: &[u8]) -> String {
    if let Ok(value) = serde_json::from_slice::<Value>(payload) {
        return value
            .get("notificationId")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
    }

    let text = String::from_utf8_lossy(payload);

    NOTIFICATION_ID_PATTERN
        .captures(&text)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_id_from_valid_json_with_wrong_shape() {
        let payload = br#"{"notificationId":"n-1","params":"not-a-map"}"#;
        assert_eq!(extract_notification_id(payload), "n-1");
    }

    #[test]
    fn extracts_id_from_truncated_json() {
        let payload = br#"{"notificationId": "n-2", "to": "+1555"#;
        assert_eq!(extract_notification_id(payload), "n-2");
    }

    #[test]
    fn non_string_or_missing_id_is_empty() {
        assert_eq!(extract_notification_id(br#"{"notificationId": 42}"#), "");
        assert_eq!(extract_notification_id(b"not json at all"), "");
        assert_eq!(extract_notification_id(b""), "");
    }
}
