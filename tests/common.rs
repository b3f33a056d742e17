#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use anyhow::{Error, Result, anyhow};
use async_trait::async_trait;
use notification_dispatch::{
    clients::{
        queue::{AckPublisher, Delivery, InboundQueue},
        sender::{ChannelSender, SendReceipt},
    },
    dispatcher::NotificationDispatcher,
    emitter::AckEmitter,
    error::{EmitError, SendError},
    models::{
        acknowledgment::AcknowledgmentRecord,
        channel::{Channel, ChannelMessage},
        message::NotificationRequest,
    },
    worker::{ConsumerLoop, LoopStats},
};
use tokio::{
    sync::{mpsc, watch},
    time::Instant,
};

/// Ordered log of side effects shared by the fakes, so tests can check that
/// an acknowledgment is published before its delivery is committed.
pub type EventLog = Arc<Mutex<Vec<String>>>;

pub fn new_event_log() -> EventLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn events(log: &EventLog) -> Vec<String> {
    log.lock().unwrap().clone()
}

/// Queue backed by an mpsc channel. Closing the sender closes the queue.
pub struct InMemoryQueue {
    receiver: mpsc::UnboundedReceiver<Result<Delivery, String>>,
    events: EventLog,
    fail_commits: bool,
}

pub struct QueueHandle {
    sender: mpsc::UnboundedSender<Result<Delivery, String>>,
    next_tag: u64,
}

impl QueueHandle {
    pub fn push(&mut self, payload: impl Into<Vec<u8>>) -> u64 {
        self.push_delivery(payload, false)
    }

    pub fn push_delivery(&mut self, payload: impl Into<Vec<u8>>, redelivered: bool) -> u64 {
        self.next_tag += 1;
        let _ = self.sender.send(Ok(Delivery {
            delivery_tag: self.next_tag,
            payload: payload.into(),
            redelivered,
        }));
        self.next_tag
    }

    pub fn push_error(&self, message: &str) {
        let _ = self.sender.send(Err(message.to_string()));
    }
}

impl InMemoryQueue {
    pub fn new(events: EventLog) -> (Self, QueueHandle) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            Self {
                receiver,
                events,
                fail_commits: false,
            },
            QueueHandle { sender, next_tag: 0 },
        )
    }

    pub fn failing_commits(mut self) -> Self {
        self.fail_commits = true;
        self
    }
}

#[async_trait]
impl InboundQueue for InMemoryQueue {
    async fn next_delivery(&mut self) -> Result<Option<Delivery>, Error> {
        match self.receiver.recv().await {
            Some(Ok(delivery)) => Ok(Some(delivery)),
            Some(Err(message)) => Err(anyhow!(message)),
            None => Ok(None),
        }
    }

    async fn commit(&mut self, delivery: &Delivery) -> Result<(), Error> {
        if self.fail_commits {
            return Err(anyhow!("commit refused"));
        }

        self.events
            .lock()
            .unwrap()
            .push(format!("commit:{}", delivery.delivery_tag));
        Ok(())
    }
}

/// Keeps every published record. Can be told to fail or to hang.
pub struct RecordingPublisher {
    records: Mutex<Vec<AcknowledgmentRecord>>,
    events: EventLog,
    failure: Option<EmitError>,
    delay: Option<Duration>,
}

impl RecordingPublisher {
    pub fn new(events: EventLog) -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            events,
            failure: None,
            delay: None,
        }
    }

    pub fn failing(events: EventLog) -> Self {
        Self {
            failure: Some(EmitError::Publish("broker unavailable".to_string())),
            ..Self::new(events)
        }
    }

    pub fn hanging(events: EventLog, delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::new(events)
        }
    }

    pub fn records(&self) -> Vec<AcknowledgmentRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl AckPublisher for RecordingPublisher {
    async fn publish(&self, key: &str, record: &AcknowledgmentRecord) -> Result<(), EmitError> {
        assert_eq!(key, record.notification_id);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(failure) = &self.failure {
            return Err(failure.clone());
        }

        self.events
            .lock()
            .unwrap()
            .push(format!("ack:{}:{}", record.notification_id, record.status));
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}

/// Sender that answers every message with the same outcome and remembers
/// what it was given.
pub struct StubSender {
    channel: Channel,
    outcome: Result<String, SendError>,
    calls: AtomicUsize,
    sent: Mutex<Vec<ChannelMessage>>,
    delay: Option<Duration>,
}

impl StubSender {
    pub fn succeeding(channel: Channel) -> Self {
        Self {
            channel,
            outcome: Ok("provider-msg-1".to_string()),
            calls: AtomicUsize::new(0),
            sent: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Takes `delay` to answer each send.
    pub fn slow(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn failing(channel: Channel, error: SendError) -> Self {
        Self {
            outcome: Err(error),
            ..Self::succeeding(channel)
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> Vec<ChannelMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChannelSender for StubSender {
    async fn send(
        &self,
        message: ChannelMessage,
        deadline: Instant,
    ) -> Result<SendReceipt, SendError> {
        assert!(deadline > Instant::now(), "sender was handed an expired deadline");

        self.calls.fetch_add(1, Ordering::SeqCst);
        self.sent.lock().unwrap().push(message);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.outcome.clone().map(SendReceipt::new)
    }

    fn channel(&self) -> Channel {
        self.channel
    }
}

pub fn dispatcher(sender: Arc<StubSender>) -> NotificationDispatcher {
    NotificationDispatcher::new(sender, Duration::from_secs(5))
}

pub fn emitter(publisher: Arc<RecordingPublisher>) -> AckEmitter {
    AckEmitter::new(publisher, Duration::from_secs(1))
}

/// Feeds `payloads` through a consumer loop until the queue runs dry.
pub async fn run_to_completion(
    sender: Arc<StubSender>,
    publisher: Arc<RecordingPublisher>,
    events: EventLog,
    payloads: &[Vec<u8>],
) -> Result<LoopStats> {
    let (queue, mut handle) = InMemoryQueue::new(events);
    for payload in payloads {
        handle.push(payload.clone());
    }
    drop(handle);

    let (_shutdown_tx, shutdown_rx) = watch::channel(false);

    ConsumerLoop::new(queue, dispatcher(sender), emitter(publisher))
        .run(shutdown_rx)
        .await
}

pub fn sms_request(id: &str) -> NotificationRequest {
    NotificationRequest {
        notification_id: id.to_string(),
        message_type: "sms".to_string(),
        to: "(555) 123-4567".to_string(),
        template_body: "Hi {name}, your code is {code}".to_string(),
        params: HashMap::from([
            ("name".to_string(), "Ada".to_string()),
            ("code".to_string(), "9911".to_string()),
        ]),
        ..Default::default()
    }
}

pub fn to_payload(request: &NotificationRequest) -> Vec<u8> {
    serde_json::to_vec(request).unwrap()
}
