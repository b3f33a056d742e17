use std::{sync::Arc, time::Duration};

use anyhow::{Result, anyhow};
use futures_util::StreamExt;
use lapin::{
    Connection, ConnectionProperties,
    options::{BasicAckOptions, BasicConsumeOptions},
    types::FieldTable,
};
use notification_dispatch::{
    clients::{rbmq::RabbitMqClient, sms::SimulatedSmsGateway},
    config::Config,
    dispatcher::NotificationDispatcher,
    emitter::AckEmitter,
    models::{acknowledgment::AcknowledgmentRecord, status::AckStatus},
    worker::ConsumerLoop,
};
use testcontainers::{
    GenericImage, ImageExt,
    core::{ContainerPort, WaitFor},
    runners::AsyncRunner,
};
use tokio::{sync::watch, time::timeout};

use crate::common::{sms_request, to_payload};

/// Test: A request published to the inbound queue comes back as an ack on the
/// ack queue, with the AMQP message id set to the notification id
#[tokio::test]
#[ignore = "needs Docker"]
async fn test_round_trip_through_rabbitmq() -> Result<()> {
    let container = GenericImage::new("rabbitmq", "3.13-alpine")
        .with_exposed_port(ContainerPort::Tcp(5672))
        .with_wait_for(WaitFor::message_on_stdout("Server startup complete"))
        .with_startup_timeout(Duration::from_secs(120))
        .start()
        .await?;

    let host = container.get_host().await?;
    let port = container.get_host_port_ipv4(5672).await?;
    let rabbitmq_url = format!("amqp://guest:guest@{}:{}/%2f", host, port);

    let config = Config::from_vars([
        ("SERVICE_CHANNEL".to_string(), "sms".to_string()),
        ("RABBITMQ_URL".to_string(), rabbitmq_url.clone()),
        ("SMS_SIMULATED_LATENCY_MS".to_string(), "5".to_string()),
    ])?;

    let rabbitmq = Arc::new(RabbitMqClient::connect(&config).await?);
    let consumer = rabbitmq.create_consumer("sms-service-group-test").await?;

    let dispatcher = NotificationDispatcher::new(
        Arc::new(SimulatedSmsGateway::new(config.sms_simulated_latency())),
        config.processing_timeout(),
    );
    let emitter = AckEmitter::new(rabbitmq.clone(), config.ack_publish_timeout());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker = tokio::spawn(ConsumerLoop::new(consumer, dispatcher, emitter).run(shutdown_rx));

    rabbitmq
        .publish_message(
            rabbitmq.notification_queue_name(),
            "rt-1",
            &to_payload(&sms_request("rt-1")),
        )
        .await?;

    let connection = Connection::connect(&rabbitmq_url, ConnectionProperties::default()).await?;
    let channel = connection.create_channel().await?;
    let mut acks = channel
        .basic_consume(
            rabbitmq.ack_queue_name(),
            "ack-reader",
            BasicConsumeOptions::default(),
            FieldTable::default(),
        )
        .await?;

    let delivery = timeout(Duration::from_secs(30), acks.next())
        .await?
        .ok_or_else(|| anyhow!("ack consumer closed"))??;

    let record: AcknowledgmentRecord = serde_json::from_slice(&delivery.data)?;
    assert_eq!(record.notification_id, "rt-1");
    assert_eq!(record.status, AckStatus::Success);
    assert_eq!(
        delivery.properties.message_id().as_ref().map(|id| id.as_str()),
        Some("rt-1")
    );

    channel
        .basic_ack(delivery.delivery_tag, BasicAckOptions::default())
        .await?;

    shutdown_tx.send(true)?;
    let stats = timeout(Duration::from_secs(10), worker).await???;

    assert_eq!(stats.received, 1);
    assert_eq!(stats.succeeded, 1);
    assert_eq!(stats.commit_failures, 0);

    Ok(())
}
