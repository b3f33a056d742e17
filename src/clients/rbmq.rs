use anyhow::{Error, Result, anyhow};
use async_trait::async_trait;
use futures_util::StreamExt;
use lapin::{
    BasicProperties, Channel, Connection, ConnectionProperties, Consumer,
    options::{
        BasicAckOptions, BasicConsumeOptions, BasicPublishOptions, BasicQosOptions,
        QueueDeclareOptions,
    },
    types::{FieldTable, ShortString},
};
use tracing::{debug, info};

use crate::{
    clients::queue::{AckPublisher, Delivery, InboundQueue},
    config::Config,
    error::EmitError,
    models::acknowledgment::AcknowledgmentRecord,
};

pub struct RabbitMqClient {
    _connection: Connection,
    channel: Channel,
    notification_queue_name: String,
    ack_queue_name: String,
}

impl RabbitMqClient {
    pub async fn connect(config: &Config) -> Result<Self, Error> {
        info!("Connecting to RabbitMQ...");

        let connection = Connection::connect(&config.rabbitmq_url, ConnectionProperties::default())
            .await
            .map_err(|e| anyhow!("Failed to connect to RabbitMQ: {}", e))?;

        let channel = connection
            .create_channel()
            .await
            .map_err(|e| anyhow!("RabbitMQ channel creation failed: {}", e))?;

        channel
            .basic_qos(config.prefetch_count, BasicQosOptions::default())
            .await
            .map_err(|e| anyhow!("Failed to set up QoS: {}", e))?;

        let notification_queue_name = config.notification_queue_name();
        let ack_queue_name = config.ack_queue_name();

        for queue in [&notification_queue_name, &ack_queue_name] {
            channel
                .queue_declare(
                    queue,
                    QueueDeclareOptions {
                        durable: true,
                        ..Default::default()
                    },
                    FieldTable::default(),
                )
                .await
                .map_err(|e| anyhow!("Failed to declare queue {}: {}", queue, e))?;
        }

        info!(
            notification_queue = %notification_queue_name,
            ack_queue = %ack_queue_name,
            prefetch_count = config.prefetch_count,
            "RabbitMQ channel ready"
        );

        Ok(Self {
            _connection: connection,
            channel,
            notification_queue_name,
            ack_queue_name,
        })
    }

    pub fn notification_queue_name(&self) -> &str {
        &self.notification_queue_name
    }

    pub fn ack_queue_name(&self) -> &str {
        &self.ack_queue_name
    }

    /// Joins the competing consumers of the notification queue.
    pub async fn create_consumer(&self, consumer_tag: &str) -> Result<RabbitMqConsumer, Error> {
        let consumer = self
            .channel
            .basic_consume(
                &self.notification_queue_name,
                consumer_tag,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|e| anyhow!("Failed to create consumer: {}", e))?;

        info!(consumer_tag, queue = %self.notification_queue_name, "Consumer created for queue");

        Ok(RabbitMqConsumer {
            channel: self.channel.clone(),
            consumer,
        })
    }

    pub async fn publish_message(
        &self,
        queue: &str,
        key: &str,
        payload: &[u8],
    ) -> Result<(), Error> {
        self.channel
            .basic_publish(
                "",
                queue,
                BasicPublishOptions::default(),
                payload,
                BasicProperties::default()
                    .with_delivery_mode(2)
                    .with_content_type(ShortString::from("application/json".to_string()))
                    .with_message_id(ShortString::from(key.to_string()))
                    .with_correlation_id(ShortString::from(key.to_string())),
            )
            .await
            .map_err(|e| anyhow!("Failed to publish message to {}: {}", queue, e))?;

        Ok(())
    }
}

#[async_trait]
impl AckPublisher for RabbitMqClient {
    async fn publish(&self, key: &str, record: &AcknowledgmentRecord) -> Result<(), EmitError> {
        let payload =
            serde_json::to_vec(record).map_err(|e| EmitError::Serialization(e.to_string()))?;

        self.publish_message(&self.ack_queue_name, key, &payload)
            .await
            .map_err(|e| EmitError::Publish(e.to_string()))?;

        debug!(notification_id = %key, status = %record.status, "Acknowledgment published");

        Ok(())
    }
}

pub struct RabbitMqConsumer {
    channel: Channel,
    consumer: Consumer,
}

#[async_trait]
impl InboundQueue for RabbitMqConsumer {
    async fn next_delivery(&mut self) -> Result<Option<Delivery>, Error> {
        match self.consumer.next().await {
            Some(Ok(delivery)) => Ok(Some(Delivery {
                delivery_tag: delivery.delivery_tag,
                payload: delivery.data,
                redelivered: delivery.redelivered,
            })),
            Some(Err(e)) => Err(anyhow!("RabbitMQ consumer failed: {}", e)),
            None => Err(anyhow!("RabbitMQ consumer stream ended")),
        }
    }

    async fn commit(&mut self, delivery: &Delivery) -> Result<(), Error> {
        self.channel
            .basic_ack(delivery.delivery_tag, BasicAckOptions::default())
            .await
            .map_err(|e| anyhow!("Failed to acknowledge message: {}", e))?;

        Ok(())
    }
}
