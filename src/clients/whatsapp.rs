use std::time::Duration;

use anyhow::{Error, Result, anyhow};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tokio::time::{Instant, timeout_at};
use tracing::{debug, info, warn};

use crate::{
    clients::sender::{ChannelSender, SendReceipt, unexpected_shape},
    config::Config,
    error::SendError,
    models::{
        channel::{Channel, ChannelMessage},
        whatsapp::{GraphErrorEnvelope, GraphMessageRequest, GraphMessageResponse},
    },
};

#[derive(Debug, Clone)]
pub struct WhatsAppSettings {
    pub api_base_url: String,
    pub api_version: String,
    pub phone_number_id: String,
    pub access_token: String,
    pub request_timeout: Duration,
}

impl WhatsAppSettings {
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        let access_token = config
            .whatsapp_access_token
            .clone()
            .ok_or_else(|| anyhow!("WHATSAPP_ACCESS_TOKEN is required"))?;

        let phone_number_id = config
            .whatsapp_phone_number_id
            .clone()
            .ok_or_else(|| anyhow!("WHATSAPP_PHONE_NUMBER_ID is required"))?;

        Ok(Self {
            api_base_url: config.whatsapp_api_base_url.clone(),
            api_version: config.whatsapp_api_version.clone(),
            phone_number_id,
            access_token,
            request_timeout: config.processing_timeout(),
        })
    }
}

/// Cloud API client for the WhatsApp Business messages endpoint.
pub struct WhatsAppClient {
    http_client: Client,
    messages_url: String,
    access_token: String,
}

impl WhatsAppClient {
    pub fn new(settings: WhatsAppSettings) -> Result<Self, Error> {
        let http_client = Client::builder()
            .timeout(settings.request_timeout)
            .build()
            .map_err(|_| anyhow!("Failed to create HTTP client"))?;

        let messages_url = format!(
            "{}/{}/{}/messages",
            settings.api_base_url.trim_end_matches('/'),
            settings.api_version,
            settings.phone_number_id
        );

        info!(url = %messages_url, "WhatsApp client initialized");

        Ok(Self {
            http_client,
            messages_url,
            access_token: settings.access_token,
        })
    }

    async fn post_message(&self, request: &GraphMessageRequest) -> Result<SendReceipt, SendError> {
        let response = self
            .http_client
            .post(&self.messages_url)
            .bearer_auth(&self.access_token)
            .json(request)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(classify_transport_error)?;

        if !status.is_success() {
            return Err(classify_rejection(status, &body));
        }

        let parsed: GraphMessageResponse = serde_json::from_str(&body)
            .map_err(|e| SendError::Serialization(format!("failed to parse response: {}", e)))?;

        parsed
            .messages
            .into_iter()
            .next()
            .map(|message| SendReceipt::new(message.id))
            .ok_or_else(|| SendError::RemoteRejected {
                code: i64::from(status.as_u16()),
                message: "no message ID in response".to_string(),
            })
    }
}

#[async_trait]
impl ChannelSender for WhatsAppClient {
    async fn send(
        &self,
        message: ChannelMessage,
        deadline: Instant,
    ) -> Result<SendReceipt, SendError> {
        let message = match message {
            ChannelMessage::WhatsApp(message) => message,
            other => return Err(unexpected_shape(Channel::WhatsApp, &other)),
        };

        let request = GraphMessageRequest::from(&message);

        debug!(to = %request.to, kind = %request.kind, "Sending WhatsApp message");

        let receipt = timeout_at(deadline, self.post_message(&request))
            .await
            .map_err(|_| {
                SendError::Timeout("WhatsApp API did not answer before the deadline".to_string())
            })??;

        info!(message_id = %receipt.message_id, "WhatsApp message accepted");

        Ok(receipt)
    }

    fn channel(&self) -> Channel {
        Channel::WhatsApp
    }
}

fn classify_transport_error(error: reqwest::Error) -> SendError {
    if error.is_timeout() {
        SendError::Timeout(error.to_string())
    } else if error.is_decode() || error.is_builder() {
        SendError::Serialization(error.to_string())
    } else {
        SendError::Network(error.to_string())
    }
}

fn classify_rejection(status: StatusCode, body: &str) -> SendError {
    let detail = serde_json::from_str::<GraphErrorEnvelope>(body).ok();

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        let message = detail
            .map(|envelope| envelope.error.message)
            .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
        return SendError::Auth(message);
    }

    match detail {
        Some(envelope) => SendError::RemoteRejected {
            code: envelope.error.code,
            message: envelope.error.message,
        },
        None => {
            warn!(status = status.as_u16(), "WhatsApp API returned a non-JSON error body");
            SendError::RemoteRejected {
                code: i64::from(status.as_u16()),
                message: body.to_string(),
            }
        }
    }
}
