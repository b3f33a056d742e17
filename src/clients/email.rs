use std::{sync::Arc, time::Duration};

use anyhow::{Error, Result, anyhow};
use async_trait::async_trait;
use chrono::Utc;
use lettre::{
    Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{
        Mailbox,
        header::{ContentType, HeaderName, HeaderValue},
    },
    transport::smtp::authentication::Credentials,
};
use tokio::time::{Instant, timeout, timeout_at};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    clients::sender::{ChannelSender, ConnectionProbe, SendReceipt, unexpected_shape},
    config::Config,
    error::SendError,
    models::channel::{Channel, ChannelMessage, EmailMessage},
    utils::{format_email_address, sanitize_subject},
};

const IMPLICIT_TLS_PORT: u16 = 465;

#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_email: String,
    pub from_name: String,
    pub timeout: Duration,
}

impl SmtpSettings {
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        let required = |value: &Option<String>, key: &str| {
            value
                .clone()
                .filter(|v| !v.is_empty())
                .ok_or_else(|| anyhow!("{} is required", key))
        };

        Ok(Self {
            host: config.email_smtp_host.clone(),
            port: config.email_smtp_port,
            username: required(&config.email_smtp_user, "EMAIL_SMTP_USER")?,
            password: required(&config.email_smtp_password, "EMAIL_SMTP_PASSWORD")?,
            from_email: required(&config.email_sender, "EMAIL_SENDER")?,
            from_name: config.email_from_name.clone(),
            timeout: config.processing_timeout(),
        })
    }
}

/// SMTP sender. Each send runs on its own task so a slow server can never
/// hold the caller past its deadline.
pub struct SmtpClient {
    transport: Arc<AsyncSmtpTransport<Tokio1Executor>>,
    from: Mailbox,
    sender_domain: String,
    timeout: Duration,
}

impl SmtpClient {
    pub fn new(settings: SmtpSettings) -> Result<Self, Error> {
        let builder = if settings.port == IMPLICIT_TLS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)
        }
        .map_err(|e| anyhow!("Failed to configure SMTP transport: {}", e))?;

        let transport = builder
            .port(settings.port)
            .credentials(Credentials::new(settings.username, settings.password))
            .timeout(Some(settings.timeout))
            .build();

        let address: Address = settings
            .from_email
            .parse()
            .map_err(|e| anyhow!("EMAIL_SENDER is not a valid address: {}", e))?;

        let from_name = (!settings.from_name.is_empty()).then_some(settings.from_name);

        info!(
            host = %settings.host,
            port = settings.port,
            sender = %format_email_address(
                &settings.from_email,
                from_name.as_deref().unwrap_or_default()
            ),
            "SMTP client initialized"
        );

        Ok(Self {
            transport: Arc::new(transport),
            sender_domain: address.domain().to_string(),
            from: Mailbox::new(from_name, address),
            timeout: settings.timeout,
        })
    }

    /// Builds the RFC 5322 message and its `Message-ID`.
    pub fn build_email(&self, message: &EmailMessage) -> Result<(Message, String), SendError> {
        let to: Mailbox = message
            .to
            .parse()
            .map_err(|e| SendError::Serialization(format!("invalid recipient address: {}", e)))?;

        let message_id = format!(
            "<{}.{}@{}>",
            Utc::now().timestamp(),
            Uuid::new_v4().simple(),
            self.sender_domain
        );

        let mut builder = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(sanitize_subject(&message.subject))
            .message_id(Some(message_id.clone()))
            .date_now()
            .header(ContentType::TEXT_PLAIN);

        for (name, value) in &message.headers {
            match HeaderName::new_from_ascii(name.clone()) {
                Ok(header_name) => {
                    builder = builder.raw_header(HeaderValue::new(header_name, value.clone()));
                }
                Err(_) => {
                    warn!(header = %name, "Skipping custom email header with an invalid name");
                }
            }
        }

        let email = builder
            .body(message.body.clone())
            .map_err(|e| SendError::Serialization(format!("failed to build email: {}", e)))?;

        Ok((email, message_id))
    }
}

#[async_trait]
impl ChannelSender for SmtpClient {
    async fn send(
        &self,
        message: ChannelMessage,
        deadline: Instant,
    ) -> Result<SendReceipt, SendError> {
        let message = match message {
            ChannelMessage::Email(message) => message,
            other => return Err(unexpected_shape(Channel::Email, &other)),
        };

        let (email, message_id) = self.build_email(&message)?;

        debug!(to = %message.to, message_id = %message_id, "Sending email");

        let transport = Arc::clone(&self.transport);
        let task = tokio::spawn(async move { transport.send(email).await });

        // Losing the race only stops the wait. The spawned send keeps going and
        // its result is dropped.
        match timeout_at(deadline, task).await {
            Err(_) => Err(SendError::Timeout(
                "SMTP server did not answer before the deadline".to_string(),
            )),
            Ok(Err(join_error)) => Err(SendError::Network(format!(
                "SMTP send task failed: {}",
                join_error
            ))),
            Ok(Ok(Err(smtp_error))) => Err(classify_smtp_error(smtp_error)),
            Ok(Ok(Ok(_response))) => {
                info!(to = %message.to, message_id = %message_id, "Email sent");
                Ok(SendReceipt::new(message_id))
            }
        }
    }

    fn channel(&self) -> Channel {
        Channel::Email
    }
}

#[async_trait]
impl ConnectionProbe for SmtpClient {
    async fn test_connection(&self) -> Result<(), SendError> {
        let connected = timeout(self.timeout, self.transport.test_connection())
            .await
            .map_err(|_| SendError::Timeout("SMTP connection test timed out".to_string()))?
            .map_err(classify_smtp_error)?;

        if connected {
            Ok(())
        } else {
            Err(SendError::Network(
                "failed to connect to SMTP server".to_string(),
            ))
        }
    }
}

fn classify_smtp_error(error: lettre::transport::smtp::Error) -> SendError {
    if error.is_timeout() {
        return SendError::Timeout(error.to_string());
    }

    match error.status() {
        Some(code) => {
            let code = code.to_string().parse::<i64>().unwrap_or_default();
            if matches!(code, 530 | 534 | 535) {
                SendError::Auth(error.to_string())
            } else {
                SendError::RemoteRejected {
                    code,
                    message: error.to_string(),
                }
            }
        }
        None => SendError::Network(error.to_string()),
    }
}
