use std::collections::BTreeMap;

use tracing::debug;

use crate::{
    error::{ComposeError, ValidationError},
    models::{
        channel::{
            Channel, ChannelMessage, EmailMessage, SmsMessage, WhatsAppContent, WhatsAppMessage,
        },
        message::{MediaKind, NotificationRequest},
    },
    utils::{
        clean_phone_number, find_missing_parameters, is_valid_email, is_valid_phone_number,
        language_code, render_template,
    },
};

pub const PRIORITY_HEADER: &str = "X-Priority";
pub const NOTIFICATION_ID_HEADER: &str = "X-Notification-ID";

/// Turns a validated request into the message shape of one channel.
#[derive(Debug, Clone, Copy)]
pub struct MessageComposer {
    channel: Channel,
}

impl MessageComposer {
    pub fn new(channel: Channel) -> Self {
        Self { channel }
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn compose(&self, request: &NotificationRequest) -> Result<ChannelMessage, ComposeError> {
        let missing = find_missing_parameters(&request.template_body, &request.params);
        if !missing.is_empty() {
            debug!(
                notification_id = %request.notification_id,
                missing = ?missing,
                "Template body references parameters that were not supplied"
            );
        }

        match self.channel {
            Channel::WhatsApp => compose_whatsapp(request).map(ChannelMessage::WhatsApp),
            Channel::Email => compose_email(request).map(ChannelMessage::Email),
            Channel::Sms => compose_sms(request).map(ChannelMessage::Sms),
        }
    }
}

fn normalize_phone(to: &str) -> Result<String, ComposeError> {
    let cleaned = clean_phone_number(to);

    if is_valid_phone_number(&cleaned) {
        Ok(cleaned)
    } else {
        Err(ComposeError::InvalidPhoneNumber(to.to_string()))
    }
}

/// Media wins over a named template, which wins over plain text.
pub fn compose_whatsapp(request: &NotificationRequest) -> Result<WhatsAppMessage, ComposeError> {
    let to = normalize_phone(&request.to)?;

    let content = if let Some(link) = request.media_url() {
        let kind = request.media_type.unwrap_or(MediaKind::Image);
        let filename = match kind {
            MediaKind::Document => request.params.get("filename").cloned(),
            _ => None,
        };

        WhatsAppContent::Media {
            kind,
            link: link.to_string(),
            caption: render_template(&request.template_body, &request.params),
            filename,
        }
    } else if let Some(name) = request.template_name() {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::InvalidTemplate.into());
        }

        let ordered: BTreeMap<&String, &String> = request.params.iter().collect();

        WhatsAppContent::Template {
            name: name.to_string(),
            language: language_code(&request.locale),
            parameters: ordered.into_values().cloned().collect(),
        }
    } else {
        let body = render_template(&request.template_body, &request.params);
        if body.is_empty() {
            return Err(ValidationError::MissingContent.into());
        }

        WhatsAppContent::Text { body }
    };

    Ok(WhatsAppMessage { to, content })
}

pub fn compose_email(request: &NotificationRequest) -> Result<EmailMessage, ComposeError> {
    if !is_valid_email(&request.to) {
        return Err(ComposeError::InvalidEmailAddress(request.to.clone()));
    }

    let subject = render_template(request.channel_config.subject_or_default(), &request.params);
    let body = render_template(&request.template_body, &request.params);

    if subject.trim().is_empty() {
        return Err(ComposeError::InvalidSubject);
    }

    if body.is_empty() {
        return Err(ValidationError::MissingContent.into());
    }

    let mut headers = BTreeMap::new();
    headers.insert(
        PRIORITY_HEADER.to_string(),
        request.priority.email_header_value().to_string(),
    );
    headers.insert(
        NOTIFICATION_ID_HEADER.to_string(),
        request.notification_id.clone(),
    );

    for (name, value) in &request.channel_config.headers {
        headers.insert(name.clone(), value.clone());
    }

    Ok(EmailMessage {
        to: request.to.trim().to_string(),
        subject,
        body,
        headers,
    })
}

pub fn compose_sms(request: &NotificationRequest) -> Result<SmsMessage, ComposeError> {
    let to = normalize_phone(&request.to)?;
    let body = render_template(&request.template_body, &request.params);

    if body.is_empty() {
        return Err(ValidationError::MissingContent.into());
    }

    Ok(SmsMessage { to, body })
}
