use std::{
    collections::BTreeMap,
    fmt::{Display, Formatter, Result},
};

use serde::{Deserialize, Serialize};

use crate::models::message::MediaKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    WhatsApp,
    Email,
    Sms,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::WhatsApp => "whatsapp",
            Channel::Email => "email",
            Channel::Sms => "sms",
        }
    }
}

impl Display for Channel {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(f, "{}", self.as_str())
    }
}

/// A message ready to hand to a channel sender. Built fresh per request.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelMessage {
    WhatsApp(WhatsAppMessage),
    Email(EmailMessage),
    Sms(SmsMessage),
}

impl ChannelMessage {
    pub fn channel(&self) -> Channel {
        match self {
            ChannelMessage::WhatsApp(_) => Channel::WhatsApp,
            ChannelMessage::Email(_) => Channel::Email,
            ChannelMessage::Sms(_) => Channel::Sms,
        }
    }

    pub fn recipient(&self) -> &str {
        match self {
            ChannelMessage::WhatsApp(message) => &message.to,
            ChannelMessage::Email(message) => &message.to,
            ChannelMessage::Sms(message) => &message.to,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhatsAppMessage {
    pub to: String,
    pub content: WhatsAppContent,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WhatsAppContent {
    Text {
        body: String,
    },
    Media {
        kind: MediaKind,
        link: String,
        caption: String,
        filename: Option<String>,
    },
    Template {
        name: String,
        language: String,
        parameters: Vec<String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
    pub headers: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SmsMessage {
    pub to: String,
    pub body: String,
}
