use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// One notification request, decoded from an inbound queue message or from
/// the body of `POST /send-test`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct NotificationRequest {
    #[serde(deserialize_with = "null_as_default")]
    pub notification_id: String,

    #[serde(deserialize_with = "null_as_default")]
    pub message_type: String,

    #[serde(deserialize_with = "null_as_default")]
    pub to: String,

    #[serde(deserialize_with = "null_as_default")]
    pub template_body: String,

    #[serde(deserialize_with = "null_as_default")]
    pub params: HashMap<String, String>,

    pub channel_config: ChannelConfig,

    /// Carried for forward compatibility, nothing acts on it.
    #[serde(deserialize_with = "null_as_default")]
    pub fallback_channels: Vec<Value>,

    #[serde(deserialize_with = "null_as_default")]
    pub priority: Priority,

    #[serde(deserialize_with = "null_as_default")]
    pub locale: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_type: Option<MediaKind>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_name: Option<String>,
}

impl NotificationRequest {
    pub fn media_url(&self) -> Option<&str> {
        self.media_url.as_deref().filter(|url| !url.is_empty())
    }

    pub fn template_name(&self) -> Option<&str> {
        self.template_name.as_deref().filter(|name| !name.is_empty())
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
    #[default]
    Unspecified,
    Other(String),
}

impl From<String> for Priority {
    fn from(value: String) -> Self {
        match value.as_str() {
            "low" => Priority::Low,
            "medium" => Priority::Medium,
            "high" => Priority::High,
            "urgent" => Priority::Urgent,
            "" => Priority::Unspecified,
            _ => Priority::Other(value),
        }
    }
}

impl From<Priority> for String {
    fn from(value: Priority) -> Self {
        match value {
            Priority::Low => "low".to_string(),
            Priority::Medium => "medium".to_string(),
            Priority::High => "high".to_string(),
            Priority::Urgent => "urgent".to_string(),
            Priority::Unspecified => String::new(),
            Priority::Other(other) => other,
        }
    }
}

impl Priority {
    /// Value of the `X-Priority` email header. Anything that is not a known
    /// level is sent as normal priority.
    pub fn email_header_value(&self) -> &'static str {
        match self {
            Priority::Urgent => "1 (Highest)",
            Priority::High => "2 (High)",
            Priority::Medium => "3 (Normal)",
            Priority::Low => "4 (Low)",
            Priority::Unspecified | Priority::Other(_) => "3 (Normal)",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Document,
    Audio,
    Video,
    #[serde(other)]
    Unknown,
}

/// Channel-specific settings carried in `channelConfig`.
///
/// Only `subject` and `headers` are interpreted. Values of the wrong type are
/// dropped when the request is decoded; every other key is kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Option<Map<String, Value>>", into = "Map<String, Value>")]
pub struct ChannelConfig {
    pub subject: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub extra: Map<String, Value>,
}

pub const DEFAULT_EMAIL_SUBJECT: &str = "Notification";

impl ChannelConfig {
    pub fn subject_or_default(&self) -> &str {
        self.subject.as_deref().unwrap_or(DEFAULT_EMAIL_SUBJECT)
    }
}

impl From<Option<Map<String, Value>>> for ChannelConfig {
    fn from(value: Option<Map<String, Value>>) -> Self {
        let mut extra = value.unwrap_or_default();

        let subject = match extra.remove("subject") {
            Some(Value::String(subject)) => Some(subject),
            _ => None,
        };

        let headers = match extra.remove("headers") {
            Some(Value::Object(headers)) => headers
                .into_iter()
                .filter_map(|(name, value)| match value {
                    Value::String(value) => Some((name, value)),
                    _ => None,
                })
                .collect(),
            _ => BTreeMap::new(),
        };

        Self {
            subject,
            headers,
            extra,
        }
    }
}

impl From<ChannelConfig> for Map<String, Value> {
    fn from(value: ChannelConfig) -> Self {
        let mut map = value.extra;

        if let Some(subject) = value.subject {
            map.insert("subject".to_string(), Value::String(subject));
        }

        if !value.headers.is_empty() {
            let headers = value
                .headers
                .into_iter()
                .map(|(name, value)| (name, Value::String(value)))
                .collect();
            map.insert("headers".to_string(), Value::Object(headers));
        }

        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_full_payload() {
        let payload = serde_json::json!({
            "notificationId": "n-1",
            "messageType": "text",
            "to": "+15550001111",
            "templateBody": "Hello {name}",
            "params": {"name": "Ada"},
            "channelConfig": {"subject": "Hi", "headers": {"X-A": "1", "X-B": 2}, "replyTo": "x"},
            "fallbackChannels": [{"channel": "sms"}],
            "priority": "urgent",
            "locale": "en_US",
            "mediaUrl": "https://cdn.example.com/a.png",
            "mediaType": "image",
            "templateName": "welcome"
        });

        let request: NotificationRequest = serde_json::from_value(payload).unwrap();

        assert_eq!(request.notification_id, "n-1");
        assert_eq!(request.priority, Priority::Urgent);
        assert_eq!(request.channel_config.subject.as_deref(), Some("Hi"));
        assert_eq!(request.channel_config.headers.len(), 1);
        assert_eq!(request.channel_config.headers["X-A"], "1");
        assert!(request.channel_config.extra.contains_key("replyTo"));
        assert_eq!(request.fallback_channels.len(), 1);
        assert_eq!(request.media_type, Some(MediaKind::Image));
        assert_eq!(request.template_name(), Some("welcome"));
    }

    #[test]
    fn tolerates_missing_and_null_fields() {
        let request: NotificationRequest = serde_json::from_str(
            r#"{"notificationId":"n-2","params":null,"channelConfig":null,
                "fallbackChannels":null}"#,
        )
        .unwrap();

        assert!(request.params.is_empty());
        assert_eq!(request.channel_config, ChannelConfig::default());
        assert_eq!(request.priority, Priority::Unspecified);
        assert_eq!(request.media_url(), None);
    }

    #[test]
    fn null_identity_fields_decode_as_empty() {
        let request: NotificationRequest = serde_json::from_str(
            r#"{"notificationId":null,"messageType":null,"to":null,"templateBody":"Hi"}"#,
        )
        .unwrap();

        assert_eq!(request.notification_id, "");
        assert_eq!(request.message_type, "");
        assert_eq!(request.to, "");
        assert_eq!(request.template_body, "Hi");
    }

    #[test]
    fn subject_of_wrong_type_falls_back() {
        let config = ChannelConfig::from(Some(
            serde_json::json!({"subject": 42})
                .as_object()
                .cloned()
                .unwrap(),
        ));

        assert_eq!(config.subject_or_default(), "Notification");
    }

    #[test]
    fn unknown_media_kind_is_kept_as_unknown() {
        let kind: MediaKind = serde_json::from_str("\"sticker\"").unwrap();
        assert_eq!(kind, MediaKind::Unknown);
    }
}
