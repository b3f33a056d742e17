use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchResponse {
    pub status: String,

    pub notification_id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    pub message: String,
}

impl DispatchResponse {
    pub fn sent(notification_id: String, recipient: String, message_id: String) -> Self {
        Self {
            status: "sent".to_string(),
            notification_id,
            recipient: Some(recipient),
            message_id: Some(message_id),
            error: None,
            message: "Test message sent successfully".to_string(),
        }
    }

    pub fn failed(notification_id: String, error: String) -> Self {
        Self {
            status: "failed".to_string(),
            notification_id,
            recipient: None,
            message_id: None,
            error: Some(error),
            message: "Failed to send message".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionTestResponse {
    pub status: String,

    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ConnectionTestResponse {
    pub fn success(message: String) -> Self {
        Self {
            status: "SUCCESS".to_string(),
            message,
            error: None,
        }
    }

    pub fn fail(message: String, error: String) -> Self {
        Self {
            status: "FAIL".to_string(),
            message,
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: String, message: String) -> Self {
        Self { error, message }
    }
}
