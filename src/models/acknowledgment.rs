use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};

use crate::models::status::AckStatus;

/// Terminal outcome of one notification, published to the acknowledgment
/// queue keyed by `notification_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcknowledgmentRecord {
    pub notification_id: String,
    pub status: AckStatus,
    pub details: String,

    #[serde(serialize_with = "rfc3339_utc")]
    pub timestamp: DateTime<Utc>,
}

impl AcknowledgmentRecord {
    pub fn new(notification_id: String, status: AckStatus, details: String) -> Self {
        Self {
            notification_id,
            status,
            details,
            timestamp: Utc::now(),
        }
    }
}

fn rfc3339_utc<S: Serializer>(
    timestamp: &DateTime<Utc>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&timestamp.to_rfc3339_opts(SecondsFormat::Millis, true))
}
