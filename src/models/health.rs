use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
}

impl HealthResponse {
    pub fn up(service: &str) -> Self {
        Self {
            status: "UP".to_string(),
            service: service.to_string(),
        }
    }
}
