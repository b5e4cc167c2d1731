use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Body POSTed to every matching subscriber. Built fresh per attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryEvent {
    pub event: String,
    pub created_at: DateTime<Utc>,
    pub data: JsonValue,
}

impl DeliveryEvent {
    pub fn new(event: &str, data: JsonValue) -> Self {
        Self {
            event: event.to_string(),
            created_at: crate::utils::time::now(),
            data,
        }
    }
}
