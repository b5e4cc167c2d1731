use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::store::Document;
use crate::utils::time::sortable;

pub const WEBHOOKS_COLLECTION: &str = "webhooks";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookSubscription {
    pub id: String,
    pub url: String,
    pub events: Vec<String>,
    pub secret: String,
    pub is_active: bool,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub failure_count: i64,
    #[serde(default)]
    pub total_deliveries: i64,
    #[serde(default)]
    pub last_triggered_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_error: Option<String>,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(with = "sortable")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<Document> for WebhookSubscription {
    type Error = crate::error::Error;

    fn try_from(doc: Document) -> Result<Self> {
        Ok(serde_json::from_value(doc.into_json())?)
    }
}

/// Body written on creation; the store assigns the id.
#[derive(Debug, Clone, Serialize)]
pub struct NewWebhookSubscription {
    pub url: String,
    pub events: Vec<String>,
    pub secret: String,
    pub is_active: bool,
    pub description: Option<String>,
    pub failure_count: i64,
    pub total_deliveries: i64,
    pub last_triggered_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub created_by: Option<String>,
    #[serde(with = "sortable")]
    pub created_at: DateTime<Utc>,
}
