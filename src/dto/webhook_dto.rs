use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WebhookAction {
    List,
    Get,
    Create,
    Update,
    Delete,
    Test,
}

/// `params` of a `registerWebhook` call. Which fields matter depends on
/// `action`; the per-action payloads below carry the validation rules.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterWebhookParams {
    pub action: WebhookAction,
    pub url: Option<String>,
    pub events: Option<Vec<String>>,
    pub description: Option<String>,
    #[serde(rename = "webhookId", alias = "webhook_id")]
    pub webhook_id: Option<String>,
    pub is_active: Option<bool>,
}

impl RegisterWebhookParams {
    pub fn into_create(self) -> CreateWebhookPayload {
        CreateWebhookPayload {
            url: self.url,
            events: self.events,
            description: self.description,
        }
    }

    pub fn into_update(self) -> UpdateWebhookPayload {
        UpdateWebhookPayload {
            webhook_id: self.webhook_id,
            is_active: self.is_active,
        }
    }

    pub fn into_target(self) -> WebhookTargetPayload {
        WebhookTargetPayload {
            webhook_id: self.webhook_id,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct CreateWebhookPayload {
    #[validate(
        required(message = "url is required"),
        length(min = 1, message = "url is required")
    )]
    pub url: Option<String>,
    #[validate(
        required(message = "events is required"),
        length(min = 1, message = "events must contain at least one event")
    )]
    pub events: Option<Vec<String>>,
    #[validate(length(max = 500))]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateWebhookPayload {
    #[validate(
        required(message = "webhookId is required"),
        length(min = 1, message = "webhookId is required")
    )]
    #[serde(rename = "webhookId")]
    pub webhook_id: Option<String>,
    #[validate(required(message = "is_active is required"))]
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct WebhookTargetPayload {
    #[validate(
        required(message = "webhookId is required"),
        length(min = 1, message = "webhookId is required")
    )]
    #[serde(rename = "webhookId")]
    pub webhook_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct TriggerWebhooksPayload {
    #[validate(
        required(message = "event is required"),
        length(min = 1, message = "event is required")
    )]
    pub event: Option<String>,
    #[serde(default)]
    pub data: JsonValue,
}

/// Outcome of one delivery attempt against one subscription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryResult {
    pub id: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregate outcome of a trigger call. `results` is omitted when no
/// subscription matched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerResult {
    pub delivered_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<DeliveryResult>>,
}

impl TriggerResult {
    pub fn empty() -> Self {
        Self {
            delivered_count: 0,
            results: None,
        }
    }

    pub fn from_results(results: Vec<DeliveryResult>) -> Self {
        Self {
            delivered_count: results.iter().filter(|r| r.success).count(),
            results: Some(results),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteWebhookResponse {
    pub id: String,
    pub deleted: bool,
}
