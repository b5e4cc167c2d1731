//! Webhook fan-out.
//!
//! A trigger looks up every active subscription listening for the event,
//! POSTs a signed [`DeliveryEvent`] to each of them concurrently, and records
//! per-subscription bookkeeping. Exactly one attempt is made per subscription
//! per trigger. Delivery and bookkeeping failures are folded into the
//! returned [`TriggerResult`]; they never fail the trigger itself.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use reqwest::{header::CONTENT_TYPE, Client};
use serde_json::{json, Value as JsonValue};

use crate::dto::webhook_dto::{DeliveryResult, TriggerResult};
use crate::error::Result;
use crate::models::delivery_event::DeliveryEvent;
use crate::models::webhook_subscription::{WebhookSubscription, WEBHOOKS_COLLECTION};
use crate::services::webhook_service::WebhookService;
use crate::store::{DocumentStore, FieldUpdate};
use crate::utils::{
    crypto::sign_payload,
    time::{now, to_sortable_string},
    validation::field_error,
};

pub const EVENT_HEADER: &str = "X-Webhook-Event";
pub const SIGNATURE_HEADER: &str = "X-Webhook-Signature";
pub const TIMESTAMP_HEADER: &str = "X-Webhook-Timestamp";
pub const SUBSCRIPTION_HEADER: &str = "X-Webhook-Id";

pub const TEST_EVENT: &str = "webhook.test";

const USER_AGENT: &str = concat!("fleet-dispatch-webhooks/", env!("CARGO_PKG_VERSION"));

/// Terminal state of a single delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered { status: u16 },
    Rejected { status: u16 },
    Unreachable { error: String },
}

impl DeliveryOutcome {
    pub fn from_status(status: u16) -> Self {
        if (200..300).contains(&status) {
            DeliveryOutcome::Delivered { status }
        } else {
            DeliveryOutcome::Rejected { status }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered { .. })
    }

    /// Diagnostic stored in `last_error`; `None` clears it.
    pub fn last_error(&self) -> Option<String> {
        match self {
            DeliveryOutcome::Delivered { .. } => None,
            DeliveryOutcome::Rejected { status } => Some(format!("HTTP {}", status)),
            DeliveryOutcome::Unreachable { error } => Some(error.clone()),
        }
    }

    pub fn into_result(self, subscription_id: &str) -> DeliveryResult {
        let success = self.is_success();
        let (status, error) = match self {
            DeliveryOutcome::Delivered { status } | DeliveryOutcome::Rejected { status } => {
                (Some(status), None)
            }
            DeliveryOutcome::Unreachable { error } => (None, Some(error)),
        };
        DeliveryResult {
            id: subscription_id.to_string(),
            success,
            status,
            error,
        }
    }

    /// Field changes for one attempt, applied as a single atomic write.
    fn bookkeeping(&self) -> Vec<FieldUpdate> {
        let mut changes = vec![
            FieldUpdate::increment("total_deliveries", 1),
            FieldUpdate::set("last_triggered_at", to_sortable_string(&now())),
            FieldUpdate::set(
                "last_error",
                self.last_error().map_or(JsonValue::Null, JsonValue::String),
            ),
        ];
        if !self.is_success() {
            changes.push(FieldUpdate::increment("failure_count", 1));
        }
        changes
    }
}

/// Builds the outbound client: bounded per-request timeout, no redirects.
pub fn build_http_client(timeout: Duration) -> Result<Client> {
    Ok(Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .redirect(reqwest::redirect::Policy::none())
        .build()?)
}

#[derive(Clone)]
pub struct DeliveryService {
    webhooks: WebhookService,
    store: Arc<dyn DocumentStore>,
    client: Client,
}

impl DeliveryService {
    pub fn new(store: Arc<dyn DocumentStore>, client: Client) -> Self {
        Self {
            webhooks: WebhookService::new(store.clone()),
            store,
            client,
        }
    }

    /// Delivers `data` to every active subscription listening for `event`.
    pub async fn trigger(&self, event: &str, data: JsonValue) -> Result<TriggerResult> {
        let event = event.trim();
        if event.is_empty() {
            return Err(field_error("event", "required", "event is required"));
        }

        let subscriptions = self.webhooks.find_active_for_event(event).await?;
        if subscriptions.is_empty() {
            tracing::debug!(event, "No active subscriptions match event");
            return Ok(TriggerResult::empty());
        }

        tracing::info!(
            event,
            subscription_count = subscriptions.len(),
            "Delivering event to matching subscriptions"
        );

        let results = join_all(
            subscriptions
                .iter()
                .map(|subscription| self.deliver(subscription, event, &data)),
        )
        .await;

        let result = TriggerResult::from_results(results);
        tracing::info!(
            event,
            delivered = result.delivered_count,
            attempted = subscriptions.len(),
            "Event fan-out finished"
        );
        Ok(result)
    }

    /// Sends a `webhook.test` event to one subscription, active or not.
    pub async fn deliver_test(&self, subscription: &WebhookSubscription) -> DeliveryResult {
        let data = json!({ "webhook_id": subscription.id });
        self.deliver(subscription, TEST_EVENT, &data).await
    }

    async fn deliver(
        &self,
        subscription: &WebhookSubscription,
        event: &str,
        data: &JsonValue,
    ) -> DeliveryResult {
        let outcome = self.attempt(subscription, event, data).await;
        match &outcome {
            DeliveryOutcome::Delivered { status } => tracing::debug!(
                subscription_id = %subscription.id,
                event,
                status,
                "Webhook delivered"
            ),
            DeliveryOutcome::Rejected { status } => tracing::warn!(
                subscription_id = %subscription.id,
                event,
                status,
                "Webhook endpoint rejected delivery"
            ),
            DeliveryOutcome::Unreachable { error } => tracing::warn!(
                subscription_id = %subscription.id,
                event,
                error = %error,
                "Webhook endpoint unreachable"
            ),
        }
        self.record_attempt(&subscription.id, &outcome).await;
        outcome.into_result(&subscription.id)
    }

    async fn attempt(
        &self,
        subscription: &WebhookSubscription,
        event: &str,
        data: &JsonValue,
    ) -> DeliveryOutcome {
        let payload = DeliveryEvent::new(event, data.clone());
        let body = match serde_json::to_vec(&payload) {
            Ok(body) => body,
            Err(e) => {
                return DeliveryOutcome::Unreachable {
                    error: format!("payload serialization failed: {}", e),
                }
            }
        };

        let timestamp = payload.created_at.timestamp();
        let signature = match sign_payload(&subscription.secret, timestamp, &body) {
            Ok(signature) => signature,
            Err(e) => {
                return DeliveryOutcome::Unreachable {
                    error: format!("payload signing failed: {}", e),
                }
            }
        };

        let res = self
            .client
            .post(&subscription.url)
            .header(CONTENT_TYPE, "application/json")
            .header(EVENT_HEADER, event)
            .header(TIMESTAMP_HEADER, timestamp.to_string())
            .header(SIGNATURE_HEADER, signature)
            .header(SUBSCRIPTION_HEADER, subscription.id.as_str())
            .body(body)
            .send()
            .await;

        match res {
            Ok(resp) => DeliveryOutcome::from_status(resp.status().as_u16()),
            Err(err) if err.is_timeout() => DeliveryOutcome::Unreachable {
                error: format!("request timed out: {}", err),
            },
            Err(err) => DeliveryOutcome::Unreachable {
                error: err.to_string(),
            },
        }
    }

    /// Bookkeeping failures are logged and swallowed; the delivery outcome
    /// already reported to the caller stands.
    async fn record_attempt(&self, subscription_id: &str, outcome: &DeliveryOutcome) {
        if let Err(e) = self
            .store
            .update(WEBHOOKS_COLLECTION, subscription_id, outcome.bookkeeping())
            .await
        {
            tracing::warn!(
                subscription_id,
                error = %e,
                "Failed to record webhook delivery bookkeeping"
            );
        }
    }
}
