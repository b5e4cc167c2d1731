use std::sync::Arc;

use crate::dto::webhook_dto::{CreateWebhookPayload, UpdateWebhookPayload, WebhookTargetPayload};
use crate::error::{Error, Result};
use crate::models::webhook_subscription::{
    NewWebhookSubscription, WebhookSubscription, WEBHOOKS_COLLECTION,
};
use crate::store::{DocumentStore, FieldUpdate, OrderBy, Query};
use crate::utils::{
    time::{now, to_sortable_string},
    token::generate_webhook_secret,
    validation::{field_error, normalize_events, validate, validate_webhook_url},
};

/// Webhook registry: CRUD over subscription records. Delivery bookkeeping
/// fields are never written here.
#[derive(Clone)]
pub struct WebhookService {
    store: Arc<dyn DocumentStore>,
}

impl WebhookService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> Result<Vec<WebhookSubscription>> {
        let docs = self
            .store
            .query(
                WEBHOOKS_COLLECTION,
                &Query::new().order_by(OrderBy::desc("created_at")),
            )
            .await?;
        docs.into_iter().map(WebhookSubscription::try_from).collect()
    }

    pub async fn get(&self, id: &str) -> Result<WebhookSubscription> {
        let doc = self
            .store
            .get(WEBHOOKS_COLLECTION, id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Webhook {} not found", id)))?;
        doc.try_into()
    }

    /// Records that fail to decode are logged and skipped.
    pub async fn find_active_for_event(&self, event: &str) -> Result<Vec<WebhookSubscription>> {
        let docs = self
            .store
            .query(
                WEBHOOKS_COLLECTION,
                &Query::new()
                    .eq("is_active", true)
                    .array_contains("events", event),
            )
            .await?;

        Ok(docs
            .into_iter()
            .filter_map(|doc| {
                let id = doc.id.clone();
                match WebhookSubscription::try_from(doc) {
                    Ok(subscription) => Some(subscription),
                    Err(e) => {
                        tracing::warn!(
                            subscription_id = %id,
                            event,
                            error = %e,
                            "Skipping undecodable webhook subscription"
                        );
                        None
                    }
                }
            })
            .collect())
    }

    pub async fn create(
        &self,
        payload: CreateWebhookPayload,
        created_by: Option<&str>,
    ) -> Result<WebhookSubscription> {
        validate(&payload)?;
        let (Some(url), Some(events)) = (payload.url, payload.events) else {
            return Err(Error::BadRequest("url and events are required".into()));
        };
        let url = validate_webhook_url(&url)?;
        let events = normalize_events(&events)?;

        let record = NewWebhookSubscription {
            url: url.to_string(),
            events,
            secret: generate_webhook_secret(),
            is_active: true,
            description: payload
                .description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
            failure_count: 0,
            total_deliveries: 0,
            last_triggered_at: None,
            last_error: None,
            created_by: created_by.map(str::to_string),
            created_at: now(),
        };

        let doc = self
            .store
            .create(WEBHOOKS_COLLECTION, serde_json::to_value(&record)?)
            .await?;
        let created = WebhookSubscription::try_from(doc)?;
        tracing::info!(
            subscription_id = %created.id,
            url = %created.url,
            events = ?created.events,
            "Webhook subscription created"
        );
        Ok(created)
    }

    /// Only `is_active` is mutable through the registry.
    pub async fn update(&self, payload: UpdateWebhookPayload) -> Result<WebhookSubscription> {
        validate(&payload)?;
        let id = required_id(payload.webhook_id)?;
        let is_active = payload
            .is_active
            .ok_or_else(|| field_error("is_active", "required", "is_active is required"))?;

        let doc = self
            .store
            .update(
                WEBHOOKS_COLLECTION,
                &id,
                vec![
                    FieldUpdate::set("is_active", is_active),
                    FieldUpdate::set("updated_at", to_sortable_string(&now())),
                ],
            )
            .await
            .map_err(|e| match e {
                Error::NotFound(_) => Error::NotFound(format!("Webhook {} not found", id)),
                other => other,
            })?;
        tracing::info!(subscription_id = %id, is_active, "Webhook subscription updated");
        doc.try_into()
    }

    pub async fn delete(&self, payload: WebhookTargetPayload) -> Result<String> {
        validate(&payload)?;
        let id = required_id(payload.webhook_id)?;
        if !self.store.delete(WEBHOOKS_COLLECTION, &id).await? {
            return Err(Error::NotFound(format!("Webhook {} not found", id)));
        }
        tracing::info!(subscription_id = %id, "Webhook subscription deleted");
        Ok(id)
    }

    pub async fn resolve(&self, payload: WebhookTargetPayload) -> Result<WebhookSubscription> {
        validate(&payload)?;
        let id = required_id(payload.webhook_id)?;
        self.get(&id).await
    }
}

fn required_id(id: Option<String>) -> Result<String> {
    id.map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .ok_or_else(|| field_error("webhookId", "required", "webhookId is required"))
}
