pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod store;
pub mod utils;

use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::error::Result;
use crate::services::{
    delivery_service::{build_http_client, DeliveryService},
    webhook_service::WebhookService,
};
use crate::store::DocumentStore;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn DocumentStore>,
    pub webhook_service: WebhookService,
    pub delivery_service: DeliveryService,
}

impl AppState {
    /// Wires services around an already-constructed store. The caller owns
    /// the store's lifecycle.
    pub fn new(config: Config, store: Arc<dyn DocumentStore>) -> Result<Self> {
        let http_client = build_http_client(Duration::from_secs(config.webhook_timeout_secs.max(1)))?;

        let webhook_service = WebhookService::new(store.clone());
        let delivery_service = DeliveryService::new(store.clone(), http_client);

        Ok(Self {
            config: Arc::new(config),
            store,
            webhook_service,
            delivery_service,
        })
    }
}
