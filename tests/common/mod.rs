#![allow(dead_code)]

use std::sync::Arc;

use fleet_dispatch_backend::{
    config::{Config, LogFormat, StoreBackend},
    dto::webhook_dto::CreateWebhookPayload,
    models::webhook_subscription::WebhookSubscription,
    store::InMemoryStore,
    AppState,
};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::Serialize;

pub const JWT_SECRET: &str = "test_secret_key";

pub fn test_config() -> Config {
    Config {
        server_address: "127.0.0.1:0".to_string(),
        jwt_secret: JWT_SECRET.to_string(),
        store_backend: StoreBackend::Memory,
        database_url: None,
        database_max_connections: 1,
        webhook_timeout_secs: 2,
        cors_allowed_origins: Vec::new(),
        log_format: LogFormat::Text,
    }
}

pub fn app_state() -> AppState {
    AppState::new(test_config(), Arc::new(InMemoryStore::new())).expect("app state")
}

pub async fn subscribe(state: &AppState, url: &str, events: &[&str]) -> WebhookSubscription {
    state
        .webhook_service
        .create(
            CreateWebhookPayload {
                url: Some(url.to_string()),
                events: Some(events.iter().map(|e| e.to_string()).collect()),
                description: None,
            },
            Some("dispatcher@fleet.test"),
        )
        .await
        .expect("create subscription")
}

pub async fn reload(state: &AppState, id: &str) -> WebhookSubscription {
    state.webhook_service.get(id).await.expect("reload subscription")
}

#[derive(Serialize)]
struct Claims {
    sub: String,
    exp: usize,
    role: Option<String>,
}

pub fn bearer_token(sub: &str) -> String {
    let exp = (chrono::Utc::now() + chrono::Duration::hours(1)).timestamp() as usize;
    encode(
        &Header::default(),
        &Claims {
            sub: sub.to_string(),
            exp,
            role: Some("dispatcher".into()),
        },
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("encode token")
}

/// An address nothing listens on, for transport failures.
pub async fn unreachable_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    format!("http://{}/hook", addr)
}
