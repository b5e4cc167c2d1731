mod common;

use common::*;
use fleet_dispatch_backend::{
    dto::webhook_dto::{TriggerResult, UpdateWebhookPayload},
    error::ErrorKind,
    models::delivery_event::DeliveryEvent,
    services::delivery_service::{EVENT_HEADER, SIGNATURE_HEADER, TIMESTAMP_HEADER},
    store::DocumentStore,
    utils::crypto::verify_signature,
};
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn endpoint(status: u16) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(status))
        .mount(&server)
        .await;
    server
}

fn hook_url(server: &MockServer) -> String {
    format!("{}/hook", server.uri())
}

#[tokio::test]
async fn successful_delivery_updates_counters() {
    let server = endpoint(200).await;
    let state = app_state();
    let sub = subscribe(&state, &hook_url(&server), &["ride.created"]).await;

    let result = state
        .delivery_service
        .trigger("ride.created", json!({ "rideId": "r1" }))
        .await
        .expect("trigger");

    assert_eq!(result.delivered_count, 1);
    let results = result.results.expect("results");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, sub.id);
    assert!(results[0].success);
    assert_eq!(results[0].status, Some(200));
    assert_eq!(results[0].error, None);

    let after = reload(&state, &sub.id).await;
    assert_eq!(after.failure_count, 0);
    assert_eq!(after.total_deliveries, 1);
    assert_eq!(after.last_error, None);
    assert!(after.last_triggered_at.is_some());
}

#[tokio::test]
async fn server_error_counts_as_failure() {
    let server = endpoint(500).await;
    let state = app_state();
    let sub = subscribe(&state, &hook_url(&server), &["ride.created"]).await;

    let result = state
        .delivery_service
        .trigger("ride.created", json!({ "rideId": "r1" }))
        .await
        .expect("trigger");

    assert_eq!(result.delivered_count, 0);
    let results = result.results.expect("results");
    assert_eq!(results.len(), 1);
    assert!(!results[0].success);
    assert_eq!(results[0].status, Some(500));

    let after = reload(&state, &sub.id).await;
    assert_eq!(after.failure_count, 1);
    assert_eq!(after.total_deliveries, 1);
    assert_eq!(after.last_error.as_deref(), Some("HTTP 500"));
}

#[tokio::test]
async fn transport_error_is_reported_not_raised() {
    let state = app_state();
    let sub = subscribe(&state, &unreachable_url().await, &["ride.created"]).await;

    let result = state
        .delivery_service
        .trigger("ride.created", json!({}))
        .await
        .expect("trigger succeeds even when every delivery fails");

    assert_eq!(result.delivered_count, 0);
    let results = result.results.expect("results");
    assert_eq!(results.len(), 1);
    assert!(!results[0].success);
    assert_eq!(results[0].status, None);
    assert!(results[0].error.as_deref().is_some_and(|e| !e.is_empty()));

    let after = reload(&state, &sub.id).await;
    assert_eq!(after.failure_count, 1);
    assert_eq!(after.total_deliveries, 1);
    assert!(after.last_error.as_deref().is_some_and(|e| !e.is_empty()));
}

#[tokio::test]
async fn no_matching_subscription_is_a_normal_outcome() {
    let server = endpoint(200).await;
    let state = app_state();
    let sub = subscribe(&state, &hook_url(&server), &["driver.assigned"]).await;

    let result = state
        .delivery_service
        .trigger("ride.created", json!({ "rideId": "r1" }))
        .await
        .expect("trigger");

    assert_eq!(result, TriggerResult::empty());
    assert_eq!(
        serde_json::to_value(&result).unwrap(),
        json!({ "delivered_count": 0 })
    );
    assert!(server.received_requests().await.unwrap().is_empty());

    let after = reload(&state, &sub.id).await;
    assert_eq!(after, sub);
}

#[tokio::test]
async fn malformed_subscription_does_not_block_valid_ones() {
    let server = endpoint(200).await;
    let state = app_state();
    let sub = subscribe(&state, &hook_url(&server), &["ride.created"]).await;
    state
        .store
        .create(
            "webhooks",
            json!({ "events": ["ride.created"], "is_active": true }),
        )
        .await
        .expect("raw document");

    let result = state
        .delivery_service
        .trigger("ride.created", json!({ "rideId": "r1" }))
        .await
        .expect("trigger");

    assert_eq!(result.delivered_count, 1);
    let results = result.results.expect("results");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, sub.id);
    assert_eq!(reload(&state, &sub.id).await.total_deliveries, 1);
}

#[tokio::test]
async fn inactive_subscriptions_are_skipped() {
    let server = endpoint(200).await;
    let state = app_state();
    let active = subscribe(&state, &hook_url(&server), &["ride.created"]).await;
    let paused = subscribe(&state, &hook_url(&server), &["ride.created"]).await;
    state
        .webhook_service
        .update(UpdateWebhookPayload {
            webhook_id: Some(paused.id.clone()),
            is_active: Some(false),
        })
        .await
        .expect("pause");

    let result = state
        .delivery_service
        .trigger("ride.created", json!({}))
        .await
        .expect("trigger");

    let results = result.results.expect("results");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, active.id);
    assert_eq!(reload(&state, &paused.id).await.total_deliveries, 0);
}

#[tokio::test]
async fn mixed_outcomes_produce_one_result_per_subscription() {
    let ok = endpoint(204).await;
    let broken = endpoint(503).await;
    let state = app_state();
    let a = subscribe(&state, &hook_url(&ok), &["ride.created", "ride.cancelled"]).await;
    let b = subscribe(&state, &hook_url(&broken), &["ride.created"]).await;
    let c = subscribe(&state, &unreachable_url().await, &["ride.created"]).await;

    let result = state
        .delivery_service
        .trigger("ride.created", json!({ "rideId": "r9" }))
        .await
        .expect("trigger");

    assert_eq!(result.delivered_count, 1);
    let mut results = result.results.expect("results");
    assert_eq!(results.len(), 3);
    results.sort_by(|x, y| x.id.cmp(&y.id));
    let mut ids = vec![a.id.clone(), b.id.clone(), c.id.clone()];
    ids.sort();
    assert_eq!(results.iter().map(|r| r.id.clone()).collect::<Vec<_>>(), ids);

    let by_id = |id: &str| results.iter().find(|r| r.id == id).unwrap().clone();
    assert!(by_id(&a.id).success);
    assert_eq!(by_id(&b.id).status, Some(503));
    assert!(by_id(&c.id).error.is_some());
}

#[tokio::test]
async fn counters_track_every_attempt_across_triggers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let state = app_state();
    let sub = subscribe(&state, &hook_url(&server), &["ride.created"]).await;

    for _ in 0..2 {
        state
            .delivery_service
            .trigger("ride.created", json!({}))
            .await
            .expect("trigger");
    }
    let failing = reload(&state, &sub.id).await;
    assert_eq!(failing.total_deliveries, 2);
    assert_eq!(failing.failure_count, 2);
    assert_eq!(failing.last_error.as_deref(), Some("HTTP 500"));

    for _ in 0..3 {
        state
            .delivery_service
            .trigger("ride.created", json!({}))
            .await
            .expect("trigger");
    }
    let recovered = reload(&state, &sub.id).await;
    assert_eq!(recovered.total_deliveries, 5);
    assert_eq!(recovered.failure_count, 2);
    assert_eq!(recovered.last_error, None);
}

#[tokio::test]
async fn concurrent_triggers_do_not_lose_increments() {
    let server = endpoint(200).await;
    let state = app_state();
    let sub = subscribe(&state, &hook_url(&server), &["ride.created", "ride.updated"]).await;

    let runs = (0..10).map(|i| {
        let state = state.clone();
        let event = if i % 2 == 0 { "ride.created" } else { "ride.updated" };
        tokio::spawn(async move { state.delivery_service.trigger(event, json!({ "i": i })).await })
    });
    for run in futures::future::join_all(runs).await {
        run.expect("join").expect("trigger");
    }

    assert_eq!(reload(&state, &sub.id).await.total_deliveries, 10);
}

#[tokio::test]
async fn delivery_is_signed_and_carries_the_event_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .and(header(EVENT_HEADER, "ride.created"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let state = app_state();
    let sub = subscribe(&state, &hook_url(&server), &["ride.created"]).await;
    state
        .delivery_service
        .trigger("ride.created", json!({ "rideId": "r1" }))
        .await
        .expect("trigger");

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];

    let body: DeliveryEvent = serde_json::from_slice(&request.body).unwrap();
    assert_eq!(body.event, "ride.created");
    assert_eq!(body.data, json!({ "rideId": "r1" }));

    let timestamp: i64 = request.headers[TIMESTAMP_HEADER]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    let signature = request.headers[SIGNATURE_HEADER].to_str().unwrap();
    assert_ne!(signature, sub.secret);
    assert!(verify_signature(&sub.secret, timestamp, &request.body, signature));
}

#[tokio::test]
async fn blank_event_is_a_validation_error() {
    let state = app_state();
    let err = state
        .delivery_service
        .trigger("  ", json!({}))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn test_delivery_reaches_inactive_subscription_and_records_attempt() {
    let server = endpoint(200).await;
    let state = app_state();
    let sub = subscribe(&state, &hook_url(&server), &["ride.created"]).await;
    state
        .webhook_service
        .update(UpdateWebhookPayload {
            webhook_id: Some(sub.id.clone()),
            is_active: Some(false),
        })
        .await
        .expect("pause");

    let paused = reload(&state, &sub.id).await;
    let result = state.delivery_service.deliver_test(&paused).await;
    assert!(result.success);
    assert_eq!(result.status, Some(200));

    let requests = server.received_requests().await.unwrap();
    let body: DeliveryEvent = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body.event, "webhook.test");
    assert_eq!(body.data, json!({ "webhook_id": sub.id }));
    assert_eq!(reload(&state, &sub.id).await.total_deliveries, 1);
}
