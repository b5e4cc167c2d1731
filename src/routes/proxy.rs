use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};

use crate::{
    dto::{
        proxy_dto::{ProxyRequest, ProxyResponse, METHOD_REGISTER_WEBHOOK, METHOD_TRIGGER_WEBHOOKS},
        webhook_dto::{
            DeleteWebhookResponse, RegisterWebhookParams, TriggerWebhooksPayload, WebhookAction,
        },
    },
    error::{Error, Result},
    middleware::auth::Claims,
    utils::validation::validate,
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/proxy",
    request_body = ProxyRequest,
    responses(
        (status = 200, description = "Operation succeeded", body = Json<ProxyResponse>),
        (status = 400, description = "Malformed body, validation failure or unsupported method"),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 404, description = "Webhook not found")
    )
)]
#[axum::debug_handler]
pub async fn dispatch(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    body: std::result::Result<Json<ProxyRequest>, JsonRejection>,
) -> Result<Json<ProxyResponse>> {
    let Json(request) = body?;
    tracing::debug!(
        method = %request.method,
        entity = ?request.entity,
        caller = %claims.sub,
        "Dispatching proxy request"
    );

    let response = match request.method.as_str() {
        METHOD_REGISTER_WEBHOOK => register_webhook(&state, &claims, &request).await?,
        METHOD_TRIGGER_WEBHOOKS => trigger_webhooks(&state, &request).await?,
        other => return Err(Error::UnsupportedMethod(other.to_string())),
    };
    Ok(Json(response))
}

async fn register_webhook(
    state: &AppState,
    claims: &Claims,
    request: &ProxyRequest,
) -> Result<ProxyResponse> {
    let params: RegisterWebhookParams = request.params()?;
    let webhooks = &state.webhook_service;

    match params.action {
        WebhookAction::List => ProxyResponse::ok(&webhooks.list().await?),
        WebhookAction::Get => ProxyResponse::ok(&webhooks.resolve(params.into_target()).await?),
        WebhookAction::Create => {
            let created = webhooks
                .create(params.into_create(), Some(claims.sub.as_str()))
                .await?;
            ProxyResponse::ok(&created)
        }
        WebhookAction::Update => ProxyResponse::ok(&webhooks.update(params.into_update()).await?),
        WebhookAction::Delete => {
            let id = webhooks.delete(params.into_target()).await?;
            ProxyResponse::ok(&DeleteWebhookResponse { id, deleted: true })
        }
        WebhookAction::Test => {
            let subscription = webhooks.resolve(params.into_target()).await?;
            let result = state.delivery_service.deliver_test(&subscription).await;
            ProxyResponse::ok(&result)
        }
    }
}

async fn trigger_webhooks(state: &AppState, request: &ProxyRequest) -> Result<ProxyResponse> {
    let payload: TriggerWebhooksPayload = request.params()?;
    validate(&payload)?;
    let event = payload.event.unwrap_or_default();
    let result = state.delivery_service.trigger(&event, payload.data).await?;
    ProxyResponse::ok(&result)
}
