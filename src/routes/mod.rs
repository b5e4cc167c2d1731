pub mod health;
pub mod proxy;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::{middleware, AppState};

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/api/proxy", post(proxy::dispatch))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_bearer_auth,
        ));

    Router::new()
        .route("/health", get(health::health))
        .merge(api)
        .layer(middleware::cors::cors_layer(&state.config.cors_allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
