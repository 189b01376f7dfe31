//! API routes.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;

use crate::handlers::{
    abort, analyze, get_config, health, list_local_models, ready, set_local_model,
};
use crate::metrics::metrics_middleware;
use crate::middleware::{
    cors_layer, rate_limit_middleware, request_id, request_logging, security_headers,
    RateLimiterCache,
};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let analysis_routes = Router::new().route("/analyze", post(analyze));

    let provider_routes = Router::new()
        .route("/config", get(get_config))
        .route("/ollama/models", get(list_local_models))
        .route("/ollama/model", post(set_local_model));

    let rate_limiter = Arc::new(RateLimiterCache::new(state.config.rate_limit_rps));

    let api_routes = Router::new()
        .merge(analysis_routes)
        .merge(provider_routes)
        .layer(middleware::from_fn_with_state(
            rate_limiter,
            rate_limit_middleware,
        ))
        // Aborts must get through even when the client is throttled
        .route("/abort", post(abort));

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/ready", get(ready));

    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        // Multipart extraction has its own default cap; lift it to the configured size
        .layer(DefaultBodyLimit::max(state.config.max_body_size))
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
