use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use collection_engine::agreements::{agreement_router, AgreementOrchestrator, WebhookService};
use collection_engine::collection::{collection_router, CollectionEngine};
use serde_json::json;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub(crate) struct Services {
    pub(crate) engine: Arc<CollectionEngine>,
    pub(crate) orchestrator: Arc<AgreementOrchestrator>,
    pub(crate) webhooks: Arc<WebhookService>,
    pub(crate) shutdown: CancellationToken,
}

pub(crate) fn with_service_routes(services: Services) -> axum::Router {
    collection_router(services.engine, services.shutdown)
        .merge(agreement_router(services.orchestrator, services.webhooks))
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
