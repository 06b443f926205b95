use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use serde_json::json;
use tracing::error;

use super::orchestrator::{AgreementError, AgreementOrchestrator, NegotiationRequest};
use super::webhook::{WebhookError, WebhookService};
use crate::error::AppError;

#[derive(Clone)]
pub(crate) struct AgreementState {
    orchestrator: Arc<AgreementOrchestrator>,
    webhooks: Arc<WebhookService>,
}

/// Agreement creation and the provider webhook receiver.
pub fn agreement_router(
    orchestrator: Arc<AgreementOrchestrator>,
    webhooks: Arc<WebhookService>,
) -> Router {
    Router::new()
        .route("/api/v1/agreements", post(negotiate_handler))
        .route("/api/v1/webhooks/payments", post(webhook_handler))
        .with_state(AgreementState {
            orchestrator,
            webhooks,
        })
}

pub(crate) async fn negotiate_handler(
    State(state): State<AgreementState>,
    axum::Json(request): axum::Json<NegotiationRequest>,
) -> Response {
    match state.orchestrator.negotiate(&request).await {
        Ok(negotiation) => {
            let status = if negotiation.reused {
                StatusCode::OK
            } else {
                StatusCode::CREATED
            };
            (status, axum::Json(negotiation)).into_response()
        }
        Err(err) => {
            let err = AppError::from(err);
            if let AppError::Agreement(
                AgreementError::Repository(_) | AgreementError::Provider(_),
            ) = &err
            {
                error!(debt = %request.debt_id, error = %err, "agreement negotiation failed");
            }
            err.into_response()
        }
    }
}

/// Only malformed payloads are rejected; everything else is acknowledged so
/// the gateway stops redelivering.
pub(crate) async fn webhook_handler(State(state): State<AgreementState>, body: Bytes) -> Response {
    match state.webhooks.handle(&body).await {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Err(WebhookError::Malformed(err)) => {
            let payload = json!({
                "error": err.to_string(),
            });
            (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response()
        }
        Err(err) => {
            let payload = json!({
                "outcome": "error",
                "error": err.to_string(),
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
    }
}
