use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio_util::sync::CancellationToken;

use super::classification::{recommended_action, ClassificationCriteria, RiskTier};
use super::domain::CollectionSubject;
use super::engine::CollectionEngine;

#[derive(Clone)]
pub(crate) struct CollectionState {
    engine: Arc<CollectionEngine>,
    shutdown: CancellationToken,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EvaluateRequest {
    subjects: Vec<CollectionSubject>,
}

#[derive(Debug, Serialize)]
struct ClassificationView {
    tier: RiskTier,
    applied_rule: String,
    score: u16,
    matched: bool,
    recommended_action: &'static str,
}

/// Router exposing risk classification and batch evaluation. Batches started
/// through it stop picking up new debts once `shutdown` is cancelled.
pub fn collection_router(engine: Arc<CollectionEngine>, shutdown: CancellationToken) -> Router {
    Router::new()
        .route("/api/v1/risk/classify", post(classify_handler))
        .route("/api/v1/collection/evaluate", post(evaluate_handler))
        .with_state(CollectionState { engine, shutdown })
}

pub(crate) async fn classify_handler(
    State(state): State<CollectionState>,
    axum::Json(criteria): axum::Json<ClassificationCriteria>,
) -> Response {
    let assessment = state.engine.classify(&criteria);
    let view = ClassificationView {
        recommended_action: recommended_action(assessment.tier, criteria.days_overdue),
        tier: assessment.tier,
        applied_rule: assessment.applied_rule,
        score: assessment.score,
        matched: assessment.matched,
    };
    (StatusCode::OK, axum::Json(view)).into_response()
}

pub(crate) async fn evaluate_handler(
    State(state): State<CollectionState>,
    axum::Json(request): axum::Json<EvaluateRequest>,
) -> Response {
    if request.subjects.is_empty() {
        let payload = json!({
            "error": "at least one subject is required",
        });
        return (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response();
    }

    let cancel = state.shutdown.child_token();
    let report = state.engine.run_batch(request.subjects, &cancel).await;
    (StatusCode::OK, axum::Json(report)).into_response()
}
