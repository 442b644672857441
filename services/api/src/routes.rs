use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use filing_desk::workflows::filing::{
    filing_router, AgentVerifier, AmendmentDetails, AmendmentRegistry, DocumentStore,
    FilingRepository, FilingType, FilingWorkflowService,
};

pub(crate) fn with_filing_routes<R, S, V>(
    service: Arc<FilingWorkflowService<R, S, V>>,
) -> axum::Router
where
    R: FilingRepository + 'static,
    S: DocumentStore + 'static,
    V: AgentVerifier + 'static,
{
    filing_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route(
            "/api/v1/amendments/guide",
            axum::routing::post(amendment_guide_endpoint),
        )
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

#[derive(Debug, Deserialize)]
pub(crate) struct AmendmentGuideRequest {
    pub(crate) details: AmendmentDetails,
}

/// Stateless preview of the instructions an amendment payload would produce,
/// so agents can walk a customer through the consequences before anything is
/// submitted.
pub(crate) async fn amendment_guide_endpoint(
    Json(request): Json<AmendmentGuideRequest>,
) -> impl IntoResponse {
    let registry = AmendmentRegistry::standard();
    let declared = request.details.amendment_type();
    match registry.validate(FilingType::Amendment, Some(declared), Some(&request.details)) {
        Ok(()) => {
            let instructions = registry.derive(&request.details);
            (StatusCode::OK, Json(json!(instructions)))
        }
        Err(err) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "error": err.to_string() })),
        ),
    }
}
