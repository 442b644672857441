use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::Deserialize;
use serde_json::json;

use super::documents::{AgentVerifier, DocumentKind, DocumentStore, DocumentValidationError};
use super::domain::{ActorRole, FilingId, FilingStatus, FilingSubmission, Mcs150Status};
use super::machine::TransitionError;
use super::repository::{FilingRepository, RepositoryError};
use super::service::{FilingServiceError, FilingWorkflowService, RejectionOverride};

/// Router builder exposing the back-office HTTP endpoints for filings.
pub fn filing_router<R, S, V>(service: Arc<FilingWorkflowService<R, S, V>>) -> Router
where
    R: FilingRepository + 'static,
    S: DocumentStore + 'static,
    V: AgentVerifier + 'static,
{
    Router::new()
        .route("/api/v1/filings", post(submit_handler::<R, S, V>))
        .route(
            "/api/v1/filings/:filing_id",
            get(status_handler::<R, S, V>),
        )
        .route(
            "/api/v1/filings/:filing_id/detail",
            get(detail_handler::<R, S, V>),
        )
        .route(
            "/api/v1/filings/:filing_id/status",
            post(transition_handler::<R, S, V>),
        )
        .route(
            "/api/v1/filings/:filing_id/mcs150-status",
            post(mcs150_transition_handler::<R, S, V>),
        )
        .route(
            "/api/v1/filings/:filing_id/response",
            post(customer_response_handler::<R, S, V>),
        )
        .route(
            "/api/v1/filings/:filing_id/notes",
            put(notes_handler::<R, S, V>),
        )
        .route(
            "/api/v1/filings/:filing_id/documents",
            post(attach_document_handler::<R, S, V>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct TransitionRequest {
    pub(crate) actor: ActorRole,
    pub(crate) status: FilingStatus,
    #[serde(default)]
    pub(crate) rejection_reason_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Mcs150TransitionRequest {
    pub(crate) actor: ActorRole,
    pub(crate) status: Mcs150Status,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CustomerResponseRequest {
    #[serde(default)]
    pub(crate) text: Option<String>,
    #[serde(default)]
    pub(crate) file_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NotesRequest {
    pub(crate) notes: String,
    #[serde(default)]
    pub(crate) rejection_code: Option<String>,
    #[serde(default)]
    pub(crate) required_action: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AttachDocumentRequest {
    pub(crate) kind: DocumentKind,
    pub(crate) media_type: String,
    pub(crate) content_base64: String,
}

pub(crate) async fn submit_handler<R, S, V>(
    State(service): State<Arc<FilingWorkflowService<R, S, V>>>,
    axum::Json(submission): axum::Json<FilingSubmission>,
) -> Response
where
    R: FilingRepository + 'static,
    S: DocumentStore + 'static,
    V: AgentVerifier + 'static,
{
    match service.submit(submission) {
        Ok(record) => {
            let view = super::view::status_view(&record, service.amendment_registry());
            (StatusCode::ACCEPTED, axum::Json(view)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn status_handler<R, S, V>(
    State(service): State<Arc<FilingWorkflowService<R, S, V>>>,
    Path(filing_id): Path<String>,
) -> Response
where
    R: FilingRepository + 'static,
    S: DocumentStore + 'static,
    V: AgentVerifier + 'static,
{
    let id = FilingId(filing_id);
    match service.status_view(&id) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn detail_handler<R, S, V>(
    State(service): State<Arc<FilingWorkflowService<R, S, V>>>,
    Path(filing_id): Path<String>,
) -> Response
where
    R: FilingRepository + 'static,
    S: DocumentStore + 'static,
    V: AgentVerifier + 'static,
{
    let id = FilingId(filing_id);
    match service.detail_view(&id) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn transition_handler<R, S, V>(
    State(service): State<Arc<FilingWorkflowService<R, S, V>>>,
    Path(filing_id): Path<String>,
    axum::Json(request): axum::Json<TransitionRequest>,
) -> Response
where
    R: FilingRepository + 'static,
    S: DocumentStore + 'static,
    V: AgentVerifier + 'static,
{
    let id = FilingId(filing_id);
    match service.transition_status(
        &id,
        request.actor,
        request.status,
        request.rejection_reason_id.as_deref(),
    ) {
        Ok(record) => {
            let view = super::view::status_view(&record, service.amendment_registry());
            (StatusCode::OK, axum::Json(view)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn mcs150_transition_handler<R, S, V>(
    State(service): State<Arc<FilingWorkflowService<R, S, V>>>,
    Path(filing_id): Path<String>,
    axum::Json(request): axum::Json<Mcs150TransitionRequest>,
) -> Response
where
    R: FilingRepository + 'static,
    S: DocumentStore + 'static,
    V: AgentVerifier + 'static,
{
    let id = FilingId(filing_id);
    match service.transition_mcs150_status(&id, request.actor, request.status) {
        Ok(record) => {
            let view = super::view::status_view(&record, service.amendment_registry());
            (StatusCode::OK, axum::Json(view)).into_response()
        }
        Err(err) => error_response(err),
    }
}

/// Customer-facing endpoint. Error bodies are deliberately generic: the
/// customer only learns that the action failed and whether to retry, never
/// internal catalog or storage detail.
pub(crate) async fn customer_response_handler<R, S, V>(
    State(service): State<Arc<FilingWorkflowService<R, S, V>>>,
    Path(filing_id): Path<String>,
    axum::Json(request): axum::Json<CustomerResponseRequest>,
) -> Response
where
    R: FilingRepository + 'static,
    S: DocumentStore + 'static,
    V: AgentVerifier + 'static,
{
    let id = FilingId(filing_id);
    match service.record_customer_response(&id, request.text, request.file_url) {
        Ok(record) => {
            let view = super::view::status_view(&record, service.amendment_registry());
            (StatusCode::OK, axum::Json(view)).into_response()
        }
        Err(FilingServiceError::EmptyCustomerResponse) => {
            let payload = json!({ "error": "include a message or a document with your response" });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
        Err(FilingServiceError::NotAwaitingCustomer) => {
            let payload = json!({ "error": "this filing is not awaiting a response" });
            (StatusCode::CONFLICT, axum::Json(payload)).into_response()
        }
        Err(FilingServiceError::FilingNotFound(_)) => {
            let payload = json!({ "error": "filing not found" });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        Err(_) => {
            let payload = json!({ "error": "unable to record your response, please try again" });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn notes_handler<R, S, V>(
    State(service): State<Arc<FilingWorkflowService<R, S, V>>>,
    Path(filing_id): Path<String>,
    axum::Json(request): axum::Json<NotesRequest>,
) -> Response
where
    R: FilingRepository + 'static,
    S: DocumentStore + 'static,
    V: AgentVerifier + 'static,
{
    let id = FilingId(filing_id);
    let rejection_override = RejectionOverride {
        code: request.rejection_code,
        required_action: request.required_action,
    };
    let rejection_override =
        (!rejection_override.is_empty()).then_some(rejection_override);
    match service.save_agent_notes(&id, request.notes, rejection_override) {
        Ok(record) => {
            let view = super::view::status_view(&record, service.amendment_registry());
            (StatusCode::OK, axum::Json(view)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn attach_document_handler<R, S, V>(
    State(service): State<Arc<FilingWorkflowService<R, S, V>>>,
    Path(filing_id): Path<String>,
    headers: HeaderMap,
    axum::Json(request): axum::Json<AttachDocumentRequest>,
) -> Response
where
    R: FilingRepository + 'static,
    S: DocumentStore + 'static,
    V: AgentVerifier + 'static,
{
    let Some(token) = bearer_token(&headers) else {
        let payload = json!({ "error": "missing bearer credential" });
        return (StatusCode::UNAUTHORIZED, axum::Json(payload)).into_response();
    };

    let media_type: mime::Mime = match request.media_type.parse() {
        Ok(parsed) => parsed,
        Err(_) => {
            return error_response(
                DocumentValidationError::MalformedMediaType(request.media_type).into(),
            )
        }
    };
    let bytes = match BASE64.decode(request.content_base64.as_bytes()) {
        Ok(bytes) => bytes,
        Err(_) => {
            let payload = json!({ "error": "content_base64 is not valid base64" });
            return (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response();
        }
    };

    let id = FilingId(filing_id);
    let kind = request.kind;
    // The store hand-off blocks on the external collaborator; run it off the
    // async worker.
    let task = tokio::task::spawn_blocking(move || {
        service.attach_document(&id, kind, &media_type, bytes, &token)
    });
    let result = match task.await {
        Ok(result) => result,
        Err(join_err) => {
            let payload = json!({ "error": format!("upload task failed: {join_err}") });
            return (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response();
        }
    };

    match result {
        Ok(record) => {
            let payload = json!({
                "filing_id": record.id,
                "status": record.status,
                "mcs150_status": record.mcs150_status,
                "url": record.proof_artifact(),
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_string)
}

fn error_response(err: FilingServiceError) -> Response {
    let status = match &err {
        FilingServiceError::FilingNotFound(_)
        | FilingServiceError::UnknownRejectionReason(_) => StatusCode::NOT_FOUND,
        FilingServiceError::Transition(TransitionError::RoleNotPermitted(_)) => {
            StatusCode::FORBIDDEN
        }
        FilingServiceError::Transition(_) | FilingServiceError::NotAwaitingCustomer => {
            StatusCode::CONFLICT
        }
        FilingServiceError::Amendment(_)
        | FilingServiceError::Document(_)
        | FilingServiceError::Invariant(_)
        | FilingServiceError::EmptyCustomerResponse
        | FilingServiceError::KindMismatch { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        FilingServiceError::Auth(_) => StatusCode::UNAUTHORIZED,
        FilingServiceError::Storage(_) => StatusCode::BAD_GATEWAY,
        FilingServiceError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        FilingServiceError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let payload = json!({ "error": err.to_string() });
    (status, axum::Json(payload)).into_response()
}
