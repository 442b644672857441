//! Integration specifications for the filing lifecycle delivered through the
//! public service facade and HTTP router, without reaching into private
//! modules.

mod common {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use rust_decimal::Decimal;

    use filing_desk::workflows::filing::{
        AgentAuthError, AgentIdentity, AgentVerifier, AmendmentDetails, AmendmentType, Business,
        BusinessId, DocumentStore, DocumentStoreError, DocumentUpload, FilingId, FilingRecord,
        FilingRepository, FilingStatus, FilingSubmission, FilingType, FilingWorkflowService,
        ReferenceDirectory, RepositoryError, StoredDocument, Vehicle, VehicleId,
    };

    pub(super) const FRESH_TOKEN: &str = "agent-token-fresh";

    pub(super) type Service =
        FilingWorkflowService<MemoryRepository, MemoryDocumentStore, MemoryVerifier>;

    #[derive(Default, Clone)]
    pub(super) struct MemoryRepository {
        records: Arc<Mutex<HashMap<FilingId, FilingRecord>>>,
        reject_writes: Arc<Mutex<bool>>,
    }

    impl MemoryRepository {
        pub(super) fn reject_writes(&self) {
            *self.reject_writes.lock().expect("flag lock") = true;
        }
    }

    impl FilingRepository for MemoryRepository {
        fn insert(&self, record: FilingRecord) -> Result<FilingRecord, RepositoryError> {
            let mut guard = self.records.lock().expect("lock");
            if guard.contains_key(&record.id) {
                return Err(RepositoryError::Conflict);
            }
            guard.insert(record.id.clone(), record.clone());
            Ok(record)
        }

        fn update(&self, record: FilingRecord) -> Result<(), RepositoryError> {
            if *self.reject_writes.lock().expect("flag lock") {
                return Err(RepositoryError::Unavailable("store offline".to_string()));
            }
            let mut guard = self.records.lock().expect("lock");
            guard.insert(record.id.clone(), record);
            Ok(())
        }

        fn fetch(&self, id: &FilingId) -> Result<Option<FilingRecord>, RepositoryError> {
            let guard = self.records.lock().expect("lock");
            Ok(guard.get(id).cloned())
        }

        fn by_status(
            &self,
            status: FilingStatus,
            limit: usize,
        ) -> Result<Vec<FilingRecord>, RepositoryError> {
            let guard = self.records.lock().expect("lock");
            Ok(guard
                .values()
                .filter(|record| record.status == status)
                .take(limit)
                .cloned()
                .collect())
        }
    }

    #[derive(Default, Clone)]
    pub(super) struct MemoryDocumentStore {
        uploads: Arc<Mutex<Vec<DocumentUpload>>>,
    }

    impl DocumentStore for MemoryDocumentStore {
        fn store(
            &self,
            upload: DocumentUpload,
            _bearer_token: &str,
        ) -> Result<StoredDocument, DocumentStoreError> {
            let url = format!(
                "mem://filings/{}/{}",
                upload.filing_id,
                upload.kind.as_str()
            );
            self.uploads.lock().expect("lock").push(upload);
            Ok(StoredDocument { url })
        }
    }

    #[derive(Default, Clone)]
    pub(super) struct MemoryVerifier;

    impl AgentVerifier for MemoryVerifier {
        fn verify(&self, bearer_token: &str) -> Result<AgentIdentity, AgentAuthError> {
            if bearer_token == FRESH_TOKEN {
                Ok(AgentIdentity {
                    agent_id: "agent-1".to_string(),
                    display_name: "Desk Agent".to_string(),
                })
            } else {
                Err(AgentAuthError::Invalid)
            }
        }
    }

    #[derive(Default)]
    pub(super) struct Directory;

    impl ReferenceDirectory for Directory {
        fn vehicle(&self, id: &VehicleId) -> Option<Vehicle> {
            (id.0 == "veh-001").then(|| Vehicle {
                id: id.clone(),
                vin: "1XKWDB0X57J211825".to_string(),
                weight_category: "K".to_string(),
                logging: false,
            })
        }

        fn business(&self, id: &BusinessId) -> Option<Business> {
            Some(Business {
                id: id.clone(),
                name: "Prairie Haulage LLC".to_string(),
                ein: "12-3456789".to_string(),
            })
        }
    }

    pub(super) fn build_service() -> (Service, Arc<MemoryRepository>) {
        let repository = Arc::new(MemoryRepository::default());
        let service = FilingWorkflowService::new(
            repository.clone(),
            Arc::new(MemoryDocumentStore::default()),
            Arc::new(MemoryVerifier),
            Arc::new(Directory),
        );
        (service, repository)
    }

    pub(super) fn weight_increase_submission() -> FilingSubmission {
        FilingSubmission {
            filing_type: FilingType::Amendment,
            business_id: Some(BusinessId("biz-001".to_string())),
            vehicle_ids: vec![VehicleId("veh-001".to_string())],
            amendment_type: Some(AmendmentType::WeightIncrease),
            amendment_details: Some(AmendmentDetails::WeightIncrease {
                original_category: "K".to_string(),
                new_category: "M".to_string(),
                increase_month: "2025-11".to_string(),
                additional_tax_due: Decimal::new(12500, 2),
            }),
            amendment_due_date: None,
            input_documents: Vec::new(),
            mcs150: None,
        }
    }

    pub(super) fn pdf_base64() -> String {
        use base64::{engine::general_purpose::STANDARD, Engine};
        STANDARD.encode(b"%PDF-1.7 stamped schedule 1")
    }
}

mod lifecycle {
    use super::common::*;
    use filing_desk::workflows::filing::{
        ActorRole, DocumentKind, FilingStatus, RejectionOverride,
    };

    #[tokio::test]
    async fn a_rejected_filing_travels_to_completion() {
        let (service, _) = build_service();
        let filing = service
            .submit(weight_increase_submission())
            .expect("submission accepted");
        assert_eq!(filing.status, FilingStatus::Submitted);

        let mut watcher = service.subscribe(&filing.id).expect("viewer attaches");

        service
            .transition_status(&filing.id, ActorRole::Agent, FilingStatus::Processing, None)
            .expect("agent picks up the filing");
        service
            .transition_status(
                &filing.id,
                ActorRole::Agent,
                FilingStatus::ActionRequired,
                Some("doc_illegible"),
            )
            .expect("agent rejects with a cataloged reason");
        service
            .record_customer_response(
                &filing.id,
                Some("uploaded a fresh scan".to_string()),
                Some("mem://inputs/rescan.pdf".to_string()),
            )
            .expect("customer replies");
        service
            .save_agent_notes(
                &filing.id,
                "Rescan is legible; proceeding.".to_string(),
                Some(RejectionOverride::default()),
            )
            .expect("agent annotates");

        let completed = service
            .attach_document(
                &filing.id,
                DocumentKind::FinalSchedule1,
                &mime::APPLICATION_PDF,
                b"%PDF-1.7 stamped schedule 1".to_vec(),
                FRESH_TOKEN,
            )
            .expect("schedule 1 issued");

        assert_eq!(completed.status, FilingStatus::Completed);
        assert!(completed.final_schedule1_url.is_some());
        // Audit trail survives completion.
        assert_eq!(
            completed.rejection_code.as_deref(),
            Some("R0000-900-01")
        );
        assert!(completed.customer_response.is_some());

        // The viewer converges on the terminal state.
        while watcher.has_changed().expect("channel alive") {
            watcher.borrow_and_update();
        }
        assert_eq!(watcher.borrow().status, FilingStatus::Completed);
        service.unsubscribe(&filing.id);
    }

    #[tokio::test]
    async fn the_agent_queue_lists_filings_by_status() {
        let (service, _) = build_service();
        let first = service
            .submit(weight_increase_submission())
            .expect("first accepted");
        let _second = service
            .submit(weight_increase_submission())
            .expect("second accepted");

        service
            .transition_status(&first.id, ActorRole::Agent, FilingStatus::Processing, None)
            .expect("first picked up");

        let submitted = service
            .queue(FilingStatus::Submitted, 10)
            .expect("queue readable");
        let processing = service
            .queue(FilingStatus::Processing, 10)
            .expect("queue readable");
        assert_eq!(submitted.len(), 1);
        assert_eq!(processing.len(), 1);
        assert_eq!(processing[0].id, first.id);
    }
}

mod routing {
    use super::common::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    use filing_desk::workflows::filing::{filing_router, ActorRole, FilingStatus};

    fn submission_body() -> Vec<u8> {
        serde_json::to_vec(&weight_increase_submission()).expect("serialize submission")
    }

    async fn read_json(response: axum::response::Response) -> Value {
        let body = to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("read body");
        serde_json::from_slice(&body).expect("json payload")
    }

    #[tokio::test]
    async fn post_filings_returns_a_tracking_view() {
        let (service, _) = build_service();
        let router = filing_router(Arc::new(service));

        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/filings")
                    .header("content-type", "application/json")
                    .body(Body::from(submission_body()))
                    .expect("request"),
            )
            .await
            .expect("router dispatch");

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let payload = read_json(response).await;
        assert!(payload.get("filing_id").is_some());
        assert_eq!(
            payload.get("status").and_then(Value::as_str),
            Some("submitted")
        );
        assert!(payload
            .get("summary")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .contains("$125.00"));
    }

    #[tokio::test]
    async fn rejecting_without_a_reason_is_a_conflict() {
        let (service, _) = build_service();
        let service = Arc::new(service);
        let filing = service
            .submit(weight_increase_submission())
            .expect("submission accepted");
        let router = filing_router(service.clone());

        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/api/v1/filings/{}/status", filing.id))
                    .header("content-type", "application/json")
                    .body(Body::from(
                        serde_json::to_vec(&json!({
                            "actor": "agent",
                            "status": "action_required",
                        }))
                        .expect("serialize"),
                    ))
                    .expect("request"),
            )
            .await
            .expect("router dispatch");

        assert_eq!(response.status(), StatusCode::CONFLICT);
        let stored = service.get(&filing.id).expect("filing readable");
        assert_eq!(stored.status, FilingStatus::Submitted);
    }

    #[tokio::test]
    async fn customers_are_forbidden_from_the_status_endpoint() {
        let (service, _) = build_service();
        let service = Arc::new(service);
        let filing = service
            .submit(weight_increase_submission())
            .expect("submission accepted");
        let router = filing_router(service);

        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/api/v1/filings/{}/status", filing.id))
                    .header("content-type", "application/json")
                    .body(Body::from(
                        serde_json::to_vec(&json!({
                            "actor": "customer",
                            "status": "processing",
                        }))
                        .expect("serialize"),
                    ))
                    .expect("request"),
            )
            .await
            .expect("router dispatch");

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn document_uploads_need_a_bearer_credential() {
        let (service, _) = build_service();
        let service = Arc::new(service);
        let filing = service
            .submit(weight_increase_submission())
            .expect("submission accepted");
        service
            .transition_status(&filing.id, ActorRole::Agent, FilingStatus::Processing, None)
            .expect("processing");
        let router = filing_router(service.clone());

        let body = serde_json::to_vec(&json!({
            "kind": "final_schedule1",
            "media_type": "application/pdf",
            "content_base64": pdf_base64(),
        }))
        .expect("serialize");

        let response = router
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/api/v1/filings/{}/documents", filing.id))
                    .header("content-type", "application/json")
                    .body(Body::from(body.clone()))
                    .expect("request"),
            )
            .await
            .expect("router dispatch");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/api/v1/filings/{}/documents", filing.id))
                    .header("content-type", "application/json")
                    .header("authorization", format!("Bearer {FRESH_TOKEN}"))
                    .body(Body::from(body))
                    .expect("request"),
            )
            .await
            .expect("router dispatch");
        assert_eq!(response.status(), StatusCode::OK);

        let payload = read_json(response).await;
        assert_eq!(
            payload.get("status").and_then(Value::as_str),
            Some("completed")
        );
        assert!(payload.get("url").and_then(Value::as_str).is_some());
    }

    #[tokio::test]
    async fn customer_response_failures_stay_generic() {
        let (service, repository) = build_service();
        let service = Arc::new(service);
        let filing = service
            .submit(weight_increase_submission())
            .expect("submission accepted");
        service
            .transition_status(
                &filing.id,
                ActorRole::Agent,
                FilingStatus::ActionRequired,
                Some("doc_illegible"),
            )
            .expect("rejection");

        repository.reject_writes();
        let router = filing_router(service);

        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/api/v1/filings/{}/response", filing.id))
                    .header("content-type", "application/json")
                    .body(Body::from(
                        serde_json::to_vec(&json!({ "text": "resubmitted" })).expect("serialize"),
                    ))
                    .expect("request"),
            )
            .await
            .expect("router dispatch");

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let payload = read_json(response).await;
        let message = payload
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or_default();
        // The customer never sees repository or storage detail.
        assert!(message.contains("try again"));
        assert!(!message.contains("offline"));
    }

    #[tokio::test]
    async fn detail_endpoint_resolves_references() {
        let (service, _) = build_service();
        let service = Arc::new(service);
        let filing = service
            .submit(weight_increase_submission())
            .expect("submission accepted");
        let router = filing_router(service);

        let response = router
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri(format!("/api/v1/filings/{}/detail", filing.id))
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router dispatch");

        assert_eq!(response.status(), StatusCode::OK);
        let payload = read_json(response).await;
        let vehicles = payload
            .get("vehicles")
            .and_then(Value::as_array)
            .expect("vehicles present");
        assert_eq!(vehicles.len(), 1);
        assert!(payload.get("instructions").is_some());
        assert_eq!(
            payload
                .pointer("/instructions/tax_info/additional_tax_due")
                .and_then(Value::as_str),
            Some("125.00")
        );
    }
}
