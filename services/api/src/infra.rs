use std::collections::HashMap;
use std::env;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use metrics_exporter_prometheus::PrometheusHandle;

use filing_desk::workflows::filing::{
    AgentAuthError, AgentIdentity, AgentVerifier, Business, BusinessId, DocumentStore,
    DocumentStoreError, DocumentUpload, FilingId, FilingRecord, FilingRepository, FilingStatus,
    ReferenceDirectory, RepositoryError, StoredDocument, Vehicle, VehicleId,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryFilingRepository {
    records: Arc<Mutex<HashMap<FilingId, FilingRecord>>>,
}

impl FilingRepository for InMemoryFilingRepository {
    fn insert(&self, record: FilingRecord) -> Result<FilingRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&record.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn update(&self, record: FilingRecord) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&record.id) {
            guard.insert(record.id.clone(), record);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    fn fetch(&self, id: &FilingId) -> Result<Option<FilingRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn by_status(
        &self,
        status: FilingStatus,
        limit: usize,
    ) -> Result<Vec<FilingRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .filter(|record| record.status == status)
            .take(limit)
            .cloned()
            .collect())
    }
}

/// Development stand-in for the external object store: uploads are kept in
/// memory and addressed with deterministic `mem://` URLs.
#[derive(Default, Clone)]
pub(crate) struct InMemoryDocumentStore {
    uploads: Arc<Mutex<Vec<DocumentUpload>>>,
}

impl DocumentStore for InMemoryDocumentStore {
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
        self.uploads
            .lock()
            .expect("upload mutex poisoned")
            .push(upload);
        Ok(StoredDocument { url })
    }
}

/// Shared-secret verifier for development and the demo. Each call compares
/// against the configured token; nothing is cached between calls.
#[derive(Clone)]
pub(crate) struct SharedSecretVerifier {
    token: String,
}

impl SharedSecretVerifier {
    pub(crate) fn from_env() -> Self {
        let token = env::var("AGENT_API_TOKEN").unwrap_or_else(|_| "dev-agent-token".to_string());
        Self { token }
    }

    pub(crate) fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl AgentVerifier for SharedSecretVerifier {
    fn verify(&self, bearer_token: &str) -> Result<AgentIdentity, AgentAuthError> {
        if bearer_token == self.token {
            Ok(AgentIdentity {
                agent_id: "agent-desk".to_string(),
                display_name: "Filing Desk Agent".to_string(),
            })
        } else {
            Err(AgentAuthError::Invalid)
        }
    }
}

/// Seeded reference data so the demo and development server resolve real
/// vehicles and a business without an external entity store.
#[derive(Default)]
pub(crate) struct SeededDirectory {
    vehicles: HashMap<VehicleId, Vehicle>,
    businesses: HashMap<BusinessId, Business>,
}

impl SeededDirectory {
    pub(crate) fn standard() -> Self {
        let mut vehicles = HashMap::new();
        for (id, vin, category, logging) in [
            ("veh-001", "1XKWDB0X57J211825", "K", false),
            ("veh-002", "1FUJGLDR2CSBF4960", "M", true),
            ("veh-003", "3AKJHHDR1JSJV5628", "V", false),
        ] {
            vehicles.insert(
                VehicleId(id.to_string()),
                Vehicle {
                    id: VehicleId(id.to_string()),
                    vin: vin.to_string(),
                    weight_category: category.to_string(),
                    logging,
                },
            );
        }

        let mut businesses = HashMap::new();
        businesses.insert(
            BusinessId("biz-001".to_string()),
            Business {
                id: BusinessId("biz-001".to_string()),
                name: "Prairie Haulage LLC".to_string(),
                ein: "12-3456789".to_string(),
            },
        );

        Self {
            vehicles,
            businesses,
        }
    }
}

impl ReferenceDirectory for SeededDirectory {
    fn vehicle(&self, id: &VehicleId) -> Option<Vehicle> {
        self.vehicles.get(id).cloned()
    }

    fn business(&self, id: &BusinessId) -> Option<Business> {
        self.businesses.get(id).cloned()
    }
}
