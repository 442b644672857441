use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use rust_decimal::Decimal;

use crate::workflows::filing::documents::{
    AgentAuthError, AgentIdentity, AgentVerifier, DocumentStore, DocumentStoreError,
    DocumentUpload, StoredDocument,
};
use crate::workflows::filing::domain::{
    AmendmentDetails, AmendmentType, Business, BusinessId, FilingId, FilingRecord, FilingStatus,
    FilingSubmission, FilingType, Mcs150Details, ReferenceDirectory, Vehicle, VehicleId,
};
use crate::workflows::filing::repository::{FilingRepository, RepositoryError};
use crate::workflows::filing::service::FilingWorkflowService;

pub(super) const FRESH_TOKEN: &str = "agent-token-fresh";
pub(super) const EXPIRED_TOKEN: &str = "agent-token-expired";

pub(super) type TestService =
    FilingWorkflowService<MemoryRepository, MemoryDocumentStore, StaticAgentVerifier>;

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    records: Arc<Mutex<HashMap<FilingId, FilingRecord>>>,
}

impl FilingRepository for MemoryRepository {
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

#[derive(Default, Clone)]
pub(super) struct MemoryDocumentStore {
    uploads: Arc<Mutex<Vec<DocumentUpload>>>,
    failure: Arc<Mutex<Option<DocumentStoreError>>>,
}

impl MemoryDocumentStore {
    pub(super) fn uploads(&self) -> Vec<DocumentUpload> {
        self.uploads.lock().expect("upload mutex poisoned").clone()
    }

    pub(super) fn fail_with(&self, error: DocumentStoreError) {
        *self.failure.lock().expect("failure mutex poisoned") = Some(error);
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn store(
        &self,
        upload: DocumentUpload,
        _bearer_token: &str,
    ) -> Result<StoredDocument, DocumentStoreError> {
        if let Some(error) = self.failure.lock().expect("failure mutex poisoned").clone() {
            return Err(error);
        }
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

/// Verifier with one fresh and one expired token; anything else is invalid.
#[derive(Default, Clone)]
pub(super) struct StaticAgentVerifier;

impl AgentVerifier for StaticAgentVerifier {
    fn verify(&self, bearer_token: &str) -> Result<AgentIdentity, AgentAuthError> {
        match bearer_token {
            FRESH_TOKEN => Ok(AgentIdentity {
                agent_id: "agent-7".to_string(),
                display_name: "Reviewing Agent".to_string(),
            }),
            EXPIRED_TOKEN => Err(AgentAuthError::Expired),
            _ => Err(AgentAuthError::Invalid),
        }
    }
}

#[derive(Default)]
pub(super) struct StaticDirectory {
    vehicles: HashMap<VehicleId, Vehicle>,
    businesses: HashMap<BusinessId, Business>,
}

impl StaticDirectory {
    pub(super) fn seeded() -> Self {
        let mut vehicles = HashMap::new();
        vehicles.insert(
            VehicleId("veh-001".to_string()),
            Vehicle {
                id: VehicleId("veh-001".to_string()),
                vin: "1XKWDB0X57J211825".to_string(),
                weight_category: "K".to_string(),
                logging: false,
            },
        );
        vehicles.insert(
            VehicleId("veh-002".to_string()),
            Vehicle {
                id: VehicleId("veh-002".to_string()),
                vin: "1FUJGLDR2CSBF4960".to_string(),
                weight_category: "M".to_string(),
                logging: true,
            },
        );

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

impl ReferenceDirectory for StaticDirectory {
    fn vehicle(&self, id: &VehicleId) -> Option<Vehicle> {
        self.vehicles.get(id).cloned()
    }

    fn business(&self, id: &BusinessId) -> Option<Business> {
        self.businesses.get(id).cloned()
    }
}

pub(super) fn build_service() -> (
    TestService,
    Arc<MemoryRepository>,
    Arc<MemoryDocumentStore>,
) {
    let repository = Arc::new(MemoryRepository::default());
    let documents = Arc::new(MemoryDocumentStore::default());
    let service = FilingWorkflowService::new(
        repository.clone(),
        documents.clone(),
        Arc::new(StaticAgentVerifier),
        Arc::new(StaticDirectory::seeded()),
    );
    (service, repository, documents)
}

pub(super) fn standard_submission() -> FilingSubmission {
    FilingSubmission {
        filing_type: FilingType::Standard,
        business_id: Some(BusinessId("biz-001".to_string())),
        vehicle_ids: vec![
            VehicleId("veh-001".to_string()),
            VehicleId("veh-002".to_string()),
        ],
        amendment_type: None,
        amendment_details: None,
        amendment_due_date: None,
        input_documents: vec!["mem://inputs/cab-card.pdf".to_string()],
        mcs150: None,
    }
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

pub(super) fn vin_correction_submission() -> FilingSubmission {
    FilingSubmission {
        filing_type: FilingType::Amendment,
        business_id: Some(BusinessId("biz-001".to_string())),
        vehicle_ids: Vec::new(),
        amendment_type: Some(AmendmentType::VinCorrection),
        amendment_details: Some(AmendmentDetails::VinCorrection {
            original_vin: "1XKWDB0X57J211825".to_string(),
            corrected_vin: "1XKWDB0X57J211826".to_string(),
            vehicle_id: Some(VehicleId("veh-001".to_string())),
        }),
        amendment_due_date: None,
        input_documents: Vec::new(),
        mcs150: None,
    }
}

pub(super) fn mileage_exceeded_submission(agricultural: bool) -> FilingSubmission {
    let limit = if agricultural { 7_500 } else { 5_000 };
    FilingSubmission {
        filing_type: FilingType::Amendment,
        business_id: None,
        vehicle_ids: vec![VehicleId("veh-002".to_string())],
        amendment_type: Some(AmendmentType::MileageExceeded),
        amendment_details: Some(AmendmentDetails::MileageExceeded {
            mileage_limit: limit,
            actual_mileage: limit + 1_120,
            agricultural,
            exceeded_month: "2025-10".to_string(),
        }),
        amendment_due_date: None,
        input_documents: Vec::new(),
        mcs150: None,
    }
}

pub(super) fn mcs150_submission() -> FilingSubmission {
    FilingSubmission {
        filing_type: FilingType::Mcs150,
        business_id: Some(BusinessId("biz-001".to_string())),
        vehicle_ids: Vec::new(),
        amendment_type: None,
        amendment_details: None,
        amendment_due_date: None,
        input_documents: Vec::new(),
        mcs150: Some(Mcs150Details {
            usdot_number: "1234567".to_string(),
            pin: None,
            need_pin_service: true,
            data: Default::default(),
        }),
    }
}

pub(super) fn pdf_bytes() -> Vec<u8> {
    b"%PDF-1.7 stamped schedule 1".to_vec()
}
