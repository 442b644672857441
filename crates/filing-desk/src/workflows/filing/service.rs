use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use mime::Mime;
use tracing::info;

use super::amendments::{AmendmentRegistry, AmendmentValidationError};
use super::documents::{
    self, AgentAuthError, AgentVerifier, DocumentKind, DocumentStore, DocumentStoreError,
    DocumentUpload, DocumentValidationError,
};
use super::domain::{
    ActorRole, FilingId, FilingRecord, FilingStatus, FilingSubmission, FilingType,
    InvariantViolation, Mcs150Status, ReferenceDirectory,
};
use super::machine::{self, TransitionError};
use super::rejection::RejectionCatalog;
use super::repository::{FilingRepository, RepositoryError};
use super::view::{self, FilingDetailView, FilingStatusView};
use super::watch::{FilingWatchRegistry, FilingWatcher};

/// Explicit agent override of the resolved rejection code or required action.
/// The catalog stays the source of the resolved values; an override is the
/// auditable escape hatch for agent judgment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RejectionOverride {
    pub code: Option<String>,
    pub required_action: Option<String>,
}

impl RejectionOverride {
    pub fn is_empty(&self) -> bool {
        self.code.is_none() && self.required_action.is_none()
    }
}

/// Service composing the status machine, catalogs, document coordination,
/// and change fan-out over a filing repository.
pub struct FilingWorkflowService<R, S, V> {
    repository: Arc<R>,
    documents: Arc<S>,
    agents: Arc<V>,
    directory: Arc<dyn ReferenceDirectory>,
    rejections: RejectionCatalog,
    amendments: AmendmentRegistry,
    watchers: FilingWatchRegistry,
    record_locks: Mutex<HashMap<FilingId, Arc<Mutex<()>>>>,
}

static FILING_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_filing_id() -> FilingId {
    let id = FILING_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    FilingId(format!("filing-{id:06}"))
}

impl<R, S, V> FilingWorkflowService<R, S, V>
where
    R: FilingRepository + 'static,
    S: DocumentStore + 'static,
    V: AgentVerifier + 'static,
{
    pub fn new(
        repository: Arc<R>,
        documents: Arc<S>,
        agents: Arc<V>,
        directory: Arc<dyn ReferenceDirectory>,
    ) -> Self {
        Self {
            repository,
            documents,
            agents,
            directory,
            rejections: RejectionCatalog::standard(),
            amendments: AmendmentRegistry::standard(),
            watchers: FilingWatchRegistry::new(),
            record_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn rejection_catalog(&self) -> &RejectionCatalog {
        &self.rejections
    }

    pub fn amendment_registry(&self) -> &AmendmentRegistry {
        &self.amendments
    }

    /// Intake a new filing. Amendment payloads are validated and timestamps
    /// have already been normalized at the deserialization boundary.
    pub fn submit(
        &self,
        submission: FilingSubmission,
    ) -> Result<FilingRecord, FilingServiceError> {
        self.amendments.validate(
            submission.filing_type,
            submission.amendment_type,
            submission.amendment_details.as_ref(),
        )?;

        let now = Utc::now();
        let mcs150_status = submission
            .filing_type
            .is_mcs150_track()
            .then_some(Mcs150Status::Submitted);
        let record = FilingRecord {
            id: next_filing_id(),
            filing_type: submission.filing_type,
            status: FilingStatus::Submitted,
            business_id: submission.business_id,
            vehicle_ids: submission.vehicle_ids,
            amendment_type: submission.amendment_type,
            amendment_details: submission.amendment_details,
            amendment_due_date: submission.amendment_due_date,
            rejection_reason_id: None,
            rejection_code: None,
            required_action: None,
            rejection_reason_label: None,
            agent_notes: None,
            customer_response: None,
            input_documents: submission.input_documents,
            final_schedule1_url: None,
            mcs150_status,
            mcs150: submission.mcs150,
            mcs150_confirmation_url: None,
            created_at: now,
            updated_at: now,
        };
        record.check_invariants()?;

        let stored = self.repository.insert(record)?;
        info!(filing = %stored.id, filing_type = ?stored.filing_type, "filing submitted");
        Ok(stored)
    }

    /// Move a filing along the primary track. Agent-only. Entering
    /// `action_required` resolves the supplied reason through the catalog and
    /// populates the rejection fields plus a notes seed; leaving it keeps the
    /// rejection fields in place as the filing's audit trail.
    pub fn transition_status(
        &self,
        id: &FilingId,
        actor: ActorRole,
        new_status: FilingStatus,
        rejection_reason_id: Option<&str>,
    ) -> Result<FilingRecord, FilingServiceError> {
        let (record, _) = self.mutate(id, |record| {
            machine::check_primary(actor, record.filing_type, record.status, new_status)?;

            if new_status == FilingStatus::Completed && record.final_schedule1_url.is_none() {
                return Err(TransitionError::MissingProofArtifact.into());
            }

            if new_status == FilingStatus::ActionRequired {
                let reason_id =
                    rejection_reason_id.ok_or(TransitionError::MissingRejectionReason)?;
                let reason = self.rejections.resolve(reason_id).ok_or_else(|| {
                    FilingServiceError::UnknownRejectionReason(reason_id.to_string())
                })?;
                record.rejection_reason_id = Some(reason.id.to_string());
                record.rejection_code = Some(reason.code.to_string());
                record.required_action = Some(reason.default_action.to_string());
                record.rejection_reason_label = Some(reason.label.to_string());
                if record.agent_notes.as_deref().map_or(true, str::is_empty) {
                    record.agent_notes = Some(reason.template.to_string());
                }
            }

            record.status = new_status;
            Ok(())
        })?;

        info!(filing = %record.id, status = ?record.status, "filing status changed");
        Ok(record)
    }

    /// Move a filing along the MCS-150 track. Agent-only; completion happens
    /// through `attach_document`, which issues the confirmation artifact.
    pub fn transition_mcs150_status(
        &self,
        id: &FilingId,
        actor: ActorRole,
        new_status: Mcs150Status,
    ) -> Result<FilingRecord, FilingServiceError> {
        let (record, _) = self.mutate(id, |record| {
            let current = record
                .mcs150_status
                .unwrap_or(Mcs150Status::Submitted);
            machine::check_mcs150(actor, record.filing_type, current, new_status)?;
            if new_status == Mcs150Status::Completed && record.mcs150_confirmation_url.is_none() {
                return Err(TransitionError::MissingProofArtifact.into());
            }
            record.mcs150_status = Some(new_status);
            Ok(())
        })?;

        info!(filing = %record.id, status = ?record.mcs150_status, "mcs150 status changed");
        Ok(record)
    }

    /// Record the customer's one-shot reply to an `action_required` filing.
    /// Never changes status: an agent must re-evaluate and transition
    /// explicitly, so a customer action cannot silently clear a compliance
    /// issue.
    pub fn record_customer_response(
        &self,
        id: &FilingId,
        text: Option<String>,
        file_url: Option<String>,
    ) -> Result<FilingRecord, FilingServiceError> {
        let text = text.filter(|value| !value.trim().is_empty());
        let file_url = file_url.filter(|value| !value.trim().is_empty());
        if text.is_none() && file_url.is_none() {
            return Err(FilingServiceError::EmptyCustomerResponse);
        }

        let (record, _) = self.mutate(id, |record| {
            if record.status != FilingStatus::ActionRequired {
                return Err(FilingServiceError::NotAwaitingCustomer);
            }
            record.customer_response = Some(super::domain::CustomerResponse {
                text: text.clone(),
                file_url: file_url.clone(),
                submitted_at: Utc::now(),
            });
            Ok(())
        })?;

        info!(filing = %record.id, "customer response recorded");
        Ok(record)
    }

    /// Persist agent notes. While the filing sits in `action_required` the
    /// current rejection fields (and any explicit override) land in the same
    /// write as the notes, so the two can never diverge.
    pub fn save_agent_notes(
        &self,
        id: &FilingId,
        notes: String,
        rejection_override: Option<RejectionOverride>,
    ) -> Result<FilingRecord, FilingServiceError> {
        let (record, _) = self.mutate(id, |record| {
            if let Some(overridden) = &rejection_override {
                if !overridden.is_empty() && record.status != FilingStatus::ActionRequired {
                    return Err(FilingServiceError::NotAwaitingCustomer);
                }
                if let Some(code) = &overridden.code {
                    record.rejection_code = Some(code.clone());
                }
                if let Some(action) = &overridden.required_action {
                    record.required_action = Some(action.clone());
                }
            }
            record.agent_notes = Some(notes.clone());
            Ok(())
        })?;

        info!(filing = %record.id, "agent notes saved");
        Ok(record)
    }

    /// Attach a proof-of-completion artifact and advance the filing's track
    /// to completed in one write. The agent credential is re-verified on
    /// every call; the storage hand-off happens outside the record lock and
    /// the state is re-checked before committing, so a raced filing surfaces
    /// the winner's state and a storage failure leaves the record untouched.
    pub fn attach_document(
        &self,
        id: &FilingId,
        kind: DocumentKind,
        media_type: &Mime,
        bytes: Vec<u8>,
        bearer_token: &str,
    ) -> Result<FilingRecord, FilingServiceError> {
        let identity = self.agents.verify(bearer_token)?;
        documents::validate_upload(kind, media_type, &bytes)?;

        let current = self.fetch_required(id)?;
        check_attachable(&current, kind)?;

        let stored = self.documents.store(
            DocumentUpload {
                filing_id: id.clone(),
                kind,
                media_type: media_type.to_string(),
                bytes,
            },
            bearer_token,
        )?;

        let (record, _) = self.mutate(id, |record| {
            check_attachable(record, kind)?;
            match kind {
                DocumentKind::FinalSchedule1 => {
                    record.final_schedule1_url = Some(stored.url.clone());
                    record.status = FilingStatus::Completed;
                }
                DocumentKind::Mcs150Confirmation => {
                    record.mcs150_confirmation_url = Some(stored.url.clone());
                    record.mcs150_status = Some(Mcs150Status::Completed);
                }
            }
            Ok(())
        })?;

        info!(
            filing = %record.id,
            kind = kind.as_str(),
            agent = %identity.agent_id,
            "proof document issued"
        );
        Ok(record)
    }

    pub fn get(&self, id: &FilingId) -> Result<FilingRecord, FilingServiceError> {
        self.fetch_required(id)
    }

    pub fn status_view(&self, id: &FilingId) -> Result<FilingStatusView, FilingServiceError> {
        let record = self.fetch_required(id)?;
        Ok(view::status_view(&record, &self.amendments))
    }

    pub fn detail_view(&self, id: &FilingId) -> Result<FilingDetailView, FilingServiceError> {
        let record = self.fetch_required(id)?;
        Ok(view::detail_view(
            &record,
            &self.amendments,
            &self.rejections,
            self.directory.as_ref(),
        ))
    }

    /// Agent work queue: filings currently in the given status.
    pub fn queue(
        &self,
        status: FilingStatus,
        limit: usize,
    ) -> Result<Vec<FilingRecord>, FilingServiceError> {
        Ok(self.repository.by_status(status, limit)?)
    }

    /// Register a viewer of the filing. The returned watcher yields the
    /// current record immediately and every committed mutation afterwards,
    /// in commit order.
    pub fn subscribe(&self, id: &FilingId) -> Result<FilingWatcher, FilingServiceError> {
        let lock = self.lock_for(id);
        let _guard = lock.lock().expect("record mutex poisoned");
        let record = self.fetch_required(id)?;
        Ok(self.watchers.subscribe(&record))
    }

    /// Release a viewer. Idempotent.
    pub fn unsubscribe(&self, id: &FilingId) {
        self.watchers.unsubscribe(id);
    }

    pub fn subscriber_count(&self, id: &FilingId) -> usize {
        self.watchers.subscriber_count(id)
    }

    fn fetch_required(&self, id: &FilingId) -> Result<FilingRecord, FilingServiceError> {
        self.repository
            .fetch(id)?
            .ok_or_else(|| FilingServiceError::FilingNotFound(id.clone()))
    }

    fn lock_for(&self, id: &FilingId) -> Arc<Mutex<()>> {
        let mut locks = self.record_locks.lock().expect("record lock table poisoned");
        locks.entry(id.clone()).or_default().clone()
    }

    /// Apply one mutation to a filing under its write serialization: fetch,
    /// mutate, commit, publish to viewers. Publishing happens before the
    /// lock is released, so viewers observe mutations in commit order.
    fn mutate<T>(
        &self,
        id: &FilingId,
        apply: impl FnOnce(&mut FilingRecord) -> Result<T, FilingServiceError>,
    ) -> Result<(FilingRecord, T), FilingServiceError> {
        let lock = self.lock_for(id);
        let _guard = lock.lock().expect("record mutex poisoned");

        let mut record = self.fetch_required(id)?;
        let value = apply(&mut record)?;
        record.updated_at = Utc::now();
        self.repository.update(record.clone())?;
        self.watchers.publish(&record);
        Ok((record, value))
    }
}

fn check_attachable(record: &FilingRecord, kind: DocumentKind) -> Result<(), FilingServiceError> {
    match kind {
        DocumentKind::FinalSchedule1 => {
            if record.filing_type.is_mcs150_track() {
                return Err(FilingServiceError::KindMismatch {
                    kind,
                    filing_type: record.filing_type,
                });
            }
            if !machine::primary_edge(record.status, FilingStatus::Completed) {
                return Err(TransitionError::InvalidTransition {
                    from: record.status,
                    to: FilingStatus::Completed,
                }
                .into());
            }
        }
        DocumentKind::Mcs150Confirmation => {
            if !record.filing_type.is_mcs150_track() {
                return Err(FilingServiceError::KindMismatch {
                    kind,
                    filing_type: record.filing_type,
                });
            }
            let current = record.mcs150_status.unwrap_or(Mcs150Status::Submitted);
            if !machine::mcs150_edge(current, Mcs150Status::Completed) {
                return Err(TransitionError::InvalidMcs150Transition {
                    from: current,
                    to: Mcs150Status::Completed,
                }
                .into());
            }
        }
    }
    Ok(())
}

/// Error raised by the filing workflow service.
#[derive(Debug, thiserror::Error)]
pub enum FilingServiceError {
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    Amendment(#[from] AmendmentValidationError),
    #[error(transparent)]
    Document(#[from] DocumentValidationError),
    #[error(transparent)]
    Invariant(#[from] InvariantViolation),
    #[error(transparent)]
    Auth(#[from] AgentAuthError),
    #[error(transparent)]
    Storage(#[from] DocumentStoreError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("filing {0} not found")]
    FilingNotFound(FilingId),
    #[error("rejection reason '{0}' is not in the catalog")]
    UnknownRejectionReason(String),
    #[error("filing is not awaiting customer action")]
    NotAwaitingCustomer,
    #[error("a customer response must include text or a document")]
    EmptyCustomerResponse,
    #[error("{kind:?} does not apply to {filing_type:?} filings")]
    KindMismatch {
        kind: DocumentKind,
        filing_type: FilingType,
    },
}
