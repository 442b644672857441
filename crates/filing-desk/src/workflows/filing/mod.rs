//! Filing lifecycle and amendment workflow engine.
//!
//! Every status change funnels through [`service::FilingWorkflowService`];
//! the surrounding modules supply the legal-edge tables, the rejection and
//! amendment catalogs, document issuance, and the per-filing change fan-out.

pub mod amendments;
pub mod documents;
pub mod domain;
pub mod machine;
pub mod rejection;
pub mod repository;
pub mod router;
pub mod service;
pub mod timestamp;
pub mod view;
pub mod watch;

#[cfg(test)]
mod tests;

pub use amendments::{
    AmendmentInstructions, AmendmentRegistry, AmendmentValidationError, TaxInfo,
    AGRICULTURAL_MILEAGE_LIMIT, MILEAGE_LIMIT,
};
pub use documents::{
    AgentAuthError, AgentIdentity, AgentVerifier, DocumentKind, DocumentStore, DocumentStoreError,
    DocumentUpload, DocumentValidationError, HttpDocumentStore, StoredDocument,
};
pub use domain::{
    ActorRole, AmendmentDetails, AmendmentType, Business, BusinessId, CustomerResponse, FilingId,
    FilingRecord, FilingStatus, FilingSubmission, FilingType, InvariantViolation, Mcs150Details,
    Mcs150Status, ReferenceDirectory, Vehicle, VehicleId,
};
pub use machine::TransitionError;
pub use rejection::{RejectionCatalog, RejectionReason, RequiredAction};
pub use repository::{FilingRepository, RepositoryError};
pub use router::filing_router;
pub use service::{FilingServiceError, FilingWorkflowService, RejectionOverride};
pub use view::{FilingDetailView, FilingStatusView, RejectionView};
pub use watch::{FilingWatchRegistry, FilingWatcher};
