use super::domain::{FilingId, FilingRecord, FilingStatus};

/// Storage abstraction for filing records so the workflow engine can be
/// exercised in isolation. The record is the unit of mutual exclusion; the
/// service layer serializes writers per filing id before calling `update`.
pub trait FilingRepository: Send + Sync {
    fn insert(&self, record: FilingRecord) -> Result<FilingRecord, RepositoryError>;
    fn update(&self, record: FilingRecord) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &FilingId) -> Result<Option<FilingRecord>, RepositoryError>;
    fn by_status(
        &self,
        status: FilingStatus,
        limit: usize,
    ) -> Result<Vec<FilingRecord>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
