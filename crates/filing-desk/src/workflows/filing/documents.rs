//! Proof-of-completion document handling: upload validation, the agent
//! identity freshness seam, and the gateway to the external object store.

use std::time::Duration;

use mime::Mime;
use serde::{Deserialize, Serialize};
use tokio::runtime::Runtime;

use super::domain::FilingId;

/// The terminal artifacts a filing can carry, one per track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    FinalSchedule1,
    Mcs150Confirmation,
}

impl DocumentKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::FinalSchedule1 => "Stamped Schedule 1",
            Self::Mcs150Confirmation => "MCS-150 Confirmation",
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FinalSchedule1 => "final_schedule1",
            Self::Mcs150Confirmation => "mcs150_confirmation",
        }
    }

    fn accepts(self, media_type: &Mime) -> bool {
        match self {
            // The stamped Schedule 1 is issued by the IRS as a PDF; nothing
            // else is a valid artifact.
            Self::FinalSchedule1 => *media_type == mime::APPLICATION_PDF,
            Self::Mcs150Confirmation => {
                *media_type == mime::APPLICATION_PDF
                    || *media_type == mime::IMAGE_PNG
                    || *media_type == mime::IMAGE_JPEG
            }
        }
    }
}

/// Upload refusals. None of these leave any trace on the filing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DocumentValidationError {
    #[error("uploaded file is empty")]
    EmptyFile,
    #[error("'{0}' is not a media type")]
    MalformedMediaType(String),
    #[error("{kind} uploads do not accept {found}")]
    UnsupportedMediaType { kind: &'static str, found: String },
    #[error("file bytes do not look like a PDF document")]
    NotAPdf,
}

pub fn validate_upload(
    kind: DocumentKind,
    media_type: &Mime,
    bytes: &[u8],
) -> Result<(), DocumentValidationError> {
    if bytes.is_empty() {
        return Err(DocumentValidationError::EmptyFile);
    }
    if !kind.accepts(media_type) {
        return Err(DocumentValidationError::UnsupportedMediaType {
            kind: kind.label(),
            found: media_type.to_string(),
        });
    }
    if *media_type == mime::APPLICATION_PDF && !bytes.starts_with(b"%PDF-") {
        return Err(DocumentValidationError::NotAPdf);
    }
    Ok(())
}

/// Payload handed to the storage collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentUpload {
    pub filing_id: FilingId,
    pub kind: DocumentKind,
    pub media_type: String,
    pub bytes: Vec<u8>,
}

/// Durable location returned by the storage collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StoredDocument {
    pub url: String,
}

/// Storage collaborator failures. Retryable by the caller; the engine never
/// retries or swallows them itself.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DocumentStoreError {
    #[error("document store timed out after {0:?}")]
    Timeout(Duration),
    #[error("document store transport failure: {0}")]
    Transport(String),
    #[error("document store rejected the upload ({status}): {message}")]
    Rejected { status: u16, message: String },
}

/// Gateway to the external object store. Implementations must apply a bounded
/// timeout; a `store` failure means no durable URL exists.
pub trait DocumentStore: Send + Sync {
    fn store(
        &self,
        upload: DocumentUpload,
        bearer_token: &str,
    ) -> Result<StoredDocument, DocumentStoreError>;
}

/// Verified agent identity for compliance-relevant actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentIdentity {
    pub agent_id: String,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AgentAuthError {
    #[error("agent credential has expired")]
    Expired,
    #[error("agent credential is not valid")]
    Invalid,
}

/// Identity seam for document issuance. Implementations must round-trip to
/// the identity provider on every call; verification results are never
/// cached, because issuance is a terminal, compliance-relevant action.
pub trait AgentVerifier: Send + Sync {
    fn verify(&self, bearer_token: &str) -> Result<AgentIdentity, AgentAuthError>;
}

/// HTTP implementation of the storage contract: an authenticated upload that
/// returns `{"url": ...}`. Wraps the async client behind an owned runtime so
/// synchronous workflow code can call it without exposing async details.
pub struct HttpDocumentStore {
    endpoint: String,
    timeout: Duration,
    client: reqwest::Client,
    runtime: Runtime,
}

impl HttpDocumentStore {
    pub fn new(
        endpoint: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, DocumentStoreError> {
        let runtime =
            Runtime::new().map_err(|err| DocumentStoreError::Transport(err.to_string()))?;
        Ok(Self {
            endpoint: endpoint.into(),
            timeout,
            client: reqwest::Client::new(),
            runtime,
        })
    }
}

impl std::fmt::Debug for HttpDocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpDocumentStore")
            .field("endpoint", &self.endpoint)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl DocumentStore for HttpDocumentStore {
    fn store(
        &self,
        upload: DocumentUpload,
        bearer_token: &str,
    ) -> Result<StoredDocument, DocumentStoreError> {
        let url = format!(
            "{}/filings/{}/artifacts/{}",
            self.endpoint.trim_end_matches('/'),
            upload.filing_id,
            upload.kind.as_str()
        );

        let request = self
            .client
            .post(url)
            .bearer_auth(bearer_token)
            .header(reqwest::header::CONTENT_TYPE, upload.media_type.clone())
            .body(upload.bytes);

        self.runtime.block_on(async {
            let response = tokio::time::timeout(self.timeout, request.send())
                .await
                .map_err(|_| DocumentStoreError::Timeout(self.timeout))?
                .map_err(|err| DocumentStoreError::Transport(err.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                let message = response.text().await.unwrap_or_default();
                return Err(DocumentStoreError::Rejected {
                    status: status.as_u16(),
                    message,
                });
            }

            response
                .json::<StoredDocument>()
                .await
                .map_err(|err| DocumentStoreError::Transport(err.to_string()))
        })
    }
}
