//! Presentation views over a filing record: an at-a-glance status snapshot
//! and a full detail view with references resolved.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::amendments::{AmendmentInstructions, AmendmentRegistry};
use super::domain::{
    AmendmentType, Business, CustomerResponse, FilingId, FilingRecord, FilingStatus, FilingType,
    Mcs150Status, ReferenceDirectory, Vehicle,
};
use super::rejection::RejectionCatalog;

/// Sanitized snapshot of a filing's exposed status.
#[derive(Debug, Clone, Serialize)]
pub struct FilingStatusView {
    pub filing_id: FilingId,
    pub filing_type: FilingType,
    pub filing_type_label: &'static str,
    pub status: FilingStatus,
    pub status_label: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mcs150_status: Option<Mcs150Status>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_action: Option<String>,
    pub summary: String,
}

/// Rejection block surfaced while (or after) a filing sat in
/// `action_required`. Retained for audit once the filing moves on.
#[derive(Debug, Clone, Serialize)]
pub struct RejectionView {
    pub reason_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_action_label: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_template: Option<&'static str>,
}

/// Full agent-workstation view of one filing.
#[derive(Debug, Clone, Serialize)]
pub struct FilingDetailView {
    pub filing_id: FilingId,
    pub filing_type: FilingType,
    pub filing_type_label: &'static str,
    pub status: FilingStatus,
    pub status_label: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mcs150_status: Option<Mcs150Status>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business: Option<Business>,
    pub vehicles: Vec<Vehicle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amendment_type: Option<AmendmentType>,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<AmendmentInstructions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection: Option<RejectionView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_response: Option<CustomerResponse>,
    pub input_documents: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_schedule1_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mcs150_confirmation_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amendment_due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub fn status_view(record: &FilingRecord, registry: &AmendmentRegistry) -> FilingStatusView {
    FilingStatusView {
        filing_id: record.id.clone(),
        filing_type: record.filing_type,
        filing_type_label: record.filing_type.label(),
        status: record.status,
        status_label: record.status.label(),
        mcs150_status: record.mcs150_status,
        required_action: record.required_action.clone(),
        summary: registry.summarize(record),
    }
}

pub fn detail_view(
    record: &FilingRecord,
    registry: &AmendmentRegistry,
    catalog: &RejectionCatalog,
    directory: &dyn ReferenceDirectory,
) -> FilingDetailView {
    // Reference ids that no longer resolve are dropped from the view.
    let vehicles = record
        .referenced_vehicle_ids()
        .iter()
        .filter_map(|id| directory.vehicle(id))
        .collect();
    let business = record
        .business_id
        .as_ref()
        .and_then(|id| directory.business(id));

    let rejection = record.rejection_reason_id.as_ref().map(|reason_id| {
        let resolved = catalog.resolve(reason_id);
        RejectionView {
            reason_id: reason_id.clone(),
            code: record.rejection_code.clone(),
            label: record.rejection_reason_label.clone(),
            required_action: record.required_action.clone(),
            required_action_label: record
                .required_action
                .as_deref()
                .and_then(|action| catalog.required_action(action))
                .map(|action| action.label),
            customer_template: resolved.map(|reason| reason.template),
        }
    });

    FilingDetailView {
        filing_id: record.id.clone(),
        filing_type: record.filing_type,
        filing_type_label: record.filing_type.label(),
        status: record.status,
        status_label: record.status.label(),
        mcs150_status: record.mcs150_status,
        business,
        vehicles,
        amendment_type: record.amendment_type,
        summary: registry.summarize(record),
        instructions: registry.instructions(record),
        rejection,
        agent_notes: record.agent_notes.clone(),
        customer_response: record.customer_response.clone(),
        input_documents: record.input_documents.clone(),
        final_schedule1_url: record.final_schedule1_url.clone(),
        mcs150_confirmation_url: record.mcs150_confirmation_url.clone(),
        amendment_due_date: record.amendment_due_date,
        created_at: record.created_at,
        updated_at: record.updated_at,
    }
}
