use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::timestamp;

/// Identifier wrapper for filings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilingId(pub String);

impl fmt::Display for FilingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier wrapper for vehicles declared on a filing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VehicleId(pub String);

/// Identifier wrapper for the business a filing is submitted under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BusinessId(pub String);

/// The kind of return a filing represents. Immutable after intake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilingType {
    Standard,
    Amendment,
    Mcs150,
}

impl FilingType {
    pub const fn ordered() -> [Self; 3] {
        [Self::Standard, Self::Amendment, Self::Mcs150]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Standard => "Form 2290",
            Self::Amendment => "Form 2290 Amendment",
            Self::Mcs150 => "MCS-150 Update",
        }
    }

    /// Whether the filing tracks status on the MCS-150 sub-machine instead of
    /// the primary track.
    pub const fn is_mcs150_track(self) -> bool {
        matches!(self, Self::Mcs150)
    }
}

/// Primary-track lifecycle status for standard and amendment filings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilingStatus {
    Submitted,
    Processing,
    ActionRequired,
    Completed,
}

impl FilingStatus {
    pub const fn ordered() -> [Self; 4] {
        [
            Self::Submitted,
            Self::Processing,
            Self::ActionRequired,
            Self::Completed,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Submitted => "Submitted",
            Self::Processing => "Processing",
            Self::ActionRequired => "Action Required",
            Self::Completed => "Completed",
        }
    }
}

/// Status sub-machine for the MCS-150 service track. No rejection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mcs150Status {
    Submitted,
    Processing,
    Completed,
}

impl Mcs150Status {
    pub const fn ordered() -> [Self; 3] {
        [Self::Submitted, Self::Processing, Self::Completed]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Submitted => "Submitted",
            Self::Processing => "Processing",
            Self::Completed => "Completed",
        }
    }
}

/// The two parties that act on a filing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Customer,
    Agent,
}

impl ActorRole {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Customer => "Customer",
            Self::Agent => "Agent",
        }
    }
}

/// Post-filing correction categories, each with its own payload shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmendmentType {
    VinCorrection,
    WeightIncrease,
    MileageExceeded,
}

impl AmendmentType {
    pub const fn ordered() -> [Self; 3] {
        [
            Self::VinCorrection,
            Self::WeightIncrease,
            Self::MileageExceeded,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::VinCorrection => "VIN Correction",
            Self::WeightIncrease => "Taxable Gross Weight Increase",
            Self::MileageExceeded => "Mileage Use Limit Exceeded",
        }
    }
}

/// Amendment payload, tagged by amendment type. The tag must always match the
/// filing's declared `amendment_type`; the intake validation refuses records
/// where the two diverge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AmendmentDetails {
    VinCorrection {
        original_vin: String,
        corrected_vin: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        vehicle_id: Option<VehicleId>,
    },
    WeightIncrease {
        original_category: String,
        new_category: String,
        increase_month: String,
        additional_tax_due: Decimal,
    },
    MileageExceeded {
        mileage_limit: u32,
        actual_mileage: u32,
        agricultural: bool,
        exceeded_month: String,
    },
}

impl AmendmentDetails {
    pub const fn amendment_type(&self) -> AmendmentType {
        match self {
            Self::VinCorrection { .. } => AmendmentType::VinCorrection,
            Self::WeightIncrease { .. } => AmendmentType::WeightIncrease,
            Self::MileageExceeded { .. } => AmendmentType::MileageExceeded,
        }
    }

    /// The vehicle referenced by the payload, if the variant carries one.
    pub fn vehicle_id(&self) -> Option<&VehicleId> {
        match self {
            Self::VinCorrection { vehicle_id, .. } => vehicle_id.as_ref(),
            _ => None,
        }
    }
}

/// One-shot customer reply to an `action_required` filing. The timestamp is
/// always server-assigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

/// Carrier data tracked only on the MCS-150 service track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mcs150Details {
    pub usdot_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pin: Option<String>,
    #[serde(default)]
    pub need_pin_service: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub data: BTreeMap<String, serde_json::Value>,
}

/// Read-mostly vehicle reference owned by an external collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: VehicleId,
    pub vin: String,
    pub weight_category: String,
    pub logging: bool,
}

/// Read-mostly business reference owned by an external collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Business {
    pub id: BusinessId,
    pub name: String,
    pub ein: String,
}

/// Lookup seam for the external entity store. Unresolved ids are a normal
/// condition: views drop them rather than fail.
pub trait ReferenceDirectory: Send + Sync {
    fn vehicle(&self, id: &VehicleId) -> Option<Vehicle>;
    fn business(&self, id: &BusinessId) -> Option<Business>;
}

/// The aggregate root of the back-office workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilingRecord {
    pub id: FilingId,
    pub filing_type: FilingType,
    pub status: FilingStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_id: Option<BusinessId>,
    #[serde(default)]
    pub vehicle_ids: Vec<VehicleId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amendment_type: Option<AmendmentType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amendment_details: Option<AmendmentDetails>,
    #[serde(
        default,
        deserialize_with = "timestamp::deserialize_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub amendment_due_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_response: Option<CustomerResponse>,
    #[serde(default)]
    pub input_documents: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_schedule1_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mcs150_status: Option<Mcs150Status>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mcs150: Option<Mcs150Details>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mcs150_confirmation_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FilingRecord {
    /// The proof-of-completion artifact for the filing's track, if issued.
    pub fn proof_artifact(&self) -> Option<&str> {
        if self.filing_type.is_mcs150_track() {
            self.mcs150_confirmation_url.as_deref()
        } else {
            self.final_schedule1_url.as_deref()
        }
    }

    /// Every vehicle id the record references, including the one embedded in
    /// an amendment payload. Order preserved, duplicates removed.
    pub fn referenced_vehicle_ids(&self) -> Vec<VehicleId> {
        let mut ids = self.vehicle_ids.clone();
        if let Some(extra) = self
            .amendment_details
            .as_ref()
            .and_then(AmendmentDetails::vehicle_id)
        {
            if !ids.contains(extra) {
                ids.push(extra.clone());
            }
        }
        ids
    }

    /// Structural invariant check. Run at intake and re-checkable at any
    /// point; the engine never commits a record that fails it.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        match self.filing_type {
            FilingType::Amendment => {
                let declared = self
                    .amendment_type
                    .ok_or(InvariantViolation::MissingAmendmentType)?;
                let details = self
                    .amendment_details
                    .as_ref()
                    .ok_or(InvariantViolation::MissingAmendmentDetails)?;
                if details.amendment_type() != declared {
                    return Err(InvariantViolation::AmendmentTagMismatch {
                        declared,
                        found: details.amendment_type(),
                    });
                }
            }
            FilingType::Standard | FilingType::Mcs150 => {
                if self.amendment_type.is_some() || self.amendment_details.is_some() {
                    return Err(InvariantViolation::AmendmentFieldsOnNonAmendment(
                        self.filing_type,
                    ));
                }
            }
        }

        if self.filing_type.is_mcs150_track() {
            if self.mcs150.is_none() || self.mcs150_status.is_none() {
                return Err(InvariantViolation::MissingMcs150Details);
            }
            if self.mcs150_status == Some(Mcs150Status::Completed)
                && self.mcs150_confirmation_url.is_none()
            {
                return Err(InvariantViolation::CompletedWithoutArtifact(
                    self.filing_type,
                ));
            }
        } else {
            if self.mcs150.is_some() || self.mcs150_status.is_some() {
                return Err(InvariantViolation::Mcs150FieldsOnPrimaryTrack(
                    self.filing_type,
                ));
            }
            if self.status == FilingStatus::ActionRequired && self.rejection_reason_id.is_none() {
                return Err(InvariantViolation::ActionRequiredWithoutReason);
            }
            if self.status == FilingStatus::Completed && self.final_schedule1_url.is_none() {
                return Err(InvariantViolation::CompletedWithoutArtifact(
                    self.filing_type,
                ));
            }
        }

        Ok(())
    }
}

/// Violations of the structural record invariants.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvariantViolation {
    #[error("amendment filings must declare an amendment type")]
    MissingAmendmentType,
    #[error("amendment filings must carry amendment details")]
    MissingAmendmentDetails,
    #[error("details payload is tagged {found:?} but the filing declares {declared:?}")]
    AmendmentTagMismatch {
        declared: AmendmentType,
        found: AmendmentType,
    },
    #[error("{0:?} filings may not carry amendment fields")]
    AmendmentFieldsOnNonAmendment(FilingType),
    #[error("mcs150 filings must carry carrier details and an mcs150 status")]
    MissingMcs150Details,
    #[error("{0:?} filings may not carry mcs150 fields")]
    Mcs150FieldsOnPrimaryTrack(FilingType),
    #[error("a filing in action_required must reference a rejection reason")]
    ActionRequiredWithoutReason,
    #[error("a completed {0:?} filing must carry its proof document")]
    CompletedWithoutArtifact(FilingType),
}

/// Intake payload for a new filing. Timestamps are normalized here, at the
/// boundary, before the record is constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilingSubmission {
    pub filing_type: FilingType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_id: Option<BusinessId>,
    #[serde(default)]
    pub vehicle_ids: Vec<VehicleId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amendment_type: Option<AmendmentType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amendment_details: Option<AmendmentDetails>,
    #[serde(
        default,
        deserialize_with = "timestamp::deserialize_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub amendment_due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub input_documents: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mcs150: Option<Mcs150Details>,
}
