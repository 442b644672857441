//! The amendment type registry: per-type payload validation plus the
//! instructional content agents see for each amendment, derived
//! deterministically from the filing's own data.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;

use super::domain::{AmendmentDetails, AmendmentType, FilingRecord, FilingType};

/// Mileage use limit that triggers a mileage-exceeded amendment.
pub const MILEAGE_LIMIT: u32 = 5_000;
/// Higher limit for agricultural vehicles.
pub const AGRICULTURAL_MILEAGE_LIMIT: u32 = 7_500;

/// Tax consequence surfaced with amendment instructions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaxInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_tax_due: Option<Decimal>,
    pub is_free: bool,
}

/// Agent-facing walkthrough for processing one amendment filing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AmendmentInstructions {
    pub title: String,
    pub description: String,
    pub steps: Vec<String>,
    pub important_notes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax_info: Option<TaxInfo>,
}

/// Static per-type content the derived instructions are built from.
#[derive(Debug, Clone, Copy)]
pub struct AmendmentProfile {
    pub amendment_type: AmendmentType,
    pub title: &'static str,
    pub description: &'static str,
    pub important_notes: &'static [&'static str],
}

/// Payload refusals for amendment submissions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmendmentValidationError {
    #[error("amendment filings must declare an amendment type")]
    MissingType,
    #[error("amendment filings must carry a details payload")]
    MissingDetails,
    #[error("details payload is tagged {found:?} but the filing declares {declared:?}")]
    TypeMismatch {
        declared: AmendmentType,
        found: AmendmentType,
    },
    #[error("amendment fields are only valid on amendment filings")]
    NotAnAmendment,
    #[error("'{0}' is not a valid 17-character VIN")]
    MalformedVin(String),
    #[error("the corrected VIN must differ from the original")]
    VinUnchanged,
    #[error("'{0}' is not a weight category A through V")]
    UnknownCategory(String),
    #[error("new weight category '{new}' must exceed the original '{original}'")]
    CategoryNotIncreased { original: String, new: String },
    #[error("additional tax due may not be negative")]
    NegativeTax,
    #[error("mileage limit {found} does not match the {expected}-mile threshold")]
    WrongMileageLimit { found: u32, expected: u32 },
    #[error("reported mileage {actual} does not exceed the {limit}-mile limit")]
    MileageNotExceeded { actual: u32, limit: u32 },
}

#[derive(Debug)]
pub struct AmendmentRegistry {
    profiles: BTreeMap<AmendmentType, AmendmentProfile>,
}

impl AmendmentRegistry {
    pub fn standard() -> Self {
        let profiles = standard_profiles()
            .into_iter()
            .map(|profile| (profile.amendment_type, profile))
            .collect();
        Self { profiles }
    }

    pub fn profile(&self, amendment_type: AmendmentType) -> &AmendmentProfile {
        self.profiles
            .get(&amendment_type)
            .expect("registry carries every amendment type")
    }

    /// Validate the amendment fields of a submission against its filing type.
    pub fn validate(
        &self,
        filing_type: FilingType,
        declared: Option<AmendmentType>,
        details: Option<&AmendmentDetails>,
    ) -> Result<(), AmendmentValidationError> {
        if filing_type != FilingType::Amendment {
            if declared.is_some() || details.is_some() {
                return Err(AmendmentValidationError::NotAnAmendment);
            }
            return Ok(());
        }

        let declared = declared.ok_or(AmendmentValidationError::MissingType)?;
        let details = details.ok_or(AmendmentValidationError::MissingDetails)?;
        if details.amendment_type() != declared {
            return Err(AmendmentValidationError::TypeMismatch {
                declared,
                found: details.amendment_type(),
            });
        }
        self.validate_payload(details)
    }

    fn validate_payload(&self, details: &AmendmentDetails) -> Result<(), AmendmentValidationError> {
        match details {
            AmendmentDetails::VinCorrection {
                original_vin,
                corrected_vin,
                ..
            } => {
                check_vin(original_vin)?;
                check_vin(corrected_vin)?;
                if original_vin.eq_ignore_ascii_case(corrected_vin) {
                    return Err(AmendmentValidationError::VinUnchanged);
                }
                Ok(())
            }
            AmendmentDetails::WeightIncrease {
                original_category,
                new_category,
                additional_tax_due,
                ..
            } => {
                let original = check_category(original_category)?;
                let new = check_category(new_category)?;
                if new <= original {
                    return Err(AmendmentValidationError::CategoryNotIncreased {
                        original: original_category.clone(),
                        new: new_category.clone(),
                    });
                }
                if additional_tax_due.is_sign_negative() {
                    return Err(AmendmentValidationError::NegativeTax);
                }
                Ok(())
            }
            AmendmentDetails::MileageExceeded {
                mileage_limit,
                actual_mileage,
                agricultural,
                ..
            } => {
                let expected = if *agricultural {
                    AGRICULTURAL_MILEAGE_LIMIT
                } else {
                    MILEAGE_LIMIT
                };
                if *mileage_limit != expected {
                    return Err(AmendmentValidationError::WrongMileageLimit {
                        found: *mileage_limit,
                        expected,
                    });
                }
                if actual_mileage <= mileage_limit {
                    return Err(AmendmentValidationError::MileageNotExceeded {
                        actual: *actual_mileage,
                        limit: *mileage_limit,
                    });
                }
                Ok(())
            }
        }
    }

    /// Instructions for a persisted filing. `None` for non-amendment filings
    /// or when the details payload is absent; absence of instructions is a
    /// displayable state, never an error.
    pub fn instructions(&self, filing: &FilingRecord) -> Option<AmendmentInstructions> {
        if filing.filing_type != FilingType::Amendment {
            return None;
        }
        let details = filing.amendment_details.as_ref()?;
        if Some(details.amendment_type()) != filing.amendment_type {
            return None;
        }
        Some(self.derive(details))
    }

    /// Derive instructions straight from a details payload, without a
    /// persisted record. Used by the agent-facing preview surface.
    pub fn derive(&self, details: &AmendmentDetails) -> AmendmentInstructions {
        let profile = self.profile(details.amendment_type());
        let mut notes: Vec<String> = profile
            .important_notes
            .iter()
            .map(|note| (*note).to_string())
            .collect();

        let (steps, tax_info) = match details {
            AmendmentDetails::VinCorrection {
                original_vin,
                corrected_vin,
                ..
            } => {
                let steps = vec![
                    format!("Verify the incorrect VIN {original_vin} against the accepted return."),
                    format!("Confirm the corrected VIN {corrected_vin} against the vehicle title."),
                    "E-file the VIN correction and wait for the stamped Schedule 1.".to_string(),
                    "Issue the corrected Schedule 1 to the customer.".to_string(),
                ];
                let tax = TaxInfo {
                    additional_tax_due: None,
                    is_free: true,
                };
                (steps, Some(tax))
            }
            AmendmentDetails::WeightIncrease {
                original_category,
                new_category,
                increase_month,
                additional_tax_due,
            } => {
                let steps = vec![
                    format!(
                        "Confirm the move from category {original_category} to {new_category} \
                         effective {increase_month}."
                    ),
                    format!("Collect the additional tax due of ${additional_tax_due}."),
                    "E-file the weight increase amendment by the end of the month after the \
                     increase."
                        .to_string(),
                    "Issue the updated Schedule 1 reflecting the new category.".to_string(),
                ];
                let tax = TaxInfo {
                    additional_tax_due: Some(*additional_tax_due),
                    is_free: false,
                };
                (steps, Some(tax))
            }
            AmendmentDetails::MileageExceeded {
                mileage_limit,
                actual_mileage,
                agricultural,
                exceeded_month,
            } => {
                if *agricultural {
                    notes.push(
                        "Agricultural vehicle: the higher 7,500-mile limit applies.".to_string(),
                    );
                }
                let steps = vec![
                    format!(
                        "Confirm the vehicle exceeded the {mileage_limit}-mile limit in \
                         {exceeded_month} ({actual_mileage} miles reported)."
                    ),
                    "Compute the full-year tax now due for the vehicle's weight category."
                        .to_string(),
                    "E-file the mileage amendment by the end of the month after the limit was \
                     exceeded."
                        .to_string(),
                    "Issue the updated Schedule 1 once the IRS accepts the amendment.".to_string(),
                ];
                let tax = TaxInfo {
                    additional_tax_due: None,
                    is_free: false,
                };
                (steps, Some(tax))
            }
        };

        AmendmentInstructions {
            title: profile.title.to_string(),
            description: profile.description.to_string(),
            steps,
            important_notes: notes,
            tax_info,
        }
    }

    /// One-line summary for at-a-glance display and clipboard exports. Total
    /// over every filing type.
    pub fn summarize(&self, filing: &FilingRecord) -> String {
        match (&filing.filing_type, &filing.amendment_details) {
            (FilingType::Amendment, Some(AmendmentDetails::VinCorrection {
                original_vin,
                corrected_vin,
                ..
            })) => {
                format!("VIN correction: {original_vin} -> {corrected_vin} (no additional tax due)")
            }
            (FilingType::Amendment, Some(AmendmentDetails::WeightIncrease {
                original_category,
                new_category,
                increase_month,
                additional_tax_due,
            })) => format!(
                "Weight increase: category {original_category} -> {new_category} in \
                 {increase_month}, additional tax due ${additional_tax_due}"
            ),
            (FilingType::Amendment, Some(AmendmentDetails::MileageExceeded {
                mileage_limit,
                actual_mileage,
                agricultural,
                exceeded_month,
            })) => {
                let fleet = if *agricultural { "agricultural vehicle" } else { "vehicle" };
                format!(
                    "Mileage exceeded: {fleet} passed {mileage_limit} miles in {exceeded_month} \
                     ({actual_mileage} reported), full-year tax now due"
                )
            }
            (FilingType::Amendment, None) => "Form 2290 Amendment (details pending)".to_string(),
            (FilingType::Mcs150, _) => {
                let usdot = filing
                    .mcs150
                    .as_ref()
                    .map(|details| details.usdot_number.as_str())
                    .unwrap_or("unknown");
                format!("MCS-150 update for USDOT {usdot}")
            }
            (FilingType::Standard, _) => {
                format!("Form 2290 covering {} vehicle(s)", filing.vehicle_ids.len())
            }
        }
    }
}

impl Default for AmendmentRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

fn check_vin(vin: &str) -> Result<(), AmendmentValidationError> {
    let valid = vin.len() == 17
        && vin
            .chars()
            .all(|c| c.is_ascii_alphanumeric() && !matches!(c, 'I' | 'O' | 'Q' | 'i' | 'o' | 'q'));
    if valid {
        Ok(())
    } else {
        Err(AmendmentValidationError::MalformedVin(vin.to_string()))
    }
}

fn check_category(category: &str) -> Result<char, AmendmentValidationError> {
    let mut chars = category.chars();
    match (chars.next(), chars.next()) {
        (Some(letter), None) if ('A'..='V').contains(&letter) => Ok(letter),
        _ => Err(AmendmentValidationError::UnknownCategory(
            category.to_string(),
        )),
    }
}

fn standard_profiles() -> Vec<AmendmentProfile> {
    vec![
        AmendmentProfile {
            amendment_type: AmendmentType::VinCorrection,
            title: "Process a VIN correction",
            description: "Fix a mistyped VIN on an already-accepted Form 2290 so the \
                          Schedule 1 matches the vehicle title.",
            important_notes: &[
                "VIN corrections are free; never collect tax for them.",
                "The original return must already be accepted before correcting.",
            ],
        },
        AmendmentProfile {
            amendment_type: AmendmentType::WeightIncrease,
            title: "Process a taxable gross weight increase",
            description: "Report a vehicle that moved into a higher weight category during \
                          the tax period and collect the prorated additional tax.",
            important_notes: &[
                "The amendment is due by the last day of the month after the increase.",
                "The additional tax is prorated from the month of the increase.",
            ],
        },
        AmendmentProfile {
            amendment_type: AmendmentType::MileageExceeded,
            title: "Process a mileage use limit exceedance",
            description: "Report a previously suspended vehicle that passed its mileage use \
                          limit; the full-year tax becomes due.",
            important_notes: &[
                "Suspended vehicles owe the full-year tax once the limit is passed.",
                "The amendment is due by the last day of the month after the exceedance.",
            ],
        },
    ]
}
