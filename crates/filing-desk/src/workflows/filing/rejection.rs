//! The rejection taxonomy: an immutable catalog mapping a rejection reason to
//! its authority-issued code, the remedy the customer must perform, and the
//! boilerplate explanation shown to them.
//!
//! Ids are stable and versioned additively. Historical filings reference
//! reasons and actions by id, so existing entries must never change meaning;
//! new entries are appended.

use std::collections::BTreeMap;

use serde::Serialize;

/// A reason an agent can reject a filing with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RejectionReason {
    pub id: &'static str,
    pub label: &'static str,
    pub code: &'static str,
    pub default_action: &'static str,
    pub template: &'static str,
}

/// A remedy the customer performs to clear a rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RequiredAction {
    pub id: &'static str,
    pub label: &'static str,
    pub instructions: &'static str,
}

#[derive(Debug)]
pub struct RejectionCatalog {
    reasons: BTreeMap<&'static str, RejectionReason>,
    actions: BTreeMap<&'static str, RequiredAction>,
}

impl RejectionCatalog {
    pub fn standard() -> Self {
        let reasons = standard_reasons()
            .into_iter()
            .map(|reason| (reason.id, reason))
            .collect();
        let actions = standard_actions()
            .into_iter()
            .map(|action| (action.id, action))
            .collect();
        Self { reasons, actions }
    }

    /// Selecting a reason through `resolve` is the only supported way to
    /// populate a filing's rejection fields.
    pub fn resolve(&self, reason_id: &str) -> Option<&RejectionReason> {
        self.reasons.get(reason_id)
    }

    pub fn required_action(&self, action_id: &str) -> Option<&RequiredAction> {
        self.actions.get(action_id)
    }

    pub fn reasons(&self) -> impl Iterator<Item = &RejectionReason> {
        self.reasons.values()
    }

    pub fn actions(&self) -> impl Iterator<Item = &RequiredAction> {
        self.actions.values()
    }
}

impl Default for RejectionCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

fn standard_reasons() -> Vec<RejectionReason> {
    vec![
        RejectionReason {
            id: "doc_illegible",
            label: "Submitted document is illegible",
            code: "R0000-900-01",
            default_action: "resubmit_document",
            template: "The document you uploaded could not be read clearly enough to process \
                       your return. Please upload a new copy where every field is legible, then \
                       reply to this notice so your agent can continue.",
        },
        RejectionReason {
            id: "ein_name_mismatch",
            label: "EIN and business name do not match IRS records",
            code: "R0000-922-01",
            default_action: "correct_business_details",
            template: "The IRS could not match your EIN to the business name on the return. \
                       Please confirm the EIN and the exact legal name on your CP 575 notice, \
                       correct whichever is wrong, and reply to this notice.",
        },
        RejectionReason {
            id: "ein_too_new",
            label: "EIN is too new for electronic processing",
            code: "R0000-906-02",
            default_action: "wait_and_resubmit",
            template: "Your EIN was issued recently and is not yet in the IRS e-file database. \
                       This usually clears within 15 business days of issuance; we will \
                       resubmit once the waiting period has passed.",
        },
        RejectionReason {
            id: "vin_invalid",
            label: "VIN failed format validation",
            code: "R2290-068-01",
            default_action: "correct_vin",
            template: "One of the VINs on your return is not a valid 17-character vehicle \
                       identification number. Please check the VIN against the vehicle title \
                       or registration and send the corrected value.",
        },
        RejectionReason {
            id: "duplicate_vin",
            label: "VIN already reported on an accepted return for this period",
            code: "R2290-003-01",
            default_action: "contact_support",
            template: "A return for this tax period already reports one of your VINs. If you \
                       did not previously file for this vehicle, contact support so an agent \
                       can investigate before anything is resubmitted.",
        },
        RejectionReason {
            id: "rtn_invalid",
            label: "Bank routing number failed validation",
            code: "R0000-075-02",
            default_action: "update_bank_details",
            template: "The routing number provided for payment did not pass validation. Please \
                       verify the routing and account numbers with your bank and submit the \
                       corrected details.",
        },
        RejectionReason {
            id: "missing_signature",
            label: "Signature authorization missing",
            code: "R0000-902-01",
            default_action: "provide_signature",
            template: "Your return is missing the signature authorization we need before the \
                       IRS will accept it. Please complete and upload the signed authorization \
                       form.",
        },
    ]
}

fn standard_actions() -> Vec<RequiredAction> {
    vec![
        RequiredAction {
            id: "resubmit_document",
            label: "Resubmit document",
            instructions: "Upload a replacement copy of the rejected document.",
        },
        RequiredAction {
            id: "correct_business_details",
            label: "Correct business details",
            instructions: "Confirm the EIN and legal business name, then submit the correction.",
        },
        RequiredAction {
            id: "wait_and_resubmit",
            label: "Wait for IRS records to update",
            instructions: "No customer change needed; the filing is resubmitted after the IRS \
                           waiting period.",
        },
        RequiredAction {
            id: "correct_vin",
            label: "Correct VIN",
            instructions: "Verify the VIN against the title or registration and send the \
                           corrected value.",
        },
        RequiredAction {
            id: "update_bank_details",
            label: "Update bank details",
            instructions: "Provide corrected routing and account numbers for payment.",
        },
        RequiredAction {
            id: "provide_signature",
            label: "Provide signature authorization",
            instructions: "Complete and upload the signed authorization form.",
        },
        RequiredAction {
            id: "contact_support",
            label: "Contact support",
            instructions: "Reach out to support so an agent can investigate before resubmission.",
        },
    ]
}
