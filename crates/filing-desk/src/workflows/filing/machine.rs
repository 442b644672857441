//! Legal status edges for both lifecycle tracks.
//!
//! Every status change in the engine funnels through these checks; nothing
//! else is allowed to write the status fields.

use super::domain::{ActorRole, FilingStatus, FilingType, Mcs150Status};

/// Refusals produced by the transition checks.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("no transition from {from:?} to {to:?}")]
    InvalidTransition {
        from: FilingStatus,
        to: FilingStatus,
    },
    #[error("no transition from {from:?} to {to:?} on the mcs150 track")]
    InvalidMcs150Transition {
        from: Mcs150Status,
        to: Mcs150Status,
    },
    #[error("entering action_required requires a rejection reason")]
    MissingRejectionReason,
    #[error("a filing cannot complete before its proof document is issued")]
    MissingProofArtifact,
    #[error("{0:?} may not change filing status")]
    RoleNotPermitted(ActorRole),
    #[error("{0:?} filings do not use this status track")]
    WrongTrack(FilingType),
}

/// Edge table for the primary (standard/amendment) track. `Completed` is
/// terminal; `ActionRequired` is reachable from `Submitted` or `Processing`
/// and leaves back to `Processing` or forward to `Completed`.
pub const fn primary_edge(from: FilingStatus, to: FilingStatus) -> bool {
    use FilingStatus::*;
    matches!(
        (from, to),
        (Submitted, Processing)
            | (Submitted, ActionRequired)
            | (Processing, ActionRequired)
            | (Processing, Completed)
            | (ActionRequired, Processing)
            | (ActionRequired, Completed)
    )
}

/// Edge table for the MCS-150 track: a straight line with no rejection state.
pub const fn mcs150_edge(from: Mcs150Status, to: Mcs150Status) -> bool {
    use Mcs150Status::*;
    matches!((from, to), (Submitted, Processing) | (Processing, Completed))
}

/// Validate a primary-track transition request. Status changes are an agent
/// action; customers act on a filing only through their one-shot response.
pub fn check_primary(
    actor: ActorRole,
    filing_type: FilingType,
    from: FilingStatus,
    to: FilingStatus,
) -> Result<(), TransitionError> {
    if actor != ActorRole::Agent {
        return Err(TransitionError::RoleNotPermitted(actor));
    }
    if filing_type.is_mcs150_track() {
        return Err(TransitionError::WrongTrack(filing_type));
    }
    if !primary_edge(from, to) {
        return Err(TransitionError::InvalidTransition { from, to });
    }
    Ok(())
}

/// Validate an MCS-150 track transition request.
pub fn check_mcs150(
    actor: ActorRole,
    filing_type: FilingType,
    from: Mcs150Status,
    to: Mcs150Status,
) -> Result<(), TransitionError> {
    if actor != ActorRole::Agent {
        return Err(TransitionError::RoleNotPermitted(actor));
    }
    if !filing_type.is_mcs150_track() {
        return Err(TransitionError::WrongTrack(filing_type));
    }
    if !mcs150_edge(from, to) {
        return Err(TransitionError::InvalidMcs150Transition { from, to });
    }
    Ok(())
}
