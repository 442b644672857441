//! Back-office workflow engine for Heavy Vehicle Use Tax filings.
//!
//! The crate is organized around the filing lifecycle: intake, agent review,
//! conditional rejection with a required customer remedy, amendment handling,
//! proof-of-completion document issuance, and live change notification for
//! every active viewer of a filing.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
