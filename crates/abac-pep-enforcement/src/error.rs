// crates/abac-pep-enforcement/src/error.rs
// ============================================================================
// Module: Enforcement Point Errors
// Description: Errors surfaced to the host layer and their denial payloads.
// Purpose: Give interception layers one error type and one response shape.
// Dependencies: abac-pep-core, serde, thiserror
// ============================================================================

//! ## Overview
//! [`PepError`] is what a guarded call sees when enforcement refuses it.
//! [`DenialPayload`] is the structured response a host layer returns for it.
//! Invariants:
//! - A mapped error is surfaced unchanged; everything else is a denial.
//! - Every denial payload carries status 401.

// ============================================================================
// SECTION: Imports
// ============================================================================

use abac_pep_core::AccessDenied;
use abac_pep_core::BoxError;
use abac_pep_core::EnforcementError;
use abac_pep_core::TransformValueError;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Status code carried by every denial payload.
pub const DENIAL_STATUS: u16 = 401;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Failure of an enforced call.
#[derive(Debug, Error)]
pub enum PepError {
    /// Enforcement refused access.
    #[error(transparent)]
    AccessDenied(#[from] AccessDenied),
    /// A transformation action carried malformed parameters.
    #[error(transparent)]
    TransformValue(#[from] TransformValueError),
    /// The error chain translated a handler failure.
    #[error("{0}")]
    Mapped(BoxError),
}

impl PepError {
    /// Returns true when access was refused.
    #[must_use]
    pub const fn is_access_denied(&self) -> bool {
        matches!(self, Self::AccessDenied(_))
    }

    /// Returns the payload a host layer should answer with.
    #[must_use]
    pub fn denial_payload(&self) -> DenialPayload {
        DenialPayload::new(self.to_string())
    }
}

impl From<EnforcementError> for PepError {
    fn from(error: EnforcementError) -> Self {
        match error {
            EnforcementError::AccessDenied(denial) => Self::AccessDenied(denial),
            EnforcementError::TransformValue(error) => Self::TransformValue(error),
            EnforcementError::Handler(cause) => {
                Self::AccessDenied(AccessDenied::with_cause("Failed to enforce decision", cause))
            }
        }
    }
}

// ============================================================================
// SECTION: Payload
// ============================================================================

/// Structured denial returned to the caller of a guarded endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DenialPayload {
    /// HTTP-equivalent status.
    pub status: u16,
    /// Human-readable reason.
    pub detail: String,
}

impl DenialPayload {
    /// Creates a payload with [`DENIAL_STATUS`].
    #[must_use]
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            status: DENIAL_STATUS,
            detail: detail.into(),
        }
    }
}
