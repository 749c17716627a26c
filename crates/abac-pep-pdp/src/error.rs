// crates/abac-pep-pdp/src/error.rs
// ============================================================================
// Module: PDP Client Errors
// Description: Failure taxonomy for PDP transport and decoding.
// Purpose: Keep transport failures separate from enforcement denials.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! [`PdpError`] covers everything that can go wrong talking to the PDP. These
//! errors never reach callers as denials: streaming channels recover by
//! reconnecting and one-shot calls downgrade to `INDETERMINATE`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

// ============================================================================
// SECTION: Types
// ============================================================================

/// PDP client errors.
///
/// # Invariants
/// - Variants are stable for logging and tests.
/// - String payloads may include untrusted server text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PdpError {
    /// The request could not be sent or the connection broke.
    #[error("pdp transport error: {0}")]
    Transport(String),
    /// The PDP answered with a non-success status.
    #[error("pdp returned http status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Trimmed response body preview.
        body: String,
    },
    /// A message could not be decoded into a decision.
    #[error("pdp message decode error: {0}")]
    Decode(String),
    /// The configured endpoint is not a usable URI.
    #[error("invalid pdp uri: {0}")]
    InvalidUri(String),
}

impl PdpError {
    /// Returns true for per-message decode failures that do not end a stream.
    #[must_use]
    pub const fn is_decode(&self) -> bool {
        matches!(self, Self::Decode(_))
    }
}
