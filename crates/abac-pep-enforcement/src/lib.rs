// crates/abac-pep-enforcement/src/lib.rs
// ============================================================================
// Module: ABAC PEP Enforcement Library
// Description: Pre and post enforcement points for host interception layers.
// Purpose: Turn decisions into allow/deny answers and filtered results.
// Dependencies: abac-pep-core, abac-pep-pdp, serde, tracing
// ============================================================================

//! ## Overview
//! A host layer wraps a guarded call with [`PreEnforcementPoint`] before it
//! runs and [`PostEnforcementPoint`] after it returns. Both consult a
//! [`abac_pep_pdp::PolicyDecisionPoint`] and delegate constraint handling to
//! an [`abac_pep_core::ConstraintEnforcer`]. Refusals surface as
//! [`PepError`], which renders to a [`DenialPayload`].
//!
//! Security posture: every path that cannot prove a `PERMIT` fails closed.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod error;
pub mod post;
pub mod pre;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use error::DENIAL_STATUS;
pub use error::DenialPayload;
pub use error::PepError;
pub use post::PostEnforcementPoint;
pub use pre::PreEnforcementPoint;
