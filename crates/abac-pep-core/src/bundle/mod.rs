// crates/abac-pep-core/src/bundle/mod.rs
// ============================================================================
// Module: Enforcement Bundles
// Description: Per-call owners of resolved constraint handlers.
// Purpose: Execute handlers against call arguments or call results.
// Dependencies: crate::resolution
// ============================================================================

//! ## Overview
//! A bundle is created for exactly one protected call and discarded when the
//! call completes. [`PreEnforceBundle`] runs before the call; the post bundles
//! run after it, in an element or a collection shape selected by
//! [`AnyPostEnforceBundle`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod post;
pub mod pre;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use post::AnyPostEnforceBundle;
pub use post::CollectionResult;
pub use post::ElementResult;
pub use post::ErrorOutcome;
pub use post::PostEnforceBundle;
pub use post::ResultShape;
pub use pre::PreEnforceBundle;
