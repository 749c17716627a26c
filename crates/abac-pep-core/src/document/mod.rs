// crates/abac-pep-core/src/document/mod.rs
// ============================================================================
// Module: Structured Document Filtering
// Description: Path selectors, content transformation, and JSON providers.
// Purpose: Rewrite call results addressed by path expressions.
// Dependencies: jsonpath_lib, serde, serde_json
// ============================================================================

//! ## Overview
//! Document filtering works on generic JSON trees rather than concrete types.
//! [`path`] selects nodes by location, [`transform`] applies replace, blacken,
//! and delete actions, and [`providers`] exposes both as constraint handler
//! providers.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod path;
pub mod providers;
pub mod transform;
