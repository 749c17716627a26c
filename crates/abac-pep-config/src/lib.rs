// crates/abac-pep-config/src/lib.rs
// ============================================================================
// Module: ABAC PEP Config Library
// Description: Canonical config model and strict validation.
// Purpose: Single source of truth for abac-pep.toml semantics.
// Dependencies: abac-pep-core, abac-pep-pdp, serde, toml
// ============================================================================

//! ## Overview
//! `abac-pep-config` defines the configuration model for the enforcement
//! client: how to reach the PDP and where enforcement audit records go. It
//! provides strict, fail-closed validation and converts validated settings
//! into PDP client settings and audit sinks.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::AbacPepConfig;
pub use config::AuditConfig;
pub use config::CONFIG_ENV_VAR;
pub use config::ConfigError;
pub use config::PdpConfig;
