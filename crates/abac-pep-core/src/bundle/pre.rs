// crates/abac-pep-core/src/bundle/pre.rs
// ============================================================================
// Module: Pre-Enforcement Bundle
// Description: Handlers run before the protected call.
// Purpose: Fire on-decision side effects and rewrite call arguments.
// Dependencies: crate::providers, crate::resolution
// ============================================================================

//! ## Overview
//! [`PreEnforceBundle`] holds the runnables and argument consumers resolved
//! for the pre phase.
//! Invariants:
//! - Handlers run in resolution order.
//! - Runnable failures propagate unchanged; argument consumer failures become
//!   access denials.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::error::AccessDenied;
use crate::error::EnforcementError;
use crate::providers::ArgumentHandler;
use crate::providers::ArgumentMap;
use crate::providers::RunnableHandler;
use crate::resolution::Resolution;

// ============================================================================
// SECTION: Bundle
// ============================================================================

/// Resolved pre-phase handlers for one call.
pub struct PreEnforceBundle {
    /// On-decision side effects.
    on_decision: Vec<RunnableHandler>,
    /// Argument consumers.
    method_invocation: Vec<ArgumentHandler>,
}

impl PreEnforceBundle {
    /// Takes the pre-phase handlers out of a resolution.
    pub(crate) fn from_resolution(resolution: Resolution) -> Self {
        Self {
            on_decision: resolution.runnables,
            method_invocation: resolution.argument_handlers,
        }
    }

    /// Runs every on-decision side effect.
    ///
    /// # Errors
    ///
    /// Returns [`EnforcementError::Handler`] with the first failure.
    pub fn handle_on_decision_constraints(&self) -> Result<(), EnforcementError> {
        for handler in &self.on_decision {
            handler().map_err(EnforcementError::Handler)?;
        }
        Ok(())
    }

    /// Runs every argument consumer against the call arguments.
    ///
    /// # Errors
    ///
    /// Returns [`EnforcementError::AccessDenied`] wrapping the first failure.
    pub fn handle_method_invocation_handlers(
        &self,
        arguments: &mut ArgumentMap,
    ) -> Result<(), EnforcementError> {
        for handler in &self.method_invocation {
            handler(arguments).map_err(|err| {
                AccessDenied::with_cause("Failed to apply argument constraint", err)
            })?;
        }
        Ok(())
    }

    /// Returns true when argument consumers were resolved.
    #[must_use]
    pub fn has_method_invocation_handlers(&self) -> bool {
        !self.method_invocation.is_empty()
    }
}
