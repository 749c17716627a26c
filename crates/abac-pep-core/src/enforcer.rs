// crates/abac-pep-core/src/enforcer.rs
// ============================================================================
// Module: Constraint Enforcer
// Description: Builds enforcement bundles from decisions.
// Purpose: Enforce that every obligation has a handler before anything runs.
// Dependencies: crate::bundle, crate::registry, crate::resolution, serde
// ============================================================================

//! ## Overview
//! [`ConstraintEnforcer`] turns a [`Decision`] into a bundle for one call.
//! Bundle construction resolves the decision's obligations and advice and
//! refuses access when any obligation is left unhandled.
//! Invariants:
//! - Unhandled obligations fail construction before any handler body runs.
//! - A resource replacement is rejected in the pre phase and substitutes the
//!   call result in the post phase.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::audit::EnforcementAuditEvent;
use crate::audit::EnforcementAuditSink;
use crate::audit::EnforcementOutcome;
use crate::audit::NoopAuditSink;
use crate::bundle::AnyPostEnforceBundle;
use crate::bundle::CollectionResult;
use crate::bundle::ElementResult;
use crate::bundle::PostEnforceBundle;
use crate::bundle::PreEnforceBundle;
use crate::bundle::post::to_result_value;
use crate::decision::Decision;
use crate::decision::EnforcementPhase;
use crate::error::AccessDenied;
use crate::error::EnforcementError;
use crate::registry::ConstraintRegistry;
use crate::resolution::Resolution;
use crate::resolution::resolve;

// ============================================================================
// SECTION: Enforcer
// ============================================================================

/// Builds bundles against a shared registry.
#[derive(Clone)]
pub struct ConstraintEnforcer {
    /// Registered providers.
    registry: Arc<ConstraintRegistry>,
    /// Destination for enforcement audit records.
    audit: Arc<dyn EnforcementAuditSink>,
}

impl ConstraintEnforcer {
    /// Creates an enforcer that discards audit records.
    #[must_use]
    pub fn new(registry: Arc<ConstraintRegistry>) -> Self {
        Self {
            registry,
            audit: Arc::new(NoopAuditSink),
        }
    }

    /// Replaces the audit sink.
    #[must_use]
    pub fn with_audit_sink(mut self, audit: Arc<dyn EnforcementAuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Returns the registry.
    #[must_use]
    pub fn registry(&self) -> &ConstraintRegistry {
        &self.registry
    }

    /// Returns the audit sink.
    #[must_use]
    pub fn audit_sink(&self) -> &Arc<dyn EnforcementAuditSink> {
        &self.audit
    }

    /// Resolves a decision for a phase without building a bundle.
    #[must_use]
    pub fn resolve(&self, decision: &Decision, phase: EnforcementPhase) -> Resolution {
        resolve(&decision.obligations, &decision.advice, &self.registry, phase)
    }

    /// Builds the pre-phase bundle.
    ///
    /// # Errors
    ///
    /// Returns [`EnforcementError::AccessDenied`] when the decision carries a
    /// resource replacement or an obligation has no handler.
    pub fn pre_enforce_bundle_for(
        &self,
        decision: &Decision,
    ) -> Result<PreEnforceBundle, EnforcementError> {
        if decision.resource_replacement.is_some() {
            let denial = AccessDenied::with_detail(
                "Pre-enforcement cannot replace the method return value",
            );
            self.record_denial(EnforcementPhase::Pre, decision, &denial);
            return Err(denial.into());
        }
        let resolution = self.checked_resolution(decision, EnforcementPhase::Pre)?;
        Ok(PreEnforceBundle::from_resolution(resolution))
    }

    /// Builds a post-phase bundle, choosing the shape from the result value.
    ///
    /// # Errors
    ///
    /// Returns [`EnforcementError::AccessDenied`] when an obligation has no
    /// handler.
    pub fn post_enforce_bundle_for(
        &self,
        result: Value,
        decision: &Decision,
    ) -> Result<AnyPostEnforceBundle, EnforcementError> {
        let resolution = self.checked_resolution(decision, EnforcementPhase::Post)?;
        let result = decision.resource_replacement.clone().unwrap_or(result);
        Ok(AnyPostEnforceBundle::from_resolution(result, resolution))
    }

    /// Builds an element-shaped post bundle for a typed result.
    ///
    /// # Errors
    ///
    /// Returns [`EnforcementError::AccessDenied`] when the result cannot be
    /// serialized or an obligation has no handler.
    pub fn post_enforce_element_bundle_for<T: Serialize + ?Sized>(
        &self,
        result: &T,
        decision: &Decision,
    ) -> Result<PostEnforceBundle<ElementResult>, EnforcementError> {
        let value = to_result_value(result)?;
        let resolution = self.checked_resolution(decision, EnforcementPhase::Post)?;
        let value = decision.resource_replacement.clone().unwrap_or(value);
        Ok(PostEnforceBundle::from_resolution(ElementResult::new(value), resolution))
    }

    /// Builds a collection-shaped post bundle from any iterable of results.
    ///
    /// # Errors
    ///
    /// Returns [`EnforcementError::AccessDenied`] when an element cannot be
    /// serialized or an obligation has no handler.
    pub fn post_enforce_collection_bundle_for<I>(
        &self,
        results: I,
        decision: &Decision,
    ) -> Result<PostEnforceBundle<CollectionResult>, EnforcementError>
    where
        I: IntoIterator,
        I::Item: Serialize,
    {
        let mut items = results
            .into_iter()
            .map(|item| to_result_value(&item))
            .collect::<Result<Vec<_>, _>>()?;
        let resolution = self.checked_resolution(decision, EnforcementPhase::Post)?;
        if let Some(replacement) = &decision.resource_replacement {
            items = match replacement {
                Value::Array(replaced) => replaced.clone(),
                other => vec![other.clone()],
            };
        }
        Ok(PostEnforceBundle::from_resolution(CollectionResult::new(items), resolution))
    }

    /// Resolves and fails on unhandled obligations.
    fn checked_resolution(
        &self,
        decision: &Decision,
        phase: EnforcementPhase,
    ) -> Result<Resolution, EnforcementError> {
        let resolution = self.resolve(decision, phase);
        if !resolution.is_complete() {
            let denial = AccessDenied::unhandled_obligations(resolution.unhandled());
            tracing::warn!(
                phase = phase.as_str(),
                unhandled = resolution.unhandled().len(),
                "denying access: obligation without handler"
            );
            self.record_denial(phase, decision, &denial);
            return Err(denial.into());
        }
        Ok(resolution)
    }

    /// Emits a bundle-construction denial to the audit sink.
    fn record_denial(&self, phase: EnforcementPhase, decision: &Decision, denial: &AccessDenied) {
        self.audit.record(&EnforcementAuditEvent::new(
            phase,
            decision.verdict,
            EnforcementOutcome::BundleRejected,
            Some(denial.to_string()),
        ));
    }
}
