// crates/abac-pep-enforcement/src/post.rs
// ============================================================================
// Module: Post-Enforcement Point
// Description: Authorizes and filters the result of a guarded call.
// Purpose: Fetch a decision, enforce it on the result, and map failures.
// Dependencies: abac-pep-core, abac-pep-pdp, serde_json, tracing
// ============================================================================

//! ## Overview
//! [`PostEnforcementPoint`] runs after a guarded call has produced its
//! result. The result is released only under a `PERMIT` verdict and only
//! after every resolved constraint has been applied to it.
//! Invariants:
//! - A null result is passed through without consulting the PDP.
//! - Any failure after the bundle is built runs the error chain; a mapped
//!   error is surfaced as-is, unmapped malformed transformation parameters
//!   stay a validation failure, anything else becomes a denial.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use abac_pep_core::AccessDenied;
use abac_pep_core::AnyPostEnforceBundle;
use abac_pep_core::ConstraintEnforcer;
use abac_pep_core::Decision;
use abac_pep_core::EnforcementAuditEvent;
use abac_pep_core::EnforcementError;
use abac_pep_core::EnforcementOutcome;
use abac_pep_core::EnforcementPhase;
use abac_pep_core::ErrorOutcome;
use abac_pep_core::Subscription;
use abac_pep_core::Verdict;
use abac_pep_pdp::PolicyDecisionPoint;
use serde_json::Value;

use crate::error::PepError;

// ============================================================================
// SECTION: Enforcement Point
// ============================================================================

/// Enforcement point run on the result of a guarded call.
pub struct PostEnforcementPoint {
    /// Constraint resolution and bundle construction.
    enforcer: Arc<ConstraintEnforcer>,
}

impl PostEnforcementPoint {
    /// Creates an enforcement point.
    #[must_use]
    pub const fn new(enforcer: Arc<ConstraintEnforcer>) -> Self {
        Self {
            enforcer,
        }
    }

    /// Decides `subscription` through `pdp` and enforces the decision on
    /// `result`.
    ///
    /// # Errors
    ///
    /// Returns [`PepError`] when the result must not be released.
    pub async fn enforce(
        &self,
        pdp: &PolicyDecisionPoint,
        subscription: &Subscription,
        result: Value,
    ) -> Result<Value, PepError> {
        if result.is_null() {
            return Ok(Value::Null);
        }
        let decision = pdp.decide(subscription).await;
        self.enforce_decision(subscription, Some(&decision), result)
    }

    /// Enforces an already obtained decision on `result`.
    ///
    /// # Errors
    ///
    /// Returns [`PepError::AccessDenied`] for missing decisions, bundle
    /// failures, non-`PERMIT` verdicts, and unmapped handler failures,
    /// [`PepError::TransformValue`] when an unmapped failure came from
    /// malformed transformation parameters, and [`PepError::Mapped`] when the
    /// error chain translated a failure.
    pub fn enforce_decision(
        &self,
        subscription: &Subscription,
        decision: Option<&Decision>,
        result: Value,
    ) -> Result<Value, PepError> {
        if result.is_null() {
            return Ok(Value::Null);
        }
        let short_id = subscription.short_id();
        let Some(decision) = decision else {
            tracing::error!(subscription = %short_id, "access denied by PEP: decision is missing");
            let denial = AccessDenied::with_detail("No decision available");
            self.record(
                &short_id,
                Verdict::Indeterminate,
                EnforcementOutcome::Denied,
                Some(&denial),
            );
            return Err(denial.into());
        };
        tracing::debug!(
            subscription = %short_id,
            verdict = %decision.verdict,
            "post-enforcing decision"
        );
        let mut bundle =
            self.enforcer.post_enforce_bundle_for(result, decision).map_err(|err| {
                AccessDenied::with_cause("Failed to construct bundle", err.into_boxed())
            })?;
        match apply(&mut bundle, decision) {
            Ok(value) => {
                self.record::<AccessDenied>(
                    &short_id,
                    decision.verdict,
                    EnforcementOutcome::Permitted,
                    None,
                );
                Ok(value)
            }
            Err(error) => {
                let outcome = if error.is_access_denied() && !decision.is_permit() {
                    EnforcementOutcome::Denied
                } else {
                    EnforcementOutcome::FailedUnmapped
                };
                let invalid_transform = match &error {
                    EnforcementError::TransformValue(invalid) => Some(invalid.clone()),
                    _ => None,
                };
                let handled = bundle.handle_all_on_error_constraints(error.into_boxed());
                match (handled, invalid_transform) {
                    (ErrorOutcome::Mapped(mapped), _) => {
                        tracing::warn!(
                            subscription = %short_id,
                            error = %mapped,
                            "enforcement failure was mapped"
                        );
                        self.record(
                            &short_id,
                            decision.verdict,
                            EnforcementOutcome::FailedMapped,
                            Some(&mapped),
                        );
                        Err(PepError::Mapped(mapped))
                    }
                    (ErrorOutcome::Unmapped(_), Some(invalid)) => {
                        tracing::warn!(
                            subscription = %short_id,
                            error = %invalid,
                            "content transformation rejected its parameters"
                        );
                        self.record(&short_id, decision.verdict, outcome, Some(&invalid));
                        Err(invalid.into())
                    }
                    (ErrorOutcome::Unmapped(cause), None) => {
                        let denial = AccessDenied::with_cause("Failed to enforce decision", cause);
                        self.record(&short_id, decision.verdict, outcome, Some(&denial));
                        Err(denial.into())
                    }
                }
            }
        }
    }

    /// Emits an audit event for this point.
    fn record<D: ToString + ?Sized>(
        &self,
        short_id: &str,
        verdict: Verdict,
        outcome: EnforcementOutcome,
        detail: Option<&D>,
    ) {
        self.enforcer.audit_sink().record(
            &EnforcementAuditEvent::new(
                EnforcementPhase::Post,
                verdict,
                outcome,
                detail.map(ToString::to_string),
            )
            .with_subscription_id(short_id),
        );
    }
}

/// Runs on-decision handlers, checks the verdict, then consumers and
/// result constraints.
fn apply(bundle: &mut AnyPostEnforceBundle, decision: &Decision) -> Result<Value, EnforcementError> {
    bundle.handle_on_decision_constraints()?;
    if !decision.is_permit() {
        return Err(AccessDenied::with_detail("Access denied by PDP").into());
    }
    bundle.handle_all_consumer_delegate_constraints()?;
    bundle.handle_all_constraints()
}
