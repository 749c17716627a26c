// crates/abac-pep-enforcement/src/pre.rs
// ============================================================================
// Module: Pre-Enforcement Point
// Description: Authorizes a guarded call before it runs.
// Purpose: Fetch a decision, run pre-phase handlers, and answer permit/deny.
// Dependencies: abac-pep-core, abac-pep-pdp, tracing
// ============================================================================

//! ## Overview
//! [`PreEnforcementPoint`] guards a call before it executes. It obtains a
//! decision, refuses decisions it cannot honor, runs on-decision side effects
//! and argument consumers, and reports whether the call may proceed.
//! Invariants:
//! - A missing decision or a resource replacement is a denial.
//! - Argument consumers run before the verdict is reported.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use abac_pep_core::AccessDenied;
use abac_pep_core::ArgumentMap;
use abac_pep_core::ConstraintEnforcer;
use abac_pep_core::Decision;
use abac_pep_core::EnforcementAuditEvent;
use abac_pep_core::EnforcementOutcome;
use abac_pep_core::EnforcementPhase;
use abac_pep_core::PreEnforceBundle;
use abac_pep_core::Subscription;
use abac_pep_core::Verdict;
use abac_pep_pdp::PolicyDecisionPoint;

use crate::error::PepError;

// ============================================================================
// SECTION: Enforcement Point
// ============================================================================

/// Enforcement point run before a guarded call.
pub struct PreEnforcementPoint {
    /// Constraint resolution and bundle construction.
    enforcer: Arc<ConstraintEnforcer>,
}

impl PreEnforcementPoint {
    /// Creates an enforcement point.
    #[must_use]
    pub const fn new(enforcer: Arc<ConstraintEnforcer>) -> Self {
        Self {
            enforcer,
        }
    }

    /// Decides `subscription` through `pdp` and enforces the decision
    /// against `arguments`.
    ///
    /// Returns `Ok(true)` when the call may proceed and `Ok(false)` when the
    /// verdict was not `PERMIT` but every handler ran.
    ///
    /// # Errors
    ///
    /// Returns [`PepError::AccessDenied`] when the decision cannot be honored.
    pub async fn enforce(
        &self,
        pdp: &PolicyDecisionPoint,
        subscription: &Subscription,
        arguments: &mut ArgumentMap,
    ) -> Result<bool, PepError> {
        let decision = pdp.decide(subscription).await;
        self.enforce_decision(subscription, Some(&decision), arguments)
    }

    /// Enforces an already obtained decision.
    ///
    /// # Errors
    ///
    /// Returns [`PepError::AccessDenied`] when the decision is absent, carries
    /// a resource replacement, has an unhandled obligation, or a handler fails.
    pub fn enforce_decision(
        &self,
        subscription: &Subscription,
        decision: Option<&Decision>,
        arguments: &mut ArgumentMap,
    ) -> Result<bool, PepError> {
        let short_id = subscription.short_id();
        let Some(decision) = decision else {
            tracing::error!(subscription = %short_id, "access denied by PEP: decision is missing");
            let denial = AccessDenied::with_detail("No decision available");
            self.record(&short_id, Verdict::Indeterminate, EnforcementOutcome::Denied, &denial);
            return Err(denial.into());
        };
        let bundle = self.enforcer.pre_enforce_bundle_for(decision)?;
        if let Err(error) = run_handlers(&bundle, arguments) {
            tracing::warn!(
                subscription = %short_id,
                error = %error,
                "pre-enforcement handler failed"
            );
            self.record(&short_id, decision.verdict, EnforcementOutcome::Denied, &error);
            return Err(error);
        }
        let permitted = decision.is_permit();
        let outcome =
            if permitted { EnforcementOutcome::Permitted } else { EnforcementOutcome::Denied };
        self.enforcer.audit_sink().record(
            &EnforcementAuditEvent::new(EnforcementPhase::Pre, decision.verdict, outcome, None)
                .with_subscription_id(short_id),
        );
        Ok(permitted)
    }

    /// Emits an audit event carrying `detail`.
    fn record(
        &self,
        short_id: &str,
        verdict: Verdict,
        outcome: EnforcementOutcome,
        detail: &impl ToString,
    ) {
        self.enforcer.audit_sink().record(
            &EnforcementAuditEvent::new(
                EnforcementPhase::Pre,
                verdict,
                outcome,
                Some(detail.to_string()),
            )
            .with_subscription_id(short_id),
        );
    }
}

/// Runs on-decision side effects, then argument consumers.
fn run_handlers(bundle: &PreEnforceBundle, arguments: &mut ArgumentMap) -> Result<(), PepError> {
    bundle.handle_on_decision_constraints()?;
    bundle.handle_method_invocation_handlers(arguments)?;
    Ok(())
}
