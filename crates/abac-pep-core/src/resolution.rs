// crates/abac-pep-core/src/resolution.rs
// ============================================================================
// Module: Constraint Resolution
// Description: Pure mapping of obligations and advice to handler instances.
// Purpose: Decide which providers claim which constraints for a phase.
// Dependencies: crate::registry, serde_json
// ============================================================================

//! ## Overview
//! [`resolve`] scans the registry category by category in a fixed order:
//! runnable, argument or result consumer, predicate filter, typed transform,
//! document transform, error mapper, error side effect. Within a category every
//! provider whose signal matches the phase and that is responsible for a
//! constraint contributes a handler. An obligation claimed by at least one
//! provider is removed from the unhandled set, so later categories only see
//! what remains. Advice is matched the same way but never removed and never
//! reported as unhandled.
//! Invariants:
//! - Resolution only instantiates handlers; no handler body runs here.
//! - Within a category, obligation handlers precede advice handlers.
//! - Error mappers are ordered by descending priority, ties keeping
//!   resolution order.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use serde_json::Value;

use crate::decision::EnforcementPhase;
use crate::decision::Signal;
use crate::providers::ArgumentHandler;
use crate::providers::ConstraintHandlerProvider;
use crate::providers::DocumentTransformHandler;
use crate::providers::ErrorMapperHandler;
use crate::providers::ErrorSideEffectHandler;
use crate::providers::FilterPredicate;
use crate::providers::ResultConsumerHandler;
use crate::providers::RunnableHandler;
use crate::providers::TransformRule;
use crate::registry::ConstraintRegistry;

// ============================================================================
// SECTION: Resolution
// ============================================================================

/// Handlers resolved for one phase plus the obligations nobody claimed.
#[derive(Default)]
pub struct Resolution {
    /// Side effects in resolution order.
    pub(crate) runnables: Vec<RunnableHandler>,
    /// Argument consumers (pre phase only).
    pub(crate) argument_handlers: Vec<ArgumentHandler>,
    /// Result consumers (post phase only).
    pub(crate) result_consumers: Vec<ResultConsumerHandler>,
    /// Filter predicates (post phase only).
    pub(crate) predicates: Vec<FilterPredicate>,
    /// Predicate/action rules, flattened (post phase only).
    pub(crate) transform_rules: Vec<TransformRule>,
    /// Document rewrites (post phase only).
    pub(crate) document_transforms: Vec<DocumentTransformHandler>,
    /// Error translators in mapping order (post phase only).
    pub(crate) error_mappers: Vec<ErrorMapperHandler>,
    /// Error observers (post phase only).
    pub(crate) error_side_effects: Vec<ErrorSideEffectHandler>,
    /// Obligations no provider claimed, in decision order.
    unhandled: Vec<Value>,
}

impl Resolution {
    /// Returns the obligations left unclaimed.
    #[must_use]
    pub fn unhandled(&self) -> &[Value] {
        &self.unhandled
    }

    /// Returns true when every obligation was claimed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.unhandled.is_empty()
    }

    /// Returns the total number of resolved handlers.
    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.runnables.len()
            + self.argument_handlers.len()
            + self.result_consumers.len()
            + self.predicates.len()
            + self.transform_rules.len()
            + self.document_transforms.len()
            + self.error_mappers.len()
            + self.error_side_effects.len()
    }
}

/// Resolves obligations and advice against the registry for a phase.
#[must_use]
pub fn resolve(
    obligations: &[Value],
    advice: &[Value],
    registry: &ConstraintRegistry,
    phase: EnforcementPhase,
) -> Resolution {
    let signal = phase.signal();
    let mut scan = Scan {
        signal,
        unhandled: obligations.to_vec(),
        advice,
    };
    let mut resolution = Resolution {
        runnables: scan.claim(&registry.runnables, |p, c| p.runnable_handler(c)),
        ..Resolution::default()
    };
    match phase {
        EnforcementPhase::Pre => {
            resolution.argument_handlers =
                scan.claim(&registry.argument_consumers, |p, c| p.argument_handler(c));
        }
        EnforcementPhase::Post => {
            resolution.result_consumers =
                scan.claim(&registry.result_consumers, |p, c| p.result_consumer(c));
            resolution.predicates =
                scan.claim(&registry.predicate_filters, |p, c| p.filter_predicate(c));
            resolution.transform_rules = scan
                .claim(&registry.typed_transforms, |p, c| p.transform_rules(c))
                .into_iter()
                .flatten()
                .collect();
            resolution.document_transforms =
                scan.claim(&registry.document_transforms, |p, c| p.document_transform(c));
            let mut mappers =
                scan.claim(&registry.error_mappers, |p, c| (p.priority(), p.error_mapper(c)));
            mappers.sort_by(|left, right| right.0.cmp(&left.0));
            resolution.error_mappers = mappers.into_iter().map(|(_, mapper)| mapper).collect();
            resolution.error_side_effects =
                scan.claim(&registry.error_side_effects, |p, c| p.error_side_effect(c));
        }
    }
    resolution.unhandled = scan.unhandled;
    if !resolution.unhandled.is_empty() {
        tracing::debug!(
            phase = phase.as_str(),
            unhandled = resolution.unhandled.len(),
            "obligations left without a responsible provider"
        );
    }
    resolution
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Running state of one resolution pass.
struct Scan<'a> {
    /// Signal providers must carry.
    signal: Signal,
    /// Obligations not yet claimed.
    unhandled: Vec<Value>,
    /// Advice, never consumed.
    advice: &'a [Value],
}

impl Scan<'_> {
    /// Claims constraints for one category and returns the handlers built.
    fn claim<P, H>(&mut self, providers: &[Arc<P>], build: impl Fn(&P, &Value) -> H) -> Vec<H>
    where
        P: ConstraintHandlerProvider + ?Sized,
    {
        let signal = self.signal;
        let responsible = |constraint: &Value| {
            providers
                .iter()
                .map(|provider| &**provider)
                .filter(move |provider| {
                    provider.signal() == signal && provider.is_responsible(constraint)
                })
                .collect::<Vec<&P>>()
        };
        let mut handlers = Vec::new();
        self.unhandled.retain(|obligation| {
            let claimed = responsible(obligation);
            for provider in &claimed {
                handlers.push(build(*provider, obligation));
            }
            claimed.is_empty()
        });
        for advice in self.advice {
            for provider in responsible(advice) {
                handlers.push(build(provider, advice));
            }
        }
        handlers
    }
}
