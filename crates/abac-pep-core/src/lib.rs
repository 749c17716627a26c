// crates/abac-pep-core/src/lib.rs
// ============================================================================
// Module: ABAC PEP Core Library
// Description: Decision model and constraint enforcement engine.
// Purpose: Resolve obligations and advice into handlers and run them per call.
// Dependencies: jsonpath_lib, serde, serde_json, sha2, thiserror, tracing
// ============================================================================

//! ## Overview
//! ABAC PEP Core enforces the obligations and advice attached to PDP
//! decisions. Providers are registered once in a [`ConstraintRegistry`]; per
//! call, the [`ConstraintEnforcer`] resolves a [`Decision`] into a
//! [`PreEnforceBundle`] or a post bundle and the bundle runs the handlers
//! against the call's arguments or result.
//! Invariants:
//! - An obligation without a responsible provider denies access before any
//!   handler runs.
//! - Unhandled advice is dropped silently.
//! - Resolution and bundle execution never suspend; the engine is synchronous.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod bundle;
pub mod decision;
pub mod document;
pub mod enforcer;
pub mod error;
pub mod providers;
pub mod registry;
pub mod resolution;
pub mod responsible;
pub mod subscription;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::EnforcementAuditEvent;
pub use audit::EnforcementAuditSink;
pub use audit::EnforcementOutcome;
pub use audit::FileAuditSink;
pub use audit::NoopAuditSink;
pub use audit::StderrAuditSink;
pub use bundle::AnyPostEnforceBundle;
pub use bundle::CollectionResult;
pub use bundle::ElementResult;
pub use bundle::ErrorOutcome;
pub use bundle::PostEnforceBundle;
pub use bundle::PreEnforceBundle;
pub use bundle::ResultShape;
pub use decision::Decision;
pub use decision::EnforcementPhase;
pub use decision::Signal;
pub use decision::Verdict;
pub use document::path::PathExpression;
pub use document::providers::CONTENT_FILTER_TYPE;
pub use document::providers::JSON_PATH_PREDICATE_TYPE;
pub use document::providers::JsonContentFilterProvider;
pub use document::providers::JsonPathPredicateProvider;
pub use document::transform::Condition;
pub use document::transform::DEFAULT_MASK;
pub use document::transform::DocumentPathTransformer;
pub use document::transform::MaskSpec;
pub use document::transform::Transformation;
pub use document::transform::blacken;
pub use enforcer::ConstraintEnforcer;
pub use error::ACCESS_DENIED_MESSAGE;
pub use error::AccessDenied;
pub use error::BoxError;
pub use error::EnforcementError;
pub use error::TransformValueError;
pub use providers::ArgumentConsumerProvider;
pub use providers::ArgumentHandler;
pub use providers::ArgumentMap;
pub use providers::ConstraintHandlerProvider;
pub use providers::DocumentTransformHandler;
pub use providers::DocumentTransformProvider;
pub use providers::ErrorMapperHandler;
pub use providers::ErrorMapperProvider;
pub use providers::ErrorSideEffectHandler;
pub use providers::ErrorSideEffectProvider;
pub use providers::FilterPredicate;
pub use providers::HandlerProvider;
pub use providers::MutationHandler;
pub use providers::PredicateFilterProvider;
pub use providers::ProviderCapability;
pub use providers::ResultConsumerHandler;
pub use providers::ResultConsumerProvider;
pub use providers::RunnableHandler;
pub use providers::RunnableProvider;
pub use providers::TransformAction;
pub use providers::TransformRule;
pub use providers::TypedTransformProvider;
pub use providers::typed_mutation;
pub use providers::typed_predicate;
pub use registry::ConstraintRegistry;
pub use registry::ConstraintRegistryBuilder;
pub use resolution::Resolution;
pub use resolution::resolve;
pub use responsible::ResponsibleItem;
pub use responsible::constraint_type;
pub use responsible::member_text;
pub use subscription::Subscription;
pub use subscription::SubscriptionBuilder;
pub use subscription::SubscriptionKey;

#[cfg(test)]
mod tests;
