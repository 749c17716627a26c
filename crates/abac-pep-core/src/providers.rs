// crates/abac-pep-core/src/providers.rs
// ============================================================================
// Module: Constraint Handler Providers
// Description: Provider capability traits and the handler types they produce.
// Purpose: Define the seams through which obligations and advice are enforced.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! A provider claims constraint documents through
//! [`ConstraintHandlerProvider::is_responsible`] and, for every claimed
//! document, produces a handler for one or more capability categories. A
//! provider implementing several capability traits declares all of them once
//! via [`HandlerProvider::capabilities`] when it is registered.
//! Invariants:
//! - Providers are `Send + Sync`; handlers are owned by a single bundle.
//! - A provider only participates in the phase matching its [`Signal`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Map;
use serde_json::Value;

use crate::decision::Signal;
use crate::error::BoxError;
use crate::error::TransformValueError;

// ============================================================================
// SECTION: Handler Types
// ============================================================================

/// Name-to-value map of the protected call's arguments.
pub type ArgumentMap = Map<String, Value>;

/// Side effect run at a lifecycle point.
pub type RunnableHandler = Box<dyn Fn() -> Result<(), BoxError> + Send + Sync>;

/// Mutating consumer of the call arguments.
pub type ArgumentHandler = Box<dyn Fn(&mut ArgumentMap) -> Result<(), BoxError> + Send + Sync>;

/// Read-only consumer of result elements.
pub type ResultConsumerHandler = Box<dyn Fn(&Value) -> Result<(), BoxError> + Send + Sync>;

/// Keep/drop predicate over result elements.
pub type FilterPredicate = Box<dyn Fn(&Value) -> bool + Send + Sync>;

/// In-place mutation of a matched result element.
pub type MutationHandler = Box<dyn Fn(&mut Value) -> Result<(), BoxError> + Send + Sync>;

/// Whole-document rewrite of the result.
pub type DocumentTransformHandler =
    Box<dyn Fn(Value) -> Result<Value, TransformValueError> + Send + Sync>;

/// Observer of a failure raised during enforcement.
pub type ErrorSideEffectHandler = Box<dyn Fn(&BoxError) + Send + Sync>;

/// Translator of a failure raised during enforcement.
pub type ErrorMapperHandler = Box<dyn Fn(BoxError) -> BoxError + Send + Sync>;

/// One action applied to elements matching a [`TransformRule`].
pub enum TransformAction {
    /// Removes the element from a collection, or the field at `path`.
    Delete {
        /// Field path relative to the element; `None` targets the element.
        path: Option<String>,
    },
    /// Mutates the element in place.
    Mutate(MutationHandler),
}

/// Predicate plus the ordered actions applied to every matching element.
pub struct TransformRule {
    /// Selects the elements the actions apply to.
    pub predicate: FilterPredicate,
    /// Actions run in order on each matching element.
    pub actions: Vec<TransformAction>,
}

impl TransformRule {
    /// Creates a rule.
    #[must_use]
    pub fn new(predicate: FilterPredicate, actions: Vec<TransformAction>) -> Self {
        Self {
            predicate,
            actions,
        }
    }
}

// ============================================================================
// SECTION: Typed Adapters
// ============================================================================

/// Lifts a predicate over a concrete type into a [`FilterPredicate`].
///
/// Elements that do not deserialize into `T` never match.
#[must_use]
pub fn typed_predicate<T, F>(predicate: F) -> FilterPredicate
where
    T: DeserializeOwned,
    F: Fn(&T) -> bool + Send + Sync + 'static,
{
    Box::new(move |value| {
        <T as Deserialize>::deserialize(value).is_ok_and(|typed| predicate(&typed))
    })
}

/// Lifts a mutation over a concrete type into a [`MutationHandler`].
///
/// # Errors
///
/// The produced handler fails when the element does not round-trip through
/// `T` or when the mutation itself fails.
#[must_use]
pub fn typed_mutation<T, F>(mutation: F) -> MutationHandler
where
    T: DeserializeOwned + Serialize,
    F: Fn(&mut T) -> Result<(), BoxError> + Send + Sync + 'static,
{
    Box::new(move |value| {
        let mut typed = <T as Deserialize>::deserialize(&*value)?;
        mutation(&mut typed)?;
        *value = serde_json::to_value(&typed)?;
        Ok(())
    })
}

// ============================================================================
// SECTION: Provider Traits
// ============================================================================

/// Responsibility and lifecycle shared by every provider.
pub trait ConstraintHandlerProvider: Send + Sync {
    /// Returns the lifecycle point this provider's handlers fire at.
    fn signal(&self) -> Signal;

    /// Returns true when this provider can satisfy the constraint document.
    fn is_responsible(&self, constraint: &Value) -> bool;
}

/// Provider of plain side effects.
pub trait RunnableProvider: ConstraintHandlerProvider {
    /// Builds the side effect for a claimed constraint.
    fn runnable_handler(&self, constraint: &Value) -> RunnableHandler;
}

/// Provider of argument consumers for the pre-enforcement phase.
pub trait ArgumentConsumerProvider: ConstraintHandlerProvider {
    /// Builds the argument consumer for a claimed constraint.
    fn argument_handler(&self, constraint: &Value) -> ArgumentHandler;
}

/// Provider of read-only result consumers.
pub trait ResultConsumerProvider: ConstraintHandlerProvider {
    /// Builds the result consumer for a claimed constraint.
    fn result_consumer(&self, constraint: &Value) -> ResultConsumerHandler;
}

/// Provider of collection filter predicates.
pub trait PredicateFilterProvider: ConstraintHandlerProvider {
    /// Builds the predicate for a claimed constraint.
    fn filter_predicate(&self, constraint: &Value) -> FilterPredicate;
}

/// Provider of predicate/action transformation rules.
pub trait TypedTransformProvider: ConstraintHandlerProvider {
    /// Builds the rules for a claimed constraint.
    fn transform_rules(&self, constraint: &Value) -> Vec<TransformRule>;
}

/// Provider of whole-document transformations.
pub trait DocumentTransformProvider: ConstraintHandlerProvider {
    /// Builds the document rewrite for a claimed constraint.
    fn document_transform(&self, constraint: &Value) -> DocumentTransformHandler;
}

/// Provider of error observers.
pub trait ErrorSideEffectProvider: ConstraintHandlerProvider {
    /// Builds the observer for a claimed constraint.
    fn error_side_effect(&self, constraint: &Value) -> ErrorSideEffectHandler;
}

/// Provider of error translators.
pub trait ErrorMapperProvider: ConstraintHandlerProvider {
    /// Ordering weight; higher priorities map first.
    fn priority(&self) -> i32 {
        0
    }

    /// Builds the translator for a claimed constraint.
    fn error_mapper(&self, constraint: &Value) -> ErrorMapperHandler;
}

// ============================================================================
// SECTION: Capability Declaration
// ============================================================================

/// One capability a provider is registered under.
#[derive(Clone)]
pub enum ProviderCapability {
    /// Side effects.
    Runnable(Arc<dyn RunnableProvider>),
    /// Argument consumers.
    ArgumentConsumer(Arc<dyn ArgumentConsumerProvider>),
    /// Result consumers.
    ResultConsumer(Arc<dyn ResultConsumerProvider>),
    /// Filter predicates.
    PredicateFilter(Arc<dyn PredicateFilterProvider>),
    /// Predicate/action rules.
    TypedTransform(Arc<dyn TypedTransformProvider>),
    /// Document rewrites.
    DocumentTransform(Arc<dyn DocumentTransformProvider>),
    /// Error observers.
    ErrorSideEffect(Arc<dyn ErrorSideEffectProvider>),
    /// Error translators.
    ErrorMapper(Arc<dyn ErrorMapperProvider>),
}

impl ProviderCapability {
    /// Returns a stable label for the capability category.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Runnable(_) => "runnable",
            Self::ArgumentConsumer(_) => "argument_consumer",
            Self::ResultConsumer(_) => "result_consumer",
            Self::PredicateFilter(_) => "predicate_filter",
            Self::TypedTransform(_) => "typed_transform",
            Self::DocumentTransform(_) => "document_transform",
            Self::ErrorSideEffect(_) => "error_side_effect",
            Self::ErrorMapper(_) => "error_mapper",
        }
    }
}

/// Provider that declares its own capability set.
pub trait HandlerProvider: Send + Sync {
    /// Returns every capability this provider should be registered under.
    fn capabilities(self: Arc<Self>) -> Vec<ProviderCapability>;
}
