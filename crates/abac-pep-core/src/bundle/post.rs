// crates/abac-pep-core/src/bundle/post.rs
// ============================================================================
// Module: Post-Enforcement Bundles
// Description: Handlers run against the protected call's result.
// Purpose: Filter, transform, observe, and map failures for a call result.
// Dependencies: crate::document, crate::providers, crate::resolution
// ============================================================================

//! ## Overview
//! [`PostEnforceBundle`] is generic over the result shape. An
//! [`ElementResult`] is never filtered out, only transformed; a
//! [`CollectionResult`] can lose elements to predicates and delete actions.
//! Pipeline order: predicate filter, typed transform rules, document
//! transforms.
//! Invariants:
//! - Only the first resolved predicate filters a collection.
//! - The bundle owns the live result value; every step mutates it in place.
//! - Error side effects observe a failure before any mapper translates it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::document::path::PathExpression;
use crate::document::path::remove_at;
use crate::error::AccessDenied;
use crate::error::BoxError;
use crate::error::EnforcementError;
use crate::providers::DocumentTransformHandler;
use crate::providers::ErrorMapperHandler;
use crate::providers::ErrorSideEffectHandler;
use crate::providers::FilterPredicate;
use crate::providers::ResultConsumerHandler;
use crate::providers::RunnableHandler;
use crate::providers::TransformAction;
use crate::providers::TransformRule;
use crate::resolution::Resolution;

// ============================================================================
// SECTION: Result Shapes
// ============================================================================

/// Sealed marker for the supported result shapes.
mod sealed {
    /// Prevents outside implementations of [`super::ResultShape`].
    pub trait Sealed {}
}

/// Shape-specific pipeline steps.
pub trait ResultShape: sealed::Sealed + Send {
    /// Applies a keep/drop predicate.
    fn retain_matching(&mut self, predicate: &FilterPredicate);

    /// Applies one transformation rule.
    ///
    /// # Errors
    ///
    /// Returns [`EnforcementError`] when an action fails.
    fn apply_rule(&mut self, rule: &TransformRule) -> Result<(), EnforcementError>;

    /// Rewrites the whole result.
    ///
    /// # Errors
    ///
    /// Returns [`EnforcementError::TransformValue`] on malformed actions.
    fn rewrite(&mut self, handler: &DocumentTransformHandler) -> Result<(), EnforcementError>;

    /// Returns the elements a consumer observes.
    fn elements(&self) -> Vec<&Value>;

    /// Returns the current result as JSON.
    fn to_value(&self) -> Value;

    /// Consumes the shape and returns the result as JSON.
    fn into_value(self) -> Value;
}

/// Single result object.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementResult(Value);

impl ElementResult {
    /// Wraps a JSON value.
    #[must_use]
    pub const fn new(value: Value) -> Self {
        Self(value)
    }

    /// Returns the live value.
    #[must_use]
    pub const fn value(&self) -> &Value {
        &self.0
    }
}

impl sealed::Sealed for ElementResult {}

impl ResultShape for ElementResult {
    fn retain_matching(&mut self, _predicate: &FilterPredicate) {}

    fn apply_rule(&mut self, rule: &TransformRule) -> Result<(), EnforcementError> {
        if !(rule.predicate)(&self.0) {
            return Ok(());
        }
        for action in &rule.actions {
            match action {
                TransformAction::Delete {
                    path: Some(path),
                } => delete_field(&mut self.0, path)?,
                TransformAction::Delete {
                    path: None,
                } => {
                    tracing::debug!("delete without path ignored for a single result element");
                }
                TransformAction::Mutate(mutation) => {
                    mutation(&mut self.0).map_err(EnforcementError::Handler)?;
                }
            }
        }
        Ok(())
    }

    fn rewrite(&mut self, handler: &DocumentTransformHandler) -> Result<(), EnforcementError> {
        self.0 = handler(self.0.take())?;
        Ok(())
    }

    fn elements(&self) -> Vec<&Value> {
        vec![&self.0]
    }

    fn to_value(&self) -> Value {
        self.0.clone()
    }

    fn into_value(self) -> Value {
        self.0
    }
}

/// Homogeneous collection of result objects.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CollectionResult(Vec<Value>);

impl CollectionResult {
    /// Wraps a list of JSON values.
    #[must_use]
    pub const fn new(items: Vec<Value>) -> Self {
        Self(items)
    }

    /// Returns the live elements.
    #[must_use]
    pub fn items(&self) -> &[Value] {
        &self.0
    }
}

impl sealed::Sealed for CollectionResult {}

impl ResultShape for CollectionResult {
    fn retain_matching(&mut self, predicate: &FilterPredicate) {
        self.0.retain(|item| predicate(item));
    }

    fn apply_rule(&mut self, rule: &TransformRule) -> Result<(), EnforcementError> {
        if rule.actions.is_empty() {
            self.retain_matching(&rule.predicate);
            return Ok(());
        }
        let mut kept = Vec::with_capacity(self.0.len());
        for mut item in std::mem::take(&mut self.0) {
            if !(rule.predicate)(&item) {
                kept.push(item);
                continue;
            }
            let mut removed = false;
            for action in &rule.actions {
                match action {
                    TransformAction::Delete {
                        path: None,
                    } => {
                        removed = true;
                        break;
                    }
                    TransformAction::Delete {
                        path: Some(path),
                    } => delete_field(&mut item, path)?,
                    TransformAction::Mutate(mutation) => {
                        mutation(&mut item).map_err(EnforcementError::Handler)?;
                    }
                }
            }
            if !removed {
                kept.push(item);
            }
        }
        self.0 = kept;
        Ok(())
    }

    fn rewrite(&mut self, handler: &DocumentTransformHandler) -> Result<(), EnforcementError> {
        let rewritten = handler(Value::Array(std::mem::take(&mut self.0)))?;
        self.0 = match rewritten {
            Value::Array(items) => items,
            Value::Null => Vec::new(),
            other => vec![other],
        };
        Ok(())
    }

    fn elements(&self) -> Vec<&Value> {
        self.0.iter().collect()
    }

    fn to_value(&self) -> Value {
        Value::Array(self.0.clone())
    }

    fn into_value(self) -> Value {
        Value::Array(self.0)
    }
}

/// Removes every node the relative `path` selects inside `item`.
fn delete_field(item: &mut Value, path: &str) -> Result<(), EnforcementError> {
    let expression = PathExpression::parse(path)?;
    for location in expression.select(item).iter().rev() {
        remove_at(item, location);
    }
    Ok(())
}

// ============================================================================
// SECTION: Error Outcome
// ============================================================================

/// Result of running the error-mapping chain.
#[derive(Debug)]
pub enum ErrorOutcome {
    /// At least one mapper ran; holds the final mapped error.
    Mapped(BoxError),
    /// No mapper was resolved; holds the original error.
    Unmapped(BoxError),
}

impl ErrorOutcome {
    /// Returns true when a mapper translated the error.
    #[must_use]
    pub const fn is_mapped(&self) -> bool {
        matches!(self, Self::Mapped(_))
    }

    /// Returns the mapped error, or `None` when no mapper ran.
    #[must_use]
    pub fn mapped(self) -> Option<BoxError> {
        match self {
            Self::Mapped(error) => Some(error),
            Self::Unmapped(_) => None,
        }
    }

    /// Returns the carried error regardless of mapping.
    #[must_use]
    pub fn into_error(self) -> BoxError {
        match self {
            Self::Mapped(error) | Self::Unmapped(error) => error,
        }
    }
}

// ============================================================================
// SECTION: Post Bundle
// ============================================================================

/// Resolved post-phase handlers plus the live result for one call.
pub struct PostEnforceBundle<S: ResultShape> {
    /// Live result under enforcement.
    result: S,
    /// Runnables fired once the decision is in hand.
    on_decision: Vec<RunnableHandler>,
    /// Read-only observers of result elements.
    consumers: Vec<ResultConsumerHandler>,
    /// Collection filters.
    predicates: Vec<FilterPredicate>,
    /// Predicate/action rules.
    transform_rules: Vec<TransformRule>,
    /// Whole-document rewrites.
    document_transforms: Vec<DocumentTransformHandler>,
    /// Error observers.
    error_side_effects: Vec<ErrorSideEffectHandler>,
    /// Error translators, in mapping order.
    error_mappers: Vec<ErrorMapperHandler>,
}

impl<S: ResultShape> PostEnforceBundle<S> {
    /// Takes the post-phase handlers out of a resolution.
    pub(crate) fn from_resolution(result: S, resolution: Resolution) -> Self {
        Self {
            result,
            on_decision: resolution.runnables,
            consumers: resolution.result_consumers,
            predicates: resolution.predicates,
            transform_rules: resolution.transform_rules,
            document_transforms: resolution.document_transforms,
            error_side_effects: resolution.error_side_effects,
            error_mappers: resolution.error_mappers,
        }
    }

    /// Returns the live result.
    #[must_use]
    pub const fn result(&self) -> &S {
        &self.result
    }

    /// Consumes the bundle and returns the result as JSON.
    #[must_use]
    pub fn into_value(self) -> Value {
        self.result.into_value()
    }

    /// Consumes the bundle and deserializes the result.
    ///
    /// # Errors
    ///
    /// Returns [`EnforcementError::Handler`] when the enforced result no
    /// longer fits `T`.
    pub fn into_typed<T: DeserializeOwned>(self) -> Result<T, EnforcementError> {
        serde_json::from_value(self.into_value()).map_err(|err| EnforcementError::Handler(err.into()))
    }

    /// Runs the runnables resolved for this phase.
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

    /// Applies the first predicate filter, then every transformation rule.
    ///
    /// # Errors
    ///
    /// Returns [`EnforcementError`] when a rule action fails.
    pub fn handle_filter_predicate_and_transformation_handlers(
        &mut self,
    ) -> Result<(), EnforcementError> {
        if let Some(predicate) = self.predicates.first() {
            self.result.retain_matching(predicate);
        }
        for rule in &self.transform_rules {
            self.result.apply_rule(rule)?;
        }
        Ok(())
    }

    /// Applies every document transform in order.
    ///
    /// # Errors
    ///
    /// Returns [`EnforcementError::TransformValue`] on malformed actions.
    pub fn handle_json_filter_predicate_and_transformation_handlers(
        &mut self,
    ) -> Result<(), EnforcementError> {
        for handler in &self.document_transforms {
            self.result.rewrite(handler)?;
        }
        Ok(())
    }

    /// Runs filtering and transformation, then document transforms, and
    /// returns the resulting value.
    ///
    /// # Errors
    ///
    /// Returns the first [`EnforcementError`] raised by either stage.
    pub fn handle_all_constraints(&mut self) -> Result<Value, EnforcementError> {
        self.handle_filter_predicate_and_transformation_handlers()?;
        self.handle_json_filter_predicate_and_transformation_handlers()?;
        Ok(self.result.to_value())
    }

    /// Runs every result consumer over every element.
    ///
    /// # Errors
    ///
    /// Returns [`EnforcementError::AccessDenied`] wrapping the first failure.
    pub fn handle_all_consumer_delegate_constraints(&self) -> Result<(), EnforcementError> {
        for consumer in &self.consumers {
            for element in self.result.elements() {
                consumer(element).map_err(|err| {
                    AccessDenied::with_cause("Failed to apply result constraint", err)
                })?;
            }
        }
        Ok(())
    }

    /// Lets error side effects observe `error`, then folds the mappers over it.
    #[must_use]
    pub fn handle_all_on_error_constraints(&self, error: BoxError) -> ErrorOutcome {
        for side_effect in &self.error_side_effects {
            side_effect(&error);
        }
        if self.error_mappers.is_empty() {
            return ErrorOutcome::Unmapped(error);
        }
        let mapped = self.error_mappers.iter().fold(error, |current, mapper| mapper(current));
        ErrorOutcome::Mapped(mapped)
    }
}

// ============================================================================
// SECTION: Shape Dispatch
// ============================================================================

/// Post bundle whose shape was chosen from the runtime result value.
pub enum AnyPostEnforceBundle {
    /// Single object result.
    Element(PostEnforceBundle<ElementResult>),
    /// Array result.
    Collection(PostEnforceBundle<CollectionResult>),
}

impl AnyPostEnforceBundle {
    /// Builds the bundle, picking the collection shape for JSON arrays.
    pub(crate) fn from_resolution(result: Value, resolution: Resolution) -> Self {
        match result {
            Value::Array(items) => Self::Collection(PostEnforceBundle::from_resolution(
                CollectionResult::new(items),
                resolution,
            )),
            other => Self::Element(PostEnforceBundle::from_resolution(
                ElementResult::new(other),
                resolution,
            )),
        }
    }

    /// Returns true for the collection shape.
    #[must_use]
    pub const fn is_collection(&self) -> bool {
        matches!(self, Self::Collection(_))
    }

    /// See [`PostEnforceBundle::handle_on_decision_constraints`].
    ///
    /// # Errors
    ///
    /// Propagates the shape-specific failure.
    pub fn handle_on_decision_constraints(&self) -> Result<(), EnforcementError> {
        match self {
            Self::Element(bundle) => bundle.handle_on_decision_constraints(),
            Self::Collection(bundle) => bundle.handle_on_decision_constraints(),
        }
    }

    /// See [`PostEnforceBundle::handle_filter_predicate_and_transformation_handlers`].
    ///
    /// # Errors
    ///
    /// Propagates the shape-specific failure.
    pub fn handle_filter_predicate_and_transformation_handlers(
        &mut self,
    ) -> Result<(), EnforcementError> {
        match self {
            Self::Element(bundle) => bundle.handle_filter_predicate_and_transformation_handlers(),
            Self::Collection(bundle) => {
                bundle.handle_filter_predicate_and_transformation_handlers()
            }
        }
    }

    /// See [`PostEnforceBundle::handle_json_filter_predicate_and_transformation_handlers`].
    ///
    /// # Errors
    ///
    /// Propagates the shape-specific failure.
    pub fn handle_json_filter_predicate_and_transformation_handlers(
        &mut self,
    ) -> Result<(), EnforcementError> {
        match self {
            Self::Element(bundle) => {
                bundle.handle_json_filter_predicate_and_transformation_handlers()
            }
            Self::Collection(bundle) => {
                bundle.handle_json_filter_predicate_and_transformation_handlers()
            }
        }
    }

    /// See [`PostEnforceBundle::handle_all_constraints`].
    ///
    /// # Errors
    ///
    /// Propagates the shape-specific failure.
    pub fn handle_all_constraints(&mut self) -> Result<Value, EnforcementError> {
        match self {
            Self::Element(bundle) => bundle.handle_all_constraints(),
            Self::Collection(bundle) => bundle.handle_all_constraints(),
        }
    }

    /// See [`PostEnforceBundle::handle_all_consumer_delegate_constraints`].
    ///
    /// # Errors
    ///
    /// Propagates the shape-specific failure.
    pub fn handle_all_consumer_delegate_constraints(&self) -> Result<(), EnforcementError> {
        match self {
            Self::Element(bundle) => bundle.handle_all_consumer_delegate_constraints(),
            Self::Collection(bundle) => bundle.handle_all_consumer_delegate_constraints(),
        }
    }

    /// See [`PostEnforceBundle::handle_all_on_error_constraints`].
    #[must_use]
    pub fn handle_all_on_error_constraints(&self, error: BoxError) -> ErrorOutcome {
        match self {
            Self::Element(bundle) => bundle.handle_all_on_error_constraints(error),
            Self::Collection(bundle) => bundle.handle_all_on_error_constraints(error),
        }
    }

    /// Consumes the bundle and returns the result as JSON.
    #[must_use]
    pub fn into_value(self) -> Value {
        match self {
            Self::Element(bundle) => bundle.into_value(),
            Self::Collection(bundle) => bundle.into_value(),
        }
    }
}

/// Serializes a typed result into the JSON value a bundle works on.
///
/// # Errors
///
/// Returns [`EnforcementError::AccessDenied`] when the result cannot be
/// represented as JSON.
pub(crate) fn to_result_value<T: Serialize + ?Sized>(result: &T) -> Result<Value, EnforcementError> {
    serde_json::to_value(result)
        .map_err(|err| AccessDenied::with_cause("Failed to construct bundle", err.into()).into())
}
