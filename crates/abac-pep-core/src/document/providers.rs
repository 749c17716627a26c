// crates/abac-pep-core/src/document/providers.rs
// ============================================================================
// Module: Built-In JSON Providers
// Description: Content filter and JSONPath predicate constraint providers.
// Purpose: Enforce document-shaped constraints without custom code.
// Dependencies: jsonpath_lib, serde_json
// ============================================================================

//! ## Overview
//! [`JsonContentFilterProvider`] claims `filterJsonPathContent` constraints and
//! runs their conditions through the [`DocumentPathTransformer`].
//! [`JsonPathPredicateProvider`] claims `jsonPathPredicate` constraints and
//! keeps collection elements matched by the constraint's `predicate`
//! expression. Both fire on execution.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use serde_json::Value;

use crate::decision::Signal;
use crate::document::transform::DocumentPathTransformer;
use crate::providers::ConstraintHandlerProvider;
use crate::providers::DocumentTransformHandler;
use crate::providers::DocumentTransformProvider;
use crate::providers::FilterPredicate;
use crate::providers::HandlerProvider;
use crate::providers::PredicateFilterProvider;
use crate::providers::ProviderCapability;
use crate::responsible::constraint_type;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Constraint family handled by [`JsonContentFilterProvider`].
pub const CONTENT_FILTER_TYPE: &str = "filterJsonPathContent";
/// Constraint family handled by [`JsonPathPredicateProvider`].
pub const JSON_PATH_PREDICATE_TYPE: &str = "jsonPathPredicate";
/// Constraint member holding the predicate expression.
const PREDICATE_MEMBER: &str = "predicate";

// ============================================================================
// SECTION: Content Filter
// ============================================================================

/// Replace/blacken/delete provider for `filterJsonPathContent` constraints.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonContentFilterProvider;

impl ConstraintHandlerProvider for JsonContentFilterProvider {
    fn signal(&self) -> Signal {
        Signal::OnExecution
    }

    fn is_responsible(&self, constraint: &Value) -> bool {
        constraint_type(constraint) == Some(CONTENT_FILTER_TYPE)
    }
}

impl DocumentTransformProvider for JsonContentFilterProvider {
    fn document_transform(&self, constraint: &Value) -> DocumentTransformHandler {
        let constraint = constraint.clone();
        Box::new(move |document| {
            DocumentPathTransformer::from_constraint(&constraint)?.apply(document)
        })
    }
}

impl HandlerProvider for JsonContentFilterProvider {
    fn capabilities(self: Arc<Self>) -> Vec<ProviderCapability> {
        vec![ProviderCapability::DocumentTransform(self)]
    }
}

// ============================================================================
// SECTION: JSONPath Predicate
// ============================================================================

/// Collection filter for `jsonPathPredicate` constraints.
///
/// The expression runs against a one-element array holding the candidate, so
/// `$[?(@.status == 'open')]` keeps exactly the open elements. Expressions that
/// fail to evaluate keep nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonPathPredicateProvider;

impl ConstraintHandlerProvider for JsonPathPredicateProvider {
    fn signal(&self) -> Signal {
        Signal::OnExecution
    }

    fn is_responsible(&self, constraint: &Value) -> bool {
        constraint_type(constraint) == Some(JSON_PATH_PREDICATE_TYPE)
            && constraint.get(PREDICATE_MEMBER).is_some_and(Value::is_string)
    }
}

impl PredicateFilterProvider for JsonPathPredicateProvider {
    fn filter_predicate(&self, constraint: &Value) -> FilterPredicate {
        let expression =
            constraint.get(PREDICATE_MEMBER).and_then(Value::as_str).unwrap_or_default().to_string();
        Box::new(move |element| {
            let wrapped = Value::Array(vec![element.clone()]);
            jsonpath_lib::select(&wrapped, &expression).is_ok_and(|matches| !matches.is_empty())
        })
    }
}

impl HandlerProvider for JsonPathPredicateProvider {
    fn capabilities(self: Arc<Self>) -> Vec<ProviderCapability> {
        vec![ProviderCapability::PredicateFilter(self)]
    }
}
