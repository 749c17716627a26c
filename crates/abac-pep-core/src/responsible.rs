// crates/abac-pep-core/src/responsible.rs
// ============================================================================
// Module: Constraint Matching Helpers
// Description: Key/value responsibility matcher and constraint field readers.
// Purpose: Let simple providers decide which constraint documents they own.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! Constraint documents arrive in two shapes: a flat `"key:value"` string or
//! a structured object. [`ResponsibleItem`] accepts either, and
//! [`constraint_type`] reads the family id used by structured constraints.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;

// ============================================================================
// SECTION: Responsible Item
// ============================================================================

/// Matches constraint documents by a key and value pair.
///
/// # Invariants
/// - For objects, only the first member is compared against `key`/`value`.
/// - Every child item must match some member of the same object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponsibleItem {
    /// Member name or flat-string prefix.
    key: String,
    /// Expected member value or flat-string suffix.
    value: String,
    /// Additional members that must also be present.
    children: Vec<Self>,
}

impl ResponsibleItem {
    /// Creates a matcher without children.
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            children: Vec::new(),
        }
    }

    /// Adds a child matcher.
    #[must_use]
    pub fn with_child(mut self, child: Self) -> Self {
        self.children.push(child);
        self
    }

    /// Returns the matcher key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the matcher value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Returns the `"key:value"` form.
    #[must_use]
    pub fn key_value(&self) -> String {
        format!("{}:{}", self.key, self.value)
    }

    /// Returns true when the constraint document is owned by this matcher.
    #[must_use]
    pub fn is_match(&self, constraint: &Value) -> bool {
        match constraint {
            Value::Object(members) => {
                let Some((name, value)) = members.iter().next() else {
                    return false;
                };
                name == &self.key
                    && scalar_text(value).as_deref() == Some(self.value.as_str())
                    && self.children.iter().all(|child| child.matches_member(constraint))
            }
            Value::String(text) => *text == self.key_value(),
            _ => false,
        }
    }

    /// Returns true when any member of the object equals this key/value.
    fn matches_member(&self, constraint: &Value) -> bool {
        constraint.get(&self.key).and_then(scalar_text).as_deref() == Some(self.value.as_str())
    }
}

// ============================================================================
// SECTION: Constraint Readers
// ============================================================================

/// Returns the constraint family id.
///
/// Reads `obligation.type` when an `obligation` member exists, otherwise the
/// top-level `type`.
#[must_use]
pub fn constraint_type(constraint: &Value) -> Option<&str> {
    match constraint.get("obligation") {
        Some(obligation) => obligation.get("type").and_then(Value::as_str),
        None => constraint.get("type").and_then(Value::as_str),
    }
}

/// Returns a member's text, rendering numbers and booleans as strings.
#[must_use]
pub fn member_text(constraint: &Value, name: &str) -> Option<String> {
    constraint.get(name).and_then(scalar_text)
}

/// Renders a scalar value as text; objects, arrays, and null yield `None`.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}
