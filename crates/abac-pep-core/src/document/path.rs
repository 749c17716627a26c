// crates/abac-pep-core/src/document/path.rs
// ============================================================================
// Module: Document Path Selectors
// Description: JSONPath selection reported as concrete node locations.
// Purpose: Address nodes of a JSON document so they can be rewritten.
// Dependencies: jsonpath_lib, serde_json
// ============================================================================

//! ## Overview
//! A [`PathExpression`] is a compiled JSONPath expression (`jsonpath_lib`)
//! whose matches are reported as [`Location`]s (object keys and array
//! indices from the root), so callers can read, overwrite, or remove the
//! node afterwards.
//!
//! Expressions may start with `$` or `@`; a bare name such as `Name.first`
//! is read relative to the root. An empty expression, `$`, and `@` address
//! the root itself.
//! Invariants:
//! - Locations are reported once each, in document order.
//! - Selection never fails; a runtime selection error yields no locations.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashSet;
use std::fmt;

use jsonpath_lib::Compiled;
use serde_json::Value;

use crate::error::TransformValueError;

// ============================================================================
// SECTION: Locations
// ============================================================================

/// One step from a node to a child.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathStep {
    /// Object member by name.
    Key(String),
    /// Array element by position.
    Index(usize),
}

/// Concrete address of a node, from the document root.
pub type Location = Vec<PathStep>;

/// Returns the node at `location`.
#[must_use]
pub fn node_at<'a>(root: &'a Value, location: &[PathStep]) -> Option<&'a Value> {
    location.iter().try_fold(root, |node, step| match step {
        PathStep::Key(key) => node.get(key.as_str()),
        PathStep::Index(index) => node.get(*index),
    })
}

/// Returns the node at `location` mutably.
#[must_use]
pub fn node_at_mut<'a>(root: &'a mut Value, location: &[PathStep]) -> Option<&'a mut Value> {
    location.iter().try_fold(root, |node, step| match step {
        PathStep::Key(key) => node.get_mut(key.as_str()),
        PathStep::Index(index) => node.get_mut(*index),
    })
}

/// Removes the node at `location` and returns it.
///
/// Removing the root leaves `null` behind.
pub fn remove_at(root: &mut Value, location: &[PathStep]) -> Option<Value> {
    let Some((last, parent_path)) = location.split_last() else {
        return Some(root.take());
    };
    let parent = node_at_mut(root, parent_path)?;
    match last {
        PathStep::Key(key) => parent.as_object_mut()?.shift_remove(key.as_str()),
        PathStep::Index(index) => {
            let items = parent.as_array_mut()?;
            (*index < items.len()).then(|| items.remove(*index))
        }
    }
}

// ============================================================================
// SECTION: Expression
// ============================================================================

/// Compiled selector expression.
#[derive(Debug, Clone)]
pub struct PathExpression {
    /// Source text, kept for diagnostics.
    source: String,
    /// Compiled form; `None` addresses the root.
    compiled: Option<Compiled>,
}

impl PathExpression {
    /// Compiles a selector expression.
    ///
    /// # Errors
    ///
    /// Returns [`TransformValueError::InvalidPath`] on malformed input.
    pub fn parse(source: &str) -> Result<Self, TransformValueError> {
        let trimmed = source.trim();
        let compiled = match trimmed {
            "" | "$" | "@" => None,
            _ => Some(Compiled::compile(&absolute(trimmed)).map_err(|reason| {
                TransformValueError::InvalidPath {
                    path: source.to_string(),
                    reason: reason.trim().to_string(),
                }
            })?),
        };
        Ok(Self {
            source: source.to_string(),
            compiled,
        })
    }

    /// Returns the source text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Returns true when the expression addresses the root itself.
    #[must_use]
    pub const fn is_identity(&self) -> bool {
        self.compiled.is_none()
    }

    /// Selects matching locations in document order.
    #[must_use]
    pub fn select(&self, root: &Value) -> Vec<Location> {
        let Some(compiled) = &self.compiled else {
            return vec![Location::new()];
        };
        let matches = compiled.select(root).unwrap_or_default();
        locate(root, &matches)
    }

    /// Selects matching node values in document order.
    #[must_use]
    pub fn select_values<'a>(&self, root: &'a Value) -> Vec<&'a Value> {
        self.select(root).iter().filter_map(|location| node_at(root, location)).collect()
    }
}

impl PartialEq for PathExpression {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl fmt::Display for PathExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

// ============================================================================
// SECTION: Location Recovery
// ============================================================================

/// Rewrites `@`-rooted and bare expressions to the `$` form.
fn absolute(expression: &str) -> String {
    if expression.starts_with('$') {
        expression.to_string()
    } else if let Some(rest) = expression.strip_prefix('@') {
        format!("${rest}")
    } else if expression.starts_with('[') || expression.starts_with('.') {
        format!("${expression}")
    } else {
        format!("$.{expression}")
    }
}

/// Maps selected node references back to their locations under `root`.
fn locate(root: &Value, matches: &[&Value]) -> Vec<Location> {
    if matches.is_empty() {
        return Vec::new();
    }
    let wanted: HashSet<*const Value> =
        matches.iter().map(|node| std::ptr::from_ref(*node)).collect();
    let mut found = Vec::new();
    let mut trail = Location::new();
    walk(root, &wanted, &mut trail, &mut found);
    found
}

/// Pre-order walk collecting the locations of wanted nodes.
fn walk(
    node: &Value,
    wanted: &HashSet<*const Value>,
    trail: &mut Location,
    found: &mut Vec<Location>,
) {
    if wanted.contains(&std::ptr::from_ref(node)) {
        found.push(trail.clone());
    }
    if found.len() == wanted.len() {
        return;
    }
    match node {
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                trail.push(PathStep::Index(index));
                walk(item, wanted, trail, found);
                trail.pop();
            }
        }
        Value::Object(members) => {
            for (key, member) in members {
                trail.push(PathStep::Key(key.clone()));
                walk(member, wanted, trail, found);
                trail.pop();
            }
        }
        _ => {}
    }
}
