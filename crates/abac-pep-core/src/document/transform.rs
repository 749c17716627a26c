// crates/abac-pep-core/src/document/transform.rs
// ============================================================================
// Module: Document Path Transformer
// Description: Condition/action interpreter over JSON documents.
// Purpose: Replace, blacken, and delete nodes addressed by path selectors.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! A content filter constraint carries a list of [`Condition`]s. Each
//! condition selects nodes with a path expression and applies its
//! [`Transformation`]s to every selected node, in order. Action paths are
//! relative to the selected node; an action without a path targets the node
//! itself.
//! Invariants:
//! - Action parameters are validated before the document is touched.
//! - Deletions within one condition are applied after its other actions, in
//!   reverse document order, so sibling indices stay valid.
//! - Masking counts characters, not bytes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde_json::Value;

use crate::document::path::Location;
use crate::document::path::PathExpression;
use crate::document::path::node_at;
use crate::document::path::node_at_mut;
use crate::document::path::remove_at;
use crate::error::TransformValueError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Mask glyph used when a blacken action names no replacement.
pub const DEFAULT_MASK: &str = "\u{2588}";

/// Action key holding the count of leading characters left visible.
const DISCLOSE_LEFT: &str = "discloseLeft";
/// Action key holding the count of trailing characters left visible.
const DISCLOSE_RIGHT: &str = "discloseRight";

// ============================================================================
// SECTION: Constraint Model
// ============================================================================

/// Kind of a transformation action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    /// Overwrite the target with the replacement.
    Replace,
    /// Partially mask the target's text.
    Blacken,
    /// Remove the target.
    Delete,
}

/// One action of a condition, as written in the constraint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transformation {
    /// Target path relative to the selected node.
    #[serde(default)]
    pub path: Option<String>,
    /// Action kind.
    #[serde(rename = "type")]
    pub kind: ActionKind,
    /// Replacement value (replace) or mask text (blacken).
    #[serde(default)]
    pub replacement: Option<Value>,
    /// Leading characters left visible by blacken.
    #[serde(default)]
    pub disclose_left: Option<Value>,
    /// Trailing characters left visible by blacken.
    #[serde(default)]
    pub disclose_right: Option<Value>,
}

/// Node selection plus the actions applied to each selected node.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Selector for the nodes to transform.
    pub path: String,
    /// Comparison family carried by the policy author; informational.
    #[serde(default, alias = "type")]
    pub comparison_type: Option<String>,
    /// Comparison operand carried by the policy author; informational.
    #[serde(default)]
    pub value: Option<Value>,
    /// Ordered actions.
    #[serde(default)]
    pub actions: Vec<Transformation>,
}

// ============================================================================
// SECTION: Compiled Form
// ============================================================================

/// Action with parsed paths and validated parameters.
#[derive(Debug, Clone, PartialEq)]
enum CompiledAction {
    /// Overwrite the target.
    Replace {
        /// Relative target.
        path: Option<PathExpression>,
        /// Replacement value.
        replacement: Value,
    },
    /// Mask the target's text.
    Blacken {
        /// Relative target.
        path: Option<PathExpression>,
        /// Mask parameters.
        mask: MaskSpec,
    },
    /// Remove the target.
    Delete {
        /// Relative target; `None` removes the selected node.
        path: Option<PathExpression>,
    },
}

/// Validated blacken parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskSpec {
    /// Text emitted per masked character.
    replacement: String,
    /// Leading characters left visible.
    disclose_left: usize,
    /// Trailing characters left visible.
    disclose_right: usize,
}

impl MaskSpec {
    /// Creates a mask specification.
    #[must_use]
    pub fn new(replacement: impl Into<String>, disclose_left: usize, disclose_right: usize) -> Self {
        Self {
            replacement: replacement.into(),
            disclose_left,
            disclose_right,
        }
    }

    /// Masks `text` according to this specification.
    #[must_use]
    pub fn apply(&self, text: &str) -> String {
        blacken(text, &self.replacement, self.disclose_left, self.disclose_right)
    }
}

/// Condition with a parsed selector and compiled actions.
#[derive(Debug, Clone, PartialEq)]
struct CompiledCondition {
    /// Node selector.
    selector: PathExpression,
    /// Actions in order.
    actions: Vec<CompiledAction>,
}

// ============================================================================
// SECTION: Transformer
// ============================================================================

/// Interprets a list of conditions against JSON documents.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentPathTransformer {
    /// Compiled conditions in order.
    conditions: Vec<CompiledCondition>,
}

impl DocumentPathTransformer {
    /// Compiles conditions, validating every path and action parameter.
    ///
    /// # Errors
    ///
    /// Returns [`TransformValueError`] for malformed paths, disclose counts,
    /// or blacken replacements.
    pub fn new(conditions: &[Condition]) -> Result<Self, TransformValueError> {
        let conditions = conditions
            .iter()
            .map(|condition| {
                let selector = PathExpression::parse(&condition.path)?;
                let actions =
                    condition.actions.iter().map(compile_action).collect::<Result<_, _>>()?;
                Ok(CompiledCondition {
                    selector,
                    actions,
                })
            })
            .collect::<Result<_, TransformValueError>>()?;
        Ok(Self {
            conditions,
        })
    }

    /// Reads the `conditions` list of a content filter constraint.
    ///
    /// Looks at the top level first and then inside an `obligation` member.
    ///
    /// # Errors
    ///
    /// Returns [`TransformValueError::MalformedConstraint`] when the list is
    /// missing or not shaped as conditions, or any compile error.
    pub fn from_constraint(constraint: &Value) -> Result<Self, TransformValueError> {
        let raw = constraint
            .get("conditions")
            .or_else(|| constraint.get("obligation").and_then(|inner| inner.get("conditions")))
            .ok_or_else(|| {
                TransformValueError::MalformedConstraint("missing 'conditions'".to_string())
            })?;
        let conditions = Vec::<Condition>::deserialize(raw)
            .map_err(|err| TransformValueError::MalformedConstraint(err.to_string()))?;
        Self::new(&conditions)
    }

    /// Applies every condition in order and returns the mutated document.
    ///
    /// # Errors
    ///
    /// Returns [`TransformValueError::ValueNotTextual`] when blacken targets a
    /// container or null.
    pub fn apply(&self, mut document: Value) -> Result<Value, TransformValueError> {
        for condition in &self.conditions {
            let mut removals: Vec<Location> = Vec::new();
            for selected in condition.selector.select(&document) {
                for action in &condition.actions {
                    match action {
                        CompiledAction::Replace {
                            path,
                            replacement,
                        } => {
                            for target in targets(&document, &selected, path.as_ref()) {
                                if let Some(node) = node_at_mut(&mut document, &target) {
                                    *node = coerce_like(node, replacement);
                                }
                            }
                        }
                        CompiledAction::Blacken {
                            path,
                            mask,
                        } => {
                            for target in targets(&document, &selected, path.as_ref()) {
                                if let Some(node) = node_at_mut(&mut document, &target) {
                                    let text = masked_source(node).ok_or_else(|| {
                                        TransformValueError::ValueNotTextual {
                                            path: path
                                                .as_ref()
                                                .map_or_else(String::new, ToString::to_string),
                                        }
                                    })?;
                                    *node = Value::String(mask.apply(&text));
                                }
                            }
                        }
                        CompiledAction::Delete {
                            path: Some(path),
                        } => removals.extend(targets(&document, &selected, Some(path))),
                        CompiledAction::Delete {
                            path: None,
                        } => {
                            removals.push(selected.clone());
                            break;
                        }
                    }
                }
            }
            removals.sort();
            removals.dedup();
            for location in removals.iter().rev() {
                remove_at(&mut document, location);
            }
        }
        Ok(document)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Validates one action.
fn compile_action(action: &Transformation) -> Result<CompiledAction, TransformValueError> {
    let path = action
        .path
        .as_deref()
        .filter(|path| !path.trim().is_empty())
        .map(PathExpression::parse)
        .transpose()?;
    Ok(match action.kind {
        ActionKind::Replace => CompiledAction::Replace {
            path,
            replacement: action.replacement.clone().unwrap_or(Value::Null),
        },
        ActionKind::Blacken => CompiledAction::Blacken {
            path,
            mask: MaskSpec::new(
                mask_text(action.replacement.as_ref())?,
                disclose_count(action.disclose_left.as_ref(), DISCLOSE_LEFT)?,
                disclose_count(action.disclose_right.as_ref(), DISCLOSE_RIGHT)?,
            ),
        },
        ActionKind::Delete => CompiledAction::Delete {
            path,
        },
    })
}

/// Resolves action targets relative to a selected node.
fn targets(document: &Value, selected: &Location, path: Option<&PathExpression>) -> Vec<Location> {
    let Some(path) = path else {
        return vec![selected.clone()];
    };
    let Some(node) = node_at(document, selected) else {
        return Vec::new();
    };
    path.select(node)
        .into_iter()
        .map(|relative| {
            let mut absolute = selected.clone();
            absolute.extend(relative);
            absolute
        })
        .collect()
}

/// Reads a disclose count; absent or null means zero.
fn disclose_count(value: Option<&Value>, key: &str) -> Result<usize, TransformValueError> {
    let invalid = || TransformValueError::DiscloseNotInteger {
        key: key.to_string(),
    };
    match value {
        None | Some(Value::Null) => Ok(0),
        Some(Value::Number(number)) => {
            number.as_u64().and_then(|count| usize::try_from(count).ok()).ok_or_else(invalid)
        }
        Some(Value::String(text)) => text.trim().parse::<usize>().map_err(|_| invalid()),
        Some(_) => Err(invalid()),
    }
}

/// Reads the blacken replacement; absent or null means [`DEFAULT_MASK`].
fn mask_text(value: Option<&Value>) -> Result<String, TransformValueError> {
    match value {
        None | Some(Value::Null) => Ok(DEFAULT_MASK.to_string()),
        Some(Value::String(text)) if !text.is_empty() => Ok(text.clone()),
        Some(_) => Err(TransformValueError::ReplacementNotTextual),
    }
}

/// Returns the text a blacken action masks.
fn masked_source(node: &Value) -> Option<String> {
    match node {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

/// Converts the replacement to the structural kind of the original node.
fn coerce_like(original: &Value, replacement: &Value) -> Value {
    match (original, replacement) {
        (Value::String(_), Value::Number(number)) => Value::String(number.to_string()),
        (Value::String(_), Value::Bool(flag)) => Value::String(flag.to_string()),
        (Value::Number(_), Value::String(text)) => text
            .trim()
            .parse::<serde_json::Number>()
            .map_or_else(|_| replacement.clone(), Value::Number),
        (Value::Bool(_), Value::String(text)) => match text.trim() {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => replacement.clone(),
        },
        _ => replacement.clone(),
    }
}

/// Keeps `disclose_left` leading and `disclose_right` trailing characters and
/// emits `replacement` once per character in between.
///
/// Text no longer than the disclosed total is returned unchanged.
#[must_use]
pub fn blacken(text: &str, replacement: &str, disclose_left: usize, disclose_right: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= disclose_left.saturating_add(disclose_right) {
        return text.to_string();
    }
    let masked = chars.len() - disclose_left - disclose_right;
    let mut out = String::with_capacity(text.len() + masked * replacement.len());
    out.extend(&chars[.. disclose_left]);
    for _ in 0 .. masked {
        out.push_str(replacement);
    }
    out.extend(&chars[chars.len() - disclose_right ..]);
    out
}
