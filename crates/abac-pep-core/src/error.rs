// crates/abac-pep-core/src/error.rs
// ============================================================================
// Module: Enforcement Errors
// Description: Access denial, transform value, and handler failure types.
// Purpose: Keep denial and validation failures distinct at every boundary.
// Dependencies: serde_json, thiserror
// ============================================================================

//! ## Overview
//! Enforcement failures fall into three families: [`AccessDenied`] for every
//! refusal, [`TransformValueError`] for malformed transformation parameters,
//! and raw handler failures that still have to pass through the error-mapping
//! chain before they are surfaced.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::error::Error as StdError;

use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Boxed error raised by handler bodies.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Default denial message.
pub const ACCESS_DENIED_MESSAGE: &str = "Access denied.";

/// Refusal of access, optionally carrying a detail and an inner cause.
///
/// # Invariants
/// - The display text always starts with [`ACCESS_DENIED_MESSAGE`].
#[derive(Debug, Error)]
#[error("{}", render_denial(.detail.as_deref()))]
pub struct AccessDenied {
    /// Human-readable detail appended to the default message.
    detail: Option<String>,
    /// Underlying failure, when the denial wraps one.
    #[source]
    cause: Option<BoxError>,
}

impl AccessDenied {
    /// Creates a denial without detail.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            detail: None,
            cause: None,
        }
    }

    /// Creates a denial with a detail message.
    #[must_use]
    pub fn with_detail(detail: impl Into<String>) -> Self {
        Self {
            detail: Some(detail.into()),
            cause: None,
        }
    }

    /// Creates a denial wrapping a cause.
    #[must_use]
    pub fn with_cause(detail: impl Into<String>, cause: BoxError) -> Self {
        Self {
            detail: Some(detail.into()),
            cause: Some(cause),
        }
    }

    /// Creates the denial raised for obligations no provider can handle.
    #[must_use]
    pub fn unhandled_obligations(unhandled: &[Value]) -> Self {
        let listed = Value::Array(unhandled.to_vec()).to_string();
        Self::with_detail(format!("No handler for obligation: {listed}"))
    }

    /// Returns the detail, if any.
    #[must_use]
    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    /// Returns the wrapped cause, if any.
    #[must_use]
    pub fn cause(&self) -> Option<&BoxError> {
        self.cause.as_ref()
    }
}

impl Default for AccessDenied {
    fn default() -> Self {
        Self::new()
    }
}

/// Formats the denial message.
fn render_denial(detail: Option<&str>) -> String {
    match detail {
        Some(detail) if !detail.is_empty() => format!("{ACCESS_DENIED_MESSAGE} {detail}"),
        _ => ACCESS_DENIED_MESSAGE.to_string(),
    }
}

/// Malformed parameters on a document transformation action.
///
/// # Invariants
/// - Raised before the document is mutated by the failing action.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransformValueError {
    /// A disclose count was present but not a non-negative integer.
    #[error("An action's '{key}' is not an integer.")]
    DiscloseNotInteger {
        /// Offending action key.
        key: String,
    },
    /// A blacken replacement was present but not a non-empty string.
    #[error("'replacement' of 'blacken' action is not textual.")]
    ReplacementNotTextual,
    /// A blacken target was not a scalar that can be masked.
    #[error("value at '{path}' is not textual and cannot be blackened")]
    ValueNotTextual {
        /// Action path that selected the value.
        path: String,
    },
    /// A selector expression could not be parsed.
    #[error("invalid path expression '{path}': {reason}")]
    InvalidPath {
        /// Offending expression.
        path: String,
        /// Parse failure reason.
        reason: String,
    },
    /// The constraint document lacks a required member.
    #[error("malformed content filter constraint: {0}")]
    MalformedConstraint(String),
}

/// Failure while building or running an enforcement bundle.
#[derive(Debug, Error)]
pub enum EnforcementError {
    /// Enforcement must refuse access.
    #[error(transparent)]
    AccessDenied(#[from] AccessDenied),
    /// A transformation action carried malformed parameters.
    #[error(transparent)]
    TransformValue(#[from] TransformValueError),
    /// A handler body failed and the error still needs mapping.
    #[error("constraint handler failed: {0}")]
    Handler(BoxError),
}

impl EnforcementError {
    /// Returns true for access denials.
    #[must_use]
    pub const fn is_access_denied(&self) -> bool {
        matches!(self, Self::AccessDenied(_))
    }

    /// Converts the error into a boxed error for the mapping chain.
    #[must_use]
    pub fn into_boxed(self) -> BoxError {
        match self {
            Self::Handler(error) => error,
            other => Box::new(other),
        }
    }
}
