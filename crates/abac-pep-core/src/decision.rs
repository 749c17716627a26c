// crates/abac-pep-core/src/decision.rs
// ============================================================================
// Module: Authorization Decision
// Description: Verdict plus obligations, advice, and resource replacement.
// Purpose: Model PDP decisions and the lifecycle signals handlers fire on.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! A [`Decision`] is what the PDP answers for a subscription. Obligations must
//! all be handled before enforcement proceeds; advice is best effort.
//! Invariants:
//! - Missing or null constraint lists deserialize as empty lists.
//! - Verdicts use the PDP wire spelling (`PERMIT`, `NOT_APPLICABLE`, ...).

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde_json::Value;

// ============================================================================
// SECTION: Verdict
// ============================================================================

/// Outcome of a policy evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    /// Access is granted.
    Permit,
    /// Access is refused.
    Deny,
    /// The PDP could not reach a decision, or none has arrived yet.
    #[default]
    Indeterminate,
    /// No policy applied.
    NotApplicable,
}

impl Verdict {
    /// Returns the wire label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Permit => "PERMIT",
            Self::Deny => "DENY",
            Self::Indeterminate => "INDETERMINATE",
            Self::NotApplicable => "NOT_APPLICABLE",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Decision
// ============================================================================

/// Authorization decision returned by the PDP.
///
/// # Invariants
/// - `obligations` and `advice` keep the order the PDP sent.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Decision {
    /// Verdict of the evaluation.
    #[serde(rename = "decision", default)]
    pub verdict: Verdict,
    /// Mandatory side conditions.
    #[serde(default, deserialize_with = "nullable_list", skip_serializing_if = "Vec::is_empty")]
    pub obligations: Vec<Value>,
    /// Optional side conditions.
    #[serde(default, deserialize_with = "nullable_list", skip_serializing_if = "Vec::is_empty")]
    pub advice: Vec<Value>,
    /// Replacement for the protected resource, when the PDP supplies one.
    #[serde(rename = "resource", default, skip_serializing_if = "Option::is_none")]
    pub resource_replacement: Option<Value>,
}

impl Decision {
    /// Creates a decision with the given verdict and no constraints.
    #[must_use]
    pub const fn new(verdict: Verdict) -> Self {
        Self {
            verdict,
            obligations: Vec::new(),
            advice: Vec::new(),
            resource_replacement: None,
        }
    }

    /// Shorthand for a bare `PERMIT`.
    #[must_use]
    pub const fn permit() -> Self {
        Self::new(Verdict::Permit)
    }

    /// Shorthand for a bare `DENY`.
    #[must_use]
    pub const fn deny() -> Self {
        Self::new(Verdict::Deny)
    }

    /// Shorthand for a bare `INDETERMINATE`.
    #[must_use]
    pub const fn indeterminate() -> Self {
        Self::new(Verdict::Indeterminate)
    }

    /// Shorthand for a bare `NOT_APPLICABLE`.
    #[must_use]
    pub const fn not_applicable() -> Self {
        Self::new(Verdict::NotApplicable)
    }

    /// Appends an obligation.
    #[must_use]
    pub fn with_obligation(mut self, obligation: Value) -> Self {
        self.obligations.push(obligation);
        self
    }

    /// Appends an advice document.
    #[must_use]
    pub fn with_advice(mut self, advice: Value) -> Self {
        self.advice.push(advice);
        self
    }

    /// Sets the resource replacement.
    #[must_use]
    pub fn with_resource(mut self, resource: Value) -> Self {
        self.resource_replacement = Some(resource);
        self
    }

    /// Returns true when the verdict is `PERMIT`.
    #[must_use]
    pub fn is_permit(&self) -> bool {
        self.verdict == Verdict::Permit
    }
}

/// Treats an explicit `null` list the same as a missing one.
fn nullable_list<'de, D>(deserializer: D) -> Result<Vec<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default())
}

// ============================================================================
// SECTION: Lifecycle
// ============================================================================

/// Lifecycle point at which a provider's handler fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Signal {
    /// As soon as the decision is known, before the protected call.
    OnDecision,
    /// While the protected call's result is being produced.
    OnExecution,
}

/// Enforcement phase a bundle is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnforcementPhase {
    /// Before the protected call; handles arguments.
    Pre,
    /// After the protected call; handles the result.
    Post,
}

impl EnforcementPhase {
    /// Returns the signal providers must carry to take part in this phase.
    #[must_use]
    pub const fn signal(self) -> Signal {
        match self {
            Self::Pre => Signal::OnDecision,
            Self::Post => Signal::OnExecution,
        }
    }

    /// Returns a stable label for logs and audit records.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pre => "pre",
            Self::Post => "post",
        }
    }
}
