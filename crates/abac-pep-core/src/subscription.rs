// crates/abac-pep-core/src/subscription.rs
// ============================================================================
// Module: Authorization Subscription
// Description: Subject/action/resource/environment tuple sent to the PDP.
// Purpose: Provide a structurally keyed authorization question.
// Dependencies: serde, serde_json, sha2
// ============================================================================

//! ## Overview
//! A [`Subscription`] is the authorization question posed to the PDP. Its
//! identity is structural: two subscriptions built independently from equal
//! field values are the same subscription for caching and fan-out.
//! Invariants:
//! - Subscriptions are immutable once built.
//! - [`Subscription::canonical_key`] is compact JSON with object members sorted
//!   by key at every depth, so member order never changes identity.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt::Write as _;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use sha2::Digest;
use sha2::Sha256;

// ============================================================================
// SECTION: Subscription
// ============================================================================

/// Authorization question sent to the PDP.
///
/// # Invariants
/// - Field values are opaque JSON; no schema is enforced.
/// - Equality and hashing go through [`SubscriptionKey`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    /// Who is asking.
    #[serde(default)]
    subject: Value,
    /// What they want to do.
    #[serde(default)]
    action: Value,
    /// What they want to do it to.
    #[serde(default)]
    resource: Value,
    /// Ambient request context.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    environment: Value,
}

impl Subscription {
    /// Builds a subscription from its four components.
    #[must_use]
    pub const fn new(subject: Value, action: Value, resource: Value, environment: Value) -> Self {
        Self {
            subject,
            action,
            resource,
            environment,
        }
    }

    /// Starts a builder with all components set to null.
    #[must_use]
    pub fn builder() -> SubscriptionBuilder {
        SubscriptionBuilder::default()
    }

    /// Returns the subject component.
    #[must_use]
    pub const fn subject(&self) -> &Value {
        &self.subject
    }

    /// Returns the action component.
    #[must_use]
    pub const fn action(&self) -> &Value {
        &self.action
    }

    /// Returns the resource component.
    #[must_use]
    pub const fn resource(&self) -> &Value {
        &self.resource
    }

    /// Returns the environment component.
    #[must_use]
    pub const fn environment(&self) -> &Value {
        &self.environment
    }

    /// Returns the structural identity key for this subscription.
    #[must_use]
    pub fn canonical_key(&self) -> SubscriptionKey {
        let mut members = Map::new();
        members.insert("action".to_string(), sorted(&self.action));
        if !self.environment.is_null() {
            members.insert("environment".to_string(), sorted(&self.environment));
        }
        members.insert("resource".to_string(), sorted(&self.resource));
        members.insert("subject".to_string(), sorted(&self.subject));
        SubscriptionKey(Value::Object(members).to_string())
    }

    /// Returns a short hex digest of the canonical key for log correlation.
    #[must_use]
    pub fn short_id(&self) -> String {
        self.canonical_key().short_id()
    }
}

// ============================================================================
// SECTION: Builder
// ============================================================================

/// Incremental builder for [`Subscription`].
#[derive(Debug, Clone, Default)]
pub struct SubscriptionBuilder {
    /// Subject under construction.
    subject: Value,
    /// Action under construction.
    action: Value,
    /// Resource under construction.
    resource: Value,
    /// Environment under construction.
    environment: Value,
}

impl SubscriptionBuilder {
    /// Sets the subject.
    #[must_use]
    pub fn subject(mut self, subject: impl Into<Value>) -> Self {
        self.subject = subject.into();
        self
    }

    /// Sets the action.
    #[must_use]
    pub fn action(mut self, action: impl Into<Value>) -> Self {
        self.action = action.into();
        self
    }

    /// Sets the resource.
    #[must_use]
    pub fn resource(mut self, resource: impl Into<Value>) -> Self {
        self.resource = resource.into();
        self
    }

    /// Sets the environment.
    #[must_use]
    pub fn environment(mut self, environment: impl Into<Value>) -> Self {
        self.environment = environment.into();
        self
    }

    /// Finishes the subscription.
    #[must_use]
    pub fn build(self) -> Subscription {
        Subscription::new(self.subject, self.action, self.resource, self.environment)
    }
}

// ============================================================================
// SECTION: Identity Key
// ============================================================================

/// Rebuilds `value` with object members in key order at every depth.
fn sorted(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut members: Vec<(&String, &Value)> = map.iter().collect();
            members.sort_unstable_by(|left, right| left.0.cmp(right.0));
            Value::Object(
                members.into_iter().map(|(key, item)| (key.clone(), sorted(item))).collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(sorted).collect()),
        other => other.clone(),
    }
}

/// Canonical JSON text identifying a subscription structurally.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionKey(String);

impl SubscriptionKey {
    /// Returns the canonical JSON text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the first 12 hex characters of the SHA-256 digest.
    #[must_use]
    pub fn short_id(&self) -> String {
        let digest = Sha256::digest(self.0.as_bytes());
        let mut out = String::with_capacity(12);
        for byte in digest.iter().take(6) {
            let _ = write!(out, "{byte:02x}");
        }
        out
    }
}
