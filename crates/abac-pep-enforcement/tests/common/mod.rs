// crates/abac-pep-enforcement/tests/common/mod.rs
// ============================================================================
// Module: Common Enforcement Test Fixtures
// Description: Fixed PDP transport, audit capture, and handler providers.
// Purpose: Drive enforcement points without a network.
// Dependencies: abac-pep-core, abac-pep-pdp, async-trait, tokio-stream
// ============================================================================

//! ## Overview
//! [`FixedConnection`] answers every one-shot call with the same decision and
//! holds streams open without pushing anything. [`MemoryAuditSink`] keeps
//! every audit event for inspection.

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::unwrap_in_result,
    reason = "Test fixtures favor direct unwraps for setup clarity."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use abac_pep_core::ArgumentConsumerProvider;
use abac_pep_core::ArgumentHandler;
use abac_pep_core::BoxError;
use abac_pep_core::ConstraintHandlerProvider;
use abac_pep_core::ConstraintRegistry;
use abac_pep_core::Decision;
use abac_pep_core::EnforcementAuditEvent;
use abac_pep_core::EnforcementAuditSink;
use abac_pep_core::ErrorMapperHandler;
use abac_pep_core::ErrorMapperProvider;
use abac_pep_core::ProviderCapability;
use abac_pep_core::ResultConsumerHandler;
use abac_pep_core::ResultConsumerProvider;
use abac_pep_core::RunnableHandler;
use abac_pep_core::RunnableProvider;
use abac_pep_core::Signal;
use abac_pep_core::Subscription;
use abac_pep_core::constraint_type;
use abac_pep_pdp::DecisionStream;
use abac_pep_pdp::PdpConnection;
use abac_pep_pdp::PdpError;
use async_trait::async_trait;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Transport
// ============================================================================

/// Transport answering every one-shot call with a fixed decision.
pub struct FixedConnection {
    /// Decision returned by one-shot calls.
    decision: Decision,
    /// One-shot calls observed.
    pub once_calls: AtomicUsize,
}

impl FixedConnection {
    /// Creates a transport answering with `decision`.
    pub fn new(decision: Decision) -> Arc<Self> {
        Arc::new(Self {
            decision,
            once_calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl PdpConnection for FixedConnection {
    async fn decide_once(&self, _subscription: &Subscription) -> Result<Decision, PdpError> {
        self.once_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.decision.clone())
    }

    async fn decide(&self, _subscription: &Subscription) -> Result<DecisionStream, PdpError> {
        Ok(Box::pin(tokio_stream::pending()))
    }
}

// ============================================================================
// SECTION: Audit
// ============================================================================

/// Audit sink keeping events in memory.
#[derive(Default)]
pub struct MemoryAuditSink {
    /// Recorded events.
    pub events: Mutex<Vec<EnforcementAuditEvent>>,
}

impl MemoryAuditSink {
    /// Returns the recorded events.
    pub fn events(&self) -> Vec<EnforcementAuditEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl EnforcementAuditSink for MemoryAuditSink {
    fn record(&self, event: &EnforcementAuditEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

// ============================================================================
// SECTION: Providers
// ============================================================================

/// Plain error carrying a message.
#[derive(Debug)]
pub struct Labeled(pub String);

impl std::fmt::Display for Labeled {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for Labeled {}

/// Creates a boxed [`Labeled`] error.
pub fn labeled(message: &str) -> BoxError {
    Box::new(Labeled(message.to_string()))
}

/// Counts `count` constraints at the configured signal.
pub struct CountingRunnable {
    /// Lifecycle point.
    pub signal: Signal,
    /// Invocation counter.
    pub calls: Arc<AtomicUsize>,
}

impl ConstraintHandlerProvider for CountingRunnable {
    fn signal(&self) -> Signal {
        self.signal
    }

    fn is_responsible(&self, constraint: &Value) -> bool {
        constraint_type(constraint) == Some("count")
    }
}

impl RunnableProvider for CountingRunnable {
    fn runnable_handler(&self, _constraint: &Value) -> RunnableHandler {
        let calls = Arc::clone(&self.calls);
        Box::new(move || {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }
}

/// Rewrites the `id` argument to the constraint's `id` member.
pub struct PinIdProvider;

impl ConstraintHandlerProvider for PinIdProvider {
    fn signal(&self) -> Signal {
        Signal::OnDecision
    }

    fn is_responsible(&self, constraint: &Value) -> bool {
        constraint_type(constraint) == Some("pinId")
    }
}

impl ArgumentConsumerProvider for PinIdProvider {
    fn argument_handler(&self, constraint: &Value) -> ArgumentHandler {
        let id = constraint.get("id").cloned().unwrap_or(Value::Null);
        Box::new(move |arguments| {
            if !arguments.contains_key("id") {
                return Err(labeled("missing id argument"));
            }
            arguments.insert("id".to_string(), id.clone());
            Ok(())
        })
    }
}

/// Result consumer failing on every element of `audit` constraints.
pub struct RejectingConsumer;

impl ConstraintHandlerProvider for RejectingConsumer {
    fn signal(&self) -> Signal {
        Signal::OnExecution
    }

    fn is_responsible(&self, constraint: &Value) -> bool {
        constraint_type(constraint) == Some("audit")
    }
}

impl ResultConsumerProvider for RejectingConsumer {
    fn result_consumer(&self, _constraint: &Value) -> ResultConsumerHandler {
        Box::new(|_element| Err(labeled("audit trail unavailable")))
    }
}

/// Maps any failure to `forbidden(<message>)` for `mapError` constraints.
pub struct ForbiddenMapper;

impl ConstraintHandlerProvider for ForbiddenMapper {
    fn signal(&self) -> Signal {
        Signal::OnExecution
    }

    fn is_responsible(&self, constraint: &Value) -> bool {
        constraint_type(constraint) == Some("mapError")
    }
}

impl ErrorMapperProvider for ForbiddenMapper {
    fn priority(&self) -> i32 {
        0
    }

    fn error_mapper(&self, _constraint: &Value) -> ErrorMapperHandler {
        Box::new(|error| labeled(&format!("forbidden({error})")))
    }
}

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Registry with the built-in providers plus every fixture provider.
pub fn registry(calls: &Arc<AtomicUsize>) -> ConstraintRegistry {
    ConstraintRegistry::builder()
        .with_builtin_providers()
        .capability(ProviderCapability::Runnable(Arc::new(CountingRunnable {
            signal: Signal::OnDecision,
            calls: Arc::clone(calls),
        })))
        .capability(ProviderCapability::ArgumentConsumer(Arc::new(PinIdProvider)))
        .capability(ProviderCapability::ResultConsumer(Arc::new(RejectingConsumer)))
        .capability(ProviderCapability::ErrorMapper(Arc::new(ForbiddenMapper)))
        .build()
}

/// Sample subscription.
pub fn subscription() -> Subscription {
    Subscription::builder()
        .subject(json!({"name": "alice"}))
        .action("read")
        .resource(json!({"type": "patient", "id": 42}))
        .build()
}

/// Builds a constraint document of the given type.
pub fn constraint(kind: &str) -> Value {
    json!({ "type": kind })
}
