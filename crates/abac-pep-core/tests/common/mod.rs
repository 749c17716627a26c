// crates/abac-pep-core/tests/common/mod.rs
// ============================================================================
// Module: Common Test Providers
// Description: Constraint handler providers shared by core tests.
// Purpose: Exercise every capability category with observable handlers.
// Dependencies: abac-pep-core, serde, serde_json
// ============================================================================

//! ## Overview
//! Small providers keyed on the constraint `type` member. Each one records
//! what it did so tests can assert exactly-once and ordering behavior.

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
use abac_pep_core::ErrorMapperHandler;
use abac_pep_core::ErrorMapperProvider;
use abac_pep_core::ErrorSideEffectHandler;
use abac_pep_core::ErrorSideEffectProvider;
use abac_pep_core::FilterPredicate;
use abac_pep_core::HandlerProvider;
use abac_pep_core::PredicateFilterProvider;
use abac_pep_core::ProviderCapability;
use abac_pep_core::ResultConsumerHandler;
use abac_pep_core::ResultConsumerProvider;
use abac_pep_core::RunnableHandler;
use abac_pep_core::RunnableProvider;
use abac_pep_core::Signal;
use abac_pep_core::TransformAction;
use abac_pep_core::TransformRule;
use abac_pep_core::TypedTransformProvider;
use abac_pep_core::constraint_type;
use abac_pep_core::member_text;
use abac_pep_core::typed_mutation;
use abac_pep_core::typed_predicate;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Result record used by typed predicates and mutations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    /// Display name.
    pub name: String,
    /// Age in years.
    pub age: u32,
}

/// Builds a constraint document of the given type.
pub fn constraint(kind: &str) -> Value {
    json!({ "type": kind })
}

/// Plain error carrying a message, used by error-chain tests.
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

// ============================================================================
// SECTION: Runnable
// ============================================================================

/// Counts invocations of `count` constraints.
pub struct CountingRunnable {
    /// Lifecycle point.
    pub signal: Signal,
    /// Shared invocation counter.
    pub calls: Arc<AtomicUsize>,
}

impl CountingRunnable {
    /// Creates a provider plus a handle on its counter.
    pub fn new(signal: Signal) -> (Arc<Self>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Arc::new(Self {
                signal,
                calls: Arc::clone(&calls),
            }),
            calls,
        )
    }
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

impl HandlerProvider for CountingRunnable {
    fn capabilities(self: Arc<Self>) -> Vec<ProviderCapability> {
        vec![ProviderCapability::Runnable(self)]
    }
}

/// Runnable that always fails for `fail` constraints.
pub struct FailingRunnable;

impl ConstraintHandlerProvider for FailingRunnable {
    fn signal(&self) -> Signal {
        Signal::OnDecision
    }

    fn is_responsible(&self, constraint: &Value) -> bool {
        constraint_type(constraint) == Some("fail")
    }
}

impl RunnableProvider for FailingRunnable {
    fn runnable_handler(&self, _constraint: &Value) -> RunnableHandler {
        Box::new(|| Err(labeled("runnable failed")))
    }
}

// ============================================================================
// SECTION: Argument Consumer
// ============================================================================

/// Increments the `id` argument for `incrementId` constraints.
pub struct IncrementIdProvider;

impl ConstraintHandlerProvider for IncrementIdProvider {
    fn signal(&self) -> Signal {
        Signal::OnDecision
    }

    fn is_responsible(&self, constraint: &Value) -> bool {
        constraint_type(constraint) == Some("incrementId")
    }
}

impl ArgumentConsumerProvider for IncrementIdProvider {
    fn argument_handler(&self, _constraint: &Value) -> ArgumentHandler {
        Box::new(|arguments| {
            let id = arguments
                .get("id")
                .and_then(Value::as_i64)
                .ok_or_else(|| labeled("argument 'id' is not an integer"))?;
            arguments.insert("id".to_string(), json!(id + 1));
            Ok(())
        })
    }
}

impl HandlerProvider for IncrementIdProvider {
    fn capabilities(self: Arc<Self>) -> Vec<ProviderCapability> {
        vec![ProviderCapability::ArgumentConsumer(self)]
    }
}

// ============================================================================
// SECTION: Result Consumer
// ============================================================================

/// Records every element observed for `observe` constraints.
#[derive(Default)]
pub struct RecordingConsumer {
    /// Observed elements.
    pub seen: Arc<Mutex<Vec<Value>>>,
}

impl ConstraintHandlerProvider for RecordingConsumer {
    fn signal(&self) -> Signal {
        Signal::OnExecution
    }

    fn is_responsible(&self, constraint: &Value) -> bool {
        constraint_type(constraint) == Some("observe")
    }
}

impl ResultConsumerProvider for RecordingConsumer {
    fn result_consumer(&self, _constraint: &Value) -> ResultConsumerHandler {
        let seen = Arc::clone(&self.seen);
        Box::new(move |element| {
            seen.lock().unwrap().push(element.clone());
            Ok(())
        })
    }
}

// ============================================================================
// SECTION: Predicate And Transform
// ============================================================================

/// Keeps people whose name equals the constraint's `name` member.
pub struct NameFilterProvider;

impl ConstraintHandlerProvider for NameFilterProvider {
    fn signal(&self) -> Signal {
        Signal::OnExecution
    }

    fn is_responsible(&self, constraint: &Value) -> bool {
        constraint_type(constraint) == Some("filterName")
    }
}

impl PredicateFilterProvider for NameFilterProvider {
    fn filter_predicate(&self, constraint: &Value) -> FilterPredicate {
        let wanted = member_text(constraint, "name").unwrap_or_default();
        typed_predicate(move |person: &Person| person.name == wanted)
    }
}

/// Rules over people: `ageUp` adds a year to adults named "Test",
/// `dropMinors` removes minors from a collection.
pub struct PersonRulesProvider;

impl ConstraintHandlerProvider for PersonRulesProvider {
    fn signal(&self) -> Signal {
        Signal::OnExecution
    }

    fn is_responsible(&self, constraint: &Value) -> bool {
        matches!(constraint_type(constraint), Some("ageUp" | "dropMinors"))
    }
}

impl TypedTransformProvider for PersonRulesProvider {
    fn transform_rules(&self, constraint: &Value) -> Vec<TransformRule> {
        match constraint_type(constraint) {
            Some("ageUp") => vec![TransformRule::new(
                typed_predicate(|person: &Person| person.name == "Test"),
                vec![TransformAction::Mutate(typed_mutation(|person: &mut Person| {
                    person.age += 1;
                    Ok(())
                }))],
            )],
            _ => vec![TransformRule::new(
                typed_predicate(|person: &Person| person.age < 18),
                vec![TransformAction::Delete {
                    path: None,
                }],
            )],
        }
    }
}

// ============================================================================
// SECTION: Error Handling
// ============================================================================

/// Wraps the error message in `label(...)` for `mapError` constraints.
pub struct LabelMapper {
    /// Priority of this mapper.
    pub priority: i32,
    /// Label applied by the mapper.
    pub label: &'static str,
}

impl ConstraintHandlerProvider for LabelMapper {
    fn signal(&self) -> Signal {
        Signal::OnExecution
    }

    fn is_responsible(&self, constraint: &Value) -> bool {
        constraint_type(constraint) == Some("mapError")
    }
}

impl ErrorMapperProvider for LabelMapper {
    fn priority(&self) -> i32 {
        self.priority
    }

    fn error_mapper(&self, _constraint: &Value) -> ErrorMapperHandler {
        let label = self.label;
        Box::new(move |error| labeled(&format!("{label}({error})")))
    }
}

/// Records error messages for `observeError` constraints.
#[derive(Default)]
pub struct ErrorRecorder {
    /// Observed error messages.
    pub seen: Arc<Mutex<Vec<String>>>,
}

impl ConstraintHandlerProvider for ErrorRecorder {
    fn signal(&self) -> Signal {
        Signal::OnExecution
    }

    fn is_responsible(&self, constraint: &Value) -> bool {
        constraint_type(constraint) == Some("observeError")
    }
}

impl ErrorSideEffectProvider for ErrorRecorder {
    fn error_side_effect(&self, _constraint: &Value) -> ErrorSideEffectHandler {
        let seen = Arc::clone(&self.seen);
        Box::new(move |error| seen.lock().unwrap().push(error.to_string()))
    }
}
