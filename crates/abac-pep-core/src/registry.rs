// crates/abac-pep-core/src/registry.rs
// ============================================================================
// Module: Constraint Handler Registry
// Description: Typed buckets of registered constraint handler providers.
// Purpose: Hold providers by capability for resolution at request time.
// Dependencies: crate::providers
// ============================================================================

//! ## Overview
//! The [`ConstraintRegistry`] is built once at startup and read thereafter.
//! Providers declare their capabilities when registered, so request-time
//! resolution never inspects provider types.
//! Invariants:
//! - Registration order is preserved within each bucket.
//! - The registry is immutable after [`ConstraintRegistryBuilder::build`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use crate::document::providers::JsonContentFilterProvider;
use crate::document::providers::JsonPathPredicateProvider;
use crate::providers::ArgumentConsumerProvider;
use crate::providers::DocumentTransformProvider;
use crate::providers::ErrorMapperProvider;
use crate::providers::ErrorSideEffectProvider;
use crate::providers::HandlerProvider;
use crate::providers::PredicateFilterProvider;
use crate::providers::ProviderCapability;
use crate::providers::ResultConsumerProvider;
use crate::providers::RunnableProvider;
use crate::providers::TypedTransformProvider;

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Registered providers grouped by capability.
#[derive(Clone, Default)]
pub struct ConstraintRegistry {
    /// Side-effect providers.
    pub(crate) runnables: Vec<Arc<dyn RunnableProvider>>,
    /// Argument consumer providers.
    pub(crate) argument_consumers: Vec<Arc<dyn ArgumentConsumerProvider>>,
    /// Result consumer providers.
    pub(crate) result_consumers: Vec<Arc<dyn ResultConsumerProvider>>,
    /// Filter predicate providers.
    pub(crate) predicate_filters: Vec<Arc<dyn PredicateFilterProvider>>,
    /// Predicate/action rule providers.
    pub(crate) typed_transforms: Vec<Arc<dyn TypedTransformProvider>>,
    /// Document rewrite providers.
    pub(crate) document_transforms: Vec<Arc<dyn DocumentTransformProvider>>,
    /// Error observer providers.
    pub(crate) error_side_effects: Vec<Arc<dyn ErrorSideEffectProvider>>,
    /// Error translator providers.
    pub(crate) error_mappers: Vec<Arc<dyn ErrorMapperProvider>>,
}

impl ConstraintRegistry {
    /// Starts an empty builder.
    #[must_use]
    pub fn builder() -> ConstraintRegistryBuilder {
        ConstraintRegistryBuilder::default()
    }

    /// Returns the total number of capability registrations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.runnables.len()
            + self.argument_consumers.len()
            + self.result_consumers.len()
            + self.predicate_filters.len()
            + self.typed_transforms.len()
            + self.document_transforms.len()
            + self.error_side_effects.len()
            + self.error_mappers.len()
    }

    /// Returns true when nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for ConstraintRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstraintRegistry")
            .field("runnables", &self.runnables.len())
            .field("argument_consumers", &self.argument_consumers.len())
            .field("result_consumers", &self.result_consumers.len())
            .field("predicate_filters", &self.predicate_filters.len())
            .field("typed_transforms", &self.typed_transforms.len())
            .field("document_transforms", &self.document_transforms.len())
            .field("error_side_effects", &self.error_side_effects.len())
            .field("error_mappers", &self.error_mappers.len())
            .finish()
    }
}

// ============================================================================
// SECTION: Builder
// ============================================================================

/// Builder collecting provider registrations.
#[derive(Default)]
pub struct ConstraintRegistryBuilder {
    /// Registry under construction.
    registry: ConstraintRegistry,
}

impl ConstraintRegistryBuilder {
    /// Registers a provider under every capability it declares.
    #[must_use]
    pub fn provider<P: HandlerProvider + 'static>(mut self, provider: Arc<P>) -> Self {
        for capability in provider.capabilities() {
            self.push(capability);
        }
        self
    }

    /// Registers a single capability.
    #[must_use]
    pub fn capability(mut self, capability: ProviderCapability) -> Self {
        self.push(capability);
        self
    }

    /// Registers the built-in JSON content filter and JSONPath predicate providers.
    #[must_use]
    pub fn with_builtin_providers(self) -> Self {
        self.provider(Arc::new(JsonContentFilterProvider))
            .provider(Arc::new(JsonPathPredicateProvider))
    }

    /// Finishes the registry.
    #[must_use]
    pub fn build(self) -> ConstraintRegistry {
        self.registry
    }

    /// Files a capability into its bucket.
    fn push(&mut self, capability: ProviderCapability) {
        tracing::debug!(capability = capability.label(), "registered constraint handler provider");
        let registry = &mut self.registry;
        match capability {
            ProviderCapability::Runnable(provider) => registry.runnables.push(provider),
            ProviderCapability::ArgumentConsumer(provider) => {
                registry.argument_consumers.push(provider);
            }
            ProviderCapability::ResultConsumer(provider) => {
                registry.result_consumers.push(provider);
            }
            ProviderCapability::PredicateFilter(provider) => {
                registry.predicate_filters.push(provider);
            }
            ProviderCapability::TypedTransform(provider) => {
                registry.typed_transforms.push(provider);
            }
            ProviderCapability::DocumentTransform(provider) => {
                registry.document_transforms.push(provider);
            }
            ProviderCapability::ErrorSideEffect(provider) => {
                registry.error_side_effects.push(provider);
            }
            ProviderCapability::ErrorMapper(provider) => registry.error_mappers.push(provider),
        }
    }
}
