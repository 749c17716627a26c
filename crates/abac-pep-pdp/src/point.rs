// crates/abac-pep-pdp/src/point.rs
// ============================================================================
// Module: Policy Decision Point Facade
// Description: Single entry point for decisions used by enforcement points.
// Purpose: Wire one transport, hub, and cache together per process.
// Dependencies: abac-pep-core
// ============================================================================

//! ## Overview
//! [`PolicyDecisionPoint`] is created once at startup and passed by reference
//! to every enforcement point. It offers cached, one-shot, and streamed
//! decisions for a subscription.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use abac_pep_core::Decision;
use abac_pep_core::Subscription;

use crate::cache::SubscriptionCache;
use crate::channel::DecisionChannel;
use crate::client::PdpConnection;
use crate::hub::DecisionHub;
use crate::hub::ListenerHandle;
use crate::listener::DecisionListener;

// ============================================================================
// SECTION: Facade
// ============================================================================

/// Transport, hub, and cache for one PDP.
pub struct PolicyDecisionPoint {
    /// Fan-out hub.
    hub: DecisionHub,
    /// Decision cache.
    cache: SubscriptionCache,
}

impl PolicyDecisionPoint {
    /// Creates a facade over a transport.
    #[must_use]
    pub fn new(connection: Arc<dyn PdpConnection>, reconnect_delay: Duration) -> Self {
        let hub = DecisionHub::new(connection, reconnect_delay);
        let cache = SubscriptionCache::new(hub.clone());
        Self {
            hub,
            cache,
        }
    }

    /// Returns the hub.
    #[must_use]
    pub const fn hub(&self) -> &DecisionHub {
        &self.hub
    }

    /// Returns the cache.
    #[must_use]
    pub const fn cache(&self) -> &SubscriptionCache {
        &self.cache
    }

    /// Returns a cached decision or fetches one.
    pub async fn decide(&self, subscription: &Subscription) -> Decision {
        self.cache.decide(subscription).await
    }

    /// Requests a fresh decision; failures yield `INDETERMINATE`.
    pub async fn decide_once(&self, subscription: &Subscription) -> Decision {
        DecisionChannel::decide_once(self.hub.connection().as_ref(), subscription, None).await
    }

    /// Requests a fresh decision and reports failures to `listener`.
    pub async fn decide_once_observed(
        &self,
        subscription: &Subscription,
        listener: &dyn DecisionListener,
    ) -> Decision {
        DecisionChannel::decide_once(self.hub.connection().as_ref(), subscription, Some(listener))
            .await
    }

    /// Subscribes to streamed decisions.
    #[must_use]
    pub fn subscribe_to_decision(&self, subscription: &Subscription) -> ListenerHandle {
        self.hub.subscribe(subscription)
    }

    /// Ends every subscription and clears the cache.
    pub fn end_transmission(&self) {
        self.cache.clear();
        self.hub.end_transmission();
    }
}
