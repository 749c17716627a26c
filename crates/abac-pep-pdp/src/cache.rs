// crates/abac-pep-pdp/src/cache.rs
// ============================================================================
// Module: Subscription Cache
// Description: Last-known decision per subscription, refreshed by the hub.
// Purpose: Answer repeated decisions without a PDP round trip.
// Dependencies: abac-pep-core
// ============================================================================

//! ## Overview
//! [`SubscriptionCache`] maps subscription identity to the last decision seen.
//! A miss subscribes through the [`DecisionHub`] so streamed decisions keep
//! the entry fresh, then seeds the entry with a one-shot call.
//! Invariants:
//! - `put` is last-write-wins per subscription key.
//! - Streamed decisions only land for keys the cache is watching.
//! - A one-shot seed never overwrites a decision that streamed in first.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::Weak;

use abac_pep_core::Decision;
use abac_pep_core::Subscription;
use abac_pep_core::SubscriptionKey;

use crate::channel::DecisionChannel;
use crate::hub::DecisionHub;
use crate::hub::ListenerHandle;
use crate::listener::DecisionListener;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Decision store keyed by subscription identity.
type Entries = Mutex<HashMap<SubscriptionKey, Decision>>;

/// Hub handles held for watched subscriptions.
type Watched = Mutex<HashMap<SubscriptionKey, ListenerHandle>>;

/// Decision cache backed by a hub.
pub struct SubscriptionCache {
    /// Hub used on misses.
    hub: DecisionHub,
    /// Cached decisions.
    entries: Arc<Entries>,
    /// Hub handles held for cached subscriptions.
    watched: Arc<Watched>,
}

impl SubscriptionCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new(hub: DecisionHub) -> Self {
        Self {
            hub,
            entries: Arc::new(Mutex::new(HashMap::new())),
            watched: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Returns the cached decision, if any.
    #[must_use]
    pub fn get(&self, subscription: &Subscription) -> Option<Decision> {
        lock(&self.entries).get(&subscription.canonical_key()).cloned()
    }

    /// Stores `decision`, replacing any previous entry.
    pub fn put(&self, subscription: &Subscription, decision: Decision) {
        lock(&self.entries).insert(subscription.canonical_key(), decision);
    }

    /// Returns the number of cached subscriptions.
    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    /// Returns true when nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        lock(&self.entries).is_empty()
    }

    /// Returns the cached decision or fetches, caches, and returns a new one.
    ///
    /// Must be called within a Tokio runtime.
    pub async fn decide(&self, subscription: &Subscription) -> Decision {
        if let Some(decision) = self.get(subscription) {
            return decision;
        }
        self.watch(subscription);
        let seed =
            DecisionChannel::decide_once(self.hub.connection().as_ref(), subscription, None).await;
        lock(&self.entries).entry(subscription.canonical_key()).or_insert(seed).clone()
    }

    /// Releases every hub handle held by the cache and clears all entries.
    pub fn clear(&self) {
        let handles: Vec<ListenerHandle> =
            lock(&self.watched).drain().map(|(_, handle)| handle).collect();
        for handle in handles {
            handle.release();
        }
        lock(&self.entries).clear();
    }

    /// Registers a refresh listener once per subscription.
    fn watch(&self, subscription: &Subscription) {
        let key = subscription.canonical_key();
        let mut watched = lock(&self.watched);
        if watched.contains_key(&key) {
            return;
        }
        let refresh = Arc::new(CacheRefresh {
            entries: Arc::downgrade(&self.entries),
            watched: Arc::downgrade(&self.watched),
            key: key.clone(),
        });
        watched.insert(key, self.hub.register(subscription, refresh));
    }
}

/// Locks a mutex, recovering from poisoning.
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// SECTION: Refresh Listener
// ============================================================================

/// Hub listener that stores streamed decisions for a watched key.
struct CacheRefresh {
    /// Cache entries; gone once the cache is dropped.
    entries: Weak<Entries>,
    /// Watched keys; a cleared key stops accepting decisions.
    watched: Weak<Watched>,
    /// Key this listener refreshes.
    key: SubscriptionKey,
}

impl DecisionListener for CacheRefresh {
    fn on_decision(&self, decision: &Decision) {
        let (Some(entries), Some(watched)) = (self.entries.upgrade(), self.watched.upgrade())
        else {
            return;
        };
        let keys = lock(&watched);
        if !keys.contains_key(&self.key) {
            return;
        }
        lock(&entries).insert(self.key.clone(), decision.clone());
    }
}
