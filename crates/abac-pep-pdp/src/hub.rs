// crates/abac-pep-pdp/src/hub.rs
// ============================================================================
// Module: Decision Hub
// Description: Per-subscription fan-out of streamed decisions.
// Purpose: Share one decision channel among every caller of a subscription.
// Dependencies: tokio, tracing, abac-pep-core
// ============================================================================

//! ## Overview
//! The [`DecisionHub`] keys channels by subscription identity. The first
//! subscriber opens a [`DecisionChannel`]; later subscribers for a
//! structurally equal subscription share it. Every decision the channel
//! delivers is forwarded, in wire order, to every listener registered for the
//! subscription and published to the subscription's [`ListenerHandle`]s.
//! Invariants:
//! - At most one channel is open per subscription key.
//! - A handle starts at `INDETERMINATE` until the first decision arrives.
//! - Listener callbacks run outside the hub lock.
//! - `end_transmission` completes every listener once and is idempotent.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::Weak;
use std::time::Duration;

use abac_pep_core::Decision;
use abac_pep_core::Subscription;
use abac_pep_core::SubscriptionKey;
use tokio::sync::watch;

use crate::channel::DecisionChannel;
use crate::client::PdpConnection;
use crate::error::PdpError;
use crate::listener::DecisionListener;

// ============================================================================
// SECTION: Fan-Out
// ============================================================================

/// Listener set and latest-decision cell of one subscription.
struct FanOut {
    /// Registered listeners in registration order.
    listeners: Mutex<Vec<Arc<dyn DecisionListener>>>,
    /// Latest decision published to handles.
    latest: watch::Sender<Decision>,
}

impl FanOut {
    /// Creates an empty fan-out starting at `INDETERMINATE`.
    fn new() -> Self {
        let (latest, _) = watch::channel(Decision::indeterminate());
        Self {
            listeners: Mutex::new(Vec::new()),
            latest,
        }
    }

    /// Adds a listener.
    fn add(&self, listener: Arc<dyn DecisionListener>) {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner).push(listener);
    }

    /// Returns a copy of the listener list.
    fn snapshot(&self) -> Vec<Arc<dyn DecisionListener>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Completes every listener and drops them.
    fn complete(&self) {
        let listeners =
            std::mem::take(&mut *self.listeners.lock().unwrap_or_else(PoisonError::into_inner));
        for listener in listeners {
            listener.on_completed();
        }
    }
}

impl DecisionListener for FanOut {
    fn on_decision(&self, decision: &Decision) {
        for listener in self.snapshot() {
            listener.on_decision(decision);
        }
        self.latest.send_replace(decision.clone());
    }

    fn on_error(&self, error: &PdpError) {
        for listener in self.snapshot() {
            listener.on_error(error);
        }
    }
}

// ============================================================================
// SECTION: Hub
// ============================================================================

/// One open subscription.
struct HubEntry {
    /// Subscription being streamed.
    subscription: Subscription,
    /// Listener set fed by the channel.
    fan_out: Arc<FanOut>,
    /// Background stream.
    channel: DecisionChannel,
    /// Outstanding handles.
    holders: usize,
}

/// State shared between the hub and its handles.
struct HubShared {
    /// PDP transport.
    connection: Arc<dyn PdpConnection>,
    /// Fixed reconnect delay for new channels.
    reconnect_delay: Duration,
    /// Open subscriptions by identity.
    entries: Mutex<HashMap<SubscriptionKey, HubEntry>>,
}

impl HubShared {
    /// Locks the entry map.
    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<SubscriptionKey, HubEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Drops one holder; the last holder closes the channel.
    fn release(&self, key: &SubscriptionKey) {
        let removed = {
            let mut entries = self.entries();
            let Some(entry) = entries.get_mut(key) else {
                return;
            };
            entry.holders = entry.holders.saturating_sub(1);
            if entry.holders > 0 {
                return;
            }
            entries.remove(key)
        };
        if let Some(entry) = removed {
            entry.channel.close();
            entry.fan_out.complete();
            tracing::debug!(subscription = %key.short_id(), "subscription released");
        }
    }
}

/// Fan-out registry of decision channels.
#[derive(Clone)]
pub struct DecisionHub {
    /// Shared state.
    shared: Arc<HubShared>,
}

impl DecisionHub {
    /// Creates a hub over a PDP transport.
    #[must_use]
    pub fn new(connection: Arc<dyn PdpConnection>, reconnect_delay: Duration) -> Self {
        Self {
            shared: Arc::new(HubShared {
                connection,
                reconnect_delay,
                entries: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Returns the PDP transport.
    #[must_use]
    pub fn connection(&self) -> &Arc<dyn PdpConnection> {
        &self.shared.connection
    }

    /// Returns a handle on the subscription, opening a channel if needed.
    ///
    /// Must be called within a Tokio runtime.
    #[must_use]
    pub fn subscribe(&self, subscription: &Subscription) -> ListenerHandle {
        self.attach(subscription, None)
    }

    /// Subscribes and adds `listener` to the subscription's fan-out.
    #[must_use]
    pub fn register(
        &self,
        subscription: &Subscription,
        listener: Arc<dyn DecisionListener>,
    ) -> ListenerHandle {
        self.attach(subscription, Some(listener))
    }

    /// Returns true when a channel is open for the subscription.
    #[must_use]
    pub fn is_subscribed(&self, subscription: &Subscription) -> bool {
        self.shared.entries().contains_key(&subscription.canonical_key())
    }

    /// Returns the number of open subscriptions.
    #[must_use]
    pub fn active_subscriptions(&self) -> usize {
        self.shared.entries().len()
    }

    /// Closes every channel and completes every listener.
    pub fn end_transmission(&self) {
        let drained: Vec<(SubscriptionKey, HubEntry)> = self.shared.entries().drain().collect();
        for (key, entry) in drained {
            entry.channel.close();
            entry.fan_out.complete();
            tracing::debug!(subscription = %key.short_id(), "transmission ended");
        }
    }

    /// Finds or creates the entry and returns a new handle on it.
    fn attach(
        &self,
        subscription: &Subscription,
        listener: Option<Arc<dyn DecisionListener>>,
    ) -> ListenerHandle {
        let key = subscription.canonical_key();
        let mut entries = self.shared.entries();
        let entry = entries.entry(key.clone()).or_insert_with(|| {
            let fan_out = Arc::new(FanOut::new());
            let channel = DecisionChannel::open(
                Arc::clone(&self.shared.connection),
                subscription.clone(),
                Arc::clone(&fan_out) as Arc<dyn DecisionListener>,
                self.shared.reconnect_delay,
            );
            tracing::debug!(subscription = %key.short_id(), "decision channel opened");
            HubEntry {
                subscription: subscription.clone(),
                fan_out,
                channel,
                holders: 0,
            }
        });
        if let Some(listener) = listener {
            entry.fan_out.add(listener);
        }
        entry.holders += 1;
        ListenerHandle {
            key,
            subscription: entry.subscription.clone(),
            latest: entry.fan_out.latest.subscribe(),
            hub: Arc::downgrade(&self.shared),
        }
    }
}

// ============================================================================
// SECTION: Handle
// ============================================================================

/// Caller's view of a hub subscription.
///
/// # Invariants
/// - `release` must be called once per handle returned by the hub.
pub struct ListenerHandle {
    /// Subscription identity.
    key: SubscriptionKey,
    /// Subscription this handle observes.
    subscription: Subscription,
    /// Latest decision cell.
    latest: watch::Receiver<Decision>,
    /// Owning hub.
    hub: Weak<HubShared>,
}

impl ListenerHandle {
    /// Returns the observed subscription.
    #[must_use]
    pub const fn subscription(&self) -> &Subscription {
        &self.subscription
    }

    /// Returns the latest decision, `INDETERMINATE` before the first arrives.
    #[must_use]
    pub fn latest(&self) -> Decision {
        self.latest.borrow().clone()
    }

    /// Waits for the next decision; `None` once transmission has ended.
    pub async fn changed(&mut self) -> Option<Decision> {
        self.latest.changed().await.ok()?;
        Some(self.latest.borrow_and_update().clone())
    }

    /// Releases this handle; the last release closes the channel.
    pub fn release(self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.release(&self.key);
        }
    }
}
