// crates/abac-pep-pdp/src/lib.rs
// ============================================================================
// Module: ABAC PEP PDP Client Library
// Description: Decision transport, fan-out, and caching.
// Purpose: Obtain decisions from a remote PDP for enforcement points.
// Dependencies: abac-pep-core, async-trait, bytes, reqwest, tokio, tokio-stream, url
// ============================================================================

//! ## Overview
//! This crate talks to the policy decision point. [`HttpPdpClient`] carries
//! subscriptions over HTTP, [`DecisionChannel`] keeps a stream alive with a
//! fixed reconnect delay, [`DecisionHub`] fans decisions out to listeners, and
//! [`SubscriptionCache`] remembers the last decision per subscription.
//! Invariants:
//! - Transport failures never become denials here; one-shot calls degrade to
//!   `INDETERMINATE` and streams reconnect.
//! - Decisions for one subscription are delivered in wire order.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod cache;
pub mod channel;
pub mod client;
pub mod error;
pub mod framing;
pub mod hub;
pub mod listener;
pub mod point;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use cache::SubscriptionCache;
pub use channel::DEFAULT_RECONNECT_DELAY;
pub use channel::DecisionChannel;
pub use client::DEFAULT_DECIDE_ONCE_PATH;
pub use client::DEFAULT_DECIDE_PATH;
pub use client::DEFAULT_MAX_MESSAGE_BYTES;
pub use client::DecisionStream;
pub use client::HttpPdpClient;
pub use client::PdpAuth;
pub use client::PdpClientConfig;
pub use client::PdpConnection;
pub use error::PdpError;
pub use framing::DecisionFramer;
pub use hub::DecisionHub;
pub use hub::ListenerHandle;
pub use listener::DecisionListener;
pub use point::PolicyDecisionPoint;
