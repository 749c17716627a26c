// crates/abac-pep-pdp/tests/common/mod.rs
// ============================================================================
// Module: Common PDP Test Fixtures
// Description: Scripted PDP transport and recording listeners.
// Purpose: Drive channels, hub, and cache without a network.
// Dependencies: abac-pep-core, abac-pep-pdp, tokio-stream
// ============================================================================

//! ## Overview
//! [`ScriptedConnection`] answers each stream open with the next scripted
//! batch of decisions. The last batch stays open forever so tests can observe
//! exactly how many reconnects happened.

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

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use abac_pep_core::Decision;
use abac_pep_core::Subscription;
use abac_pep_pdp::DecisionListener;
use abac_pep_pdp::DecisionStream;
use abac_pep_pdp::PdpConnection;
use abac_pep_pdp::PdpError;
use async_trait::async_trait;
use serde_json::json;
use tokio_stream::StreamExt;

// ============================================================================
// SECTION: Scripted Connection
// ============================================================================

/// Transport answering from a script.
pub struct ScriptedConnection {
    /// Batches returned by successive stream opens.
    streams: Mutex<VecDeque<Vec<Result<Decision, PdpError>>>>,
    /// Answer for one-shot calls.
    once: Mutex<Result<Decision, PdpError>>,
    /// Delay before a one-shot call answers.
    once_delay: Duration,
    /// Stream opens observed.
    pub opens: AtomicUsize,
    /// One-shot calls observed.
    pub once_calls: AtomicUsize,
}

impl ScriptedConnection {
    /// Creates a connection with stream batches and a one-shot answer.
    pub fn new(
        streams: Vec<Vec<Result<Decision, PdpError>>>,
        once: Result<Decision, PdpError>,
    ) -> Arc<Self> {
        Self::delayed(streams, once, Duration::ZERO)
    }

    /// Creates a connection whose one-shot answer arrives after `delay`.
    pub fn delayed(
        streams: Vec<Vec<Result<Decision, PdpError>>>,
        once: Result<Decision, PdpError>,
        delay: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            streams: Mutex::new(streams.into()),
            once: Mutex::new(once),
            once_delay: delay,
            opens: AtomicUsize::new(0),
            once_calls: AtomicUsize::new(0),
        })
    }

    /// Returns the stream open count.
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PdpConnection for ScriptedConnection {
    async fn decide_once(&self, _subscription: &Subscription) -> Result<Decision, PdpError> {
        self.once_calls.fetch_add(1, Ordering::SeqCst);
        if !self.once_delay.is_zero() {
            tokio::time::sleep(self.once_delay).await;
        }
        self.once.lock().unwrap().clone()
    }

    async fn decide(&self, _subscription: &Subscription) -> Result<DecisionStream, PdpError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        let mut streams = self.streams.lock().unwrap();
        let batch = streams.pop_front().unwrap_or_default();
        if streams.is_empty() {
            // Final batch: deliver, then hold the stream open.
            Ok(Box::pin(tokio_stream::iter(batch).chain(tokio_stream::pending())))
        } else {
            Ok(Box::pin(tokio_stream::iter(batch)))
        }
    }
}

// ============================================================================
// SECTION: Listeners
// ============================================================================

/// Listener recording every event.
#[derive(Default)]
pub struct RecordingListener {
    /// Decisions received.
    pub decisions: Mutex<Vec<Decision>>,
    /// Errors received.
    pub errors: Mutex<Vec<PdpError>>,
    /// Completion count.
    pub completed: AtomicUsize,
}

impl RecordingListener {
    /// Returns the received decisions.
    pub fn decisions(&self) -> Vec<Decision> {
        self.decisions.lock().unwrap().clone()
    }
}

impl DecisionListener for RecordingListener {
    fn on_decision(&self, decision: &Decision) {
        self.decisions.lock().unwrap().push(decision.clone());
    }

    fn on_error(&self, error: &PdpError) {
        self.errors.lock().unwrap().push(error.clone());
    }

    fn on_completed(&self) {
        self.completed.fetch_add(1, Ordering::SeqCst);
    }
}

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Sample subscription.
pub fn subscription() -> Subscription {
    Subscription::builder()
        .subject(json!({"name": "alice", "role": "doctor"}))
        .action("read")
        .resource(json!({"type": "record", "id": 7}))
        .build()
}

/// Polls `check` until it holds or two seconds pass.
pub async fn eventually(check: impl Fn() -> bool) -> bool {
    for _ in 0 .. 200 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
