// crates/abac-pep-pdp/src/channel.rs
// ============================================================================
// Module: Decision Channel
// Description: Reconnecting decision stream for one subscription.
// Purpose: Keep a subscription's decisions flowing across stream failures.
// Dependencies: tokio, tokio-stream, tracing, abac-pep-core
// ============================================================================

//! ## Overview
//! A [`DecisionChannel`] owns a background task that opens the PDP stream for
//! one subscription, forwards every decoded decision to a sink, and reopens the
//! stream after a fixed delay whenever it ends or fails.
//! Invariants:
//! - Retries continue until the channel is closed; the delay never grows.
//! - Closing abandons an in-flight connect, read, or reconnect timer.
//! - Malformed messages are logged and skipped without reconnecting.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use abac_pep_core::Decision;
use abac_pep_core::Subscription;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;

use crate::client::PdpConnection;
use crate::listener::DecisionListener;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Delay before a dropped stream is reopened.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(100);

// ============================================================================
// SECTION: Channel
// ============================================================================

/// Background stream for one subscription.
#[derive(Debug)]
pub struct DecisionChannel {
    /// Close signal observed by the task.
    shutdown: watch::Sender<bool>,
    /// Stream task.
    task: JoinHandle<()>,
}

impl DecisionChannel {
    /// Spawns the stream task on the current runtime.
    #[must_use]
    pub fn open(
        connection: Arc<dyn PdpConnection>,
        subscription: Subscription,
        sink: Arc<dyn DecisionListener>,
        reconnect_delay: Duration,
    ) -> Self {
        let (shutdown, signal) = watch::channel(false);
        let task = tokio::spawn(run_stream(connection, subscription, sink, reconnect_delay, signal));
        Self {
            shutdown,
            task,
        }
    }

    /// Stops the stream and abandons any pending reconnect.
    pub fn close(&self) {
        let _ = self.shutdown.send(true);
    }

    /// Returns true once the task has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Requests a single decision, downgrading failures to `INDETERMINATE`.
    ///
    /// The failure is reported to `listener` before the fallback is returned.
    pub async fn decide_once(
        connection: &dyn PdpConnection,
        subscription: &Subscription,
        listener: Option<&dyn DecisionListener>,
    ) -> Decision {
        match connection.decide_once(subscription).await {
            Ok(decision) => decision,
            Err(err) => {
                tracing::warn!(
                    subscription = %subscription.short_id(),
                    error = %err,
                    "decide-once failed; using INDETERMINATE"
                );
                if let Some(listener) = listener {
                    listener.on_error(&err);
                }
                Decision::indeterminate()
            }
        }
    }
}

impl Drop for DecisionChannel {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}

// ============================================================================
// SECTION: Stream Task
// ============================================================================

/// Connect, forward, and reconnect until closed.
async fn run_stream(
    connection: Arc<dyn PdpConnection>,
    subscription: Subscription,
    sink: Arc<dyn DecisionListener>,
    reconnect_delay: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let id = subscription.short_id();
    loop {
        if *shutdown.borrow() {
            return;
        }
        let opened = tokio::select! {
            biased;
            _ = shutdown.changed() => return,
            opened = connection.decide(&subscription) => opened,
        };
        match opened {
            Ok(mut stream) => {
                tracing::debug!(subscription = %id, "decision stream opened");
                loop {
                    let next = tokio::select! {
                        biased;
                        _ = shutdown.changed() => return,
                        next = stream.next() => next,
                    };
                    match next {
                        Some(Ok(decision)) => sink.on_decision(&decision),
                        Some(Err(err)) if err.is_decode() => {
                            tracing::warn!(subscription = %id, error = %err, "skipping malformed decision");
                        }
                        Some(Err(err)) => {
                            tracing::warn!(subscription = %id, error = %err, "decision stream failed");
                            break;
                        }
                        None => {
                            tracing::debug!(subscription = %id, "decision stream ended");
                            break;
                        }
                    }
                }
            }
            Err(err) => {
                tracing::warn!(subscription = %id, error = %err, "decision stream could not be opened");
            }
        }
        tokio::select! {
            biased;
            _ = shutdown.changed() => return,
            () = tokio::time::sleep(reconnect_delay) => {}
        }
        tracing::debug!(subscription = %id, "reconnecting decision stream");
    }
}
