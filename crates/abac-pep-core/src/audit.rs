// crates/abac-pep-core/src/audit.rs
// ============================================================================
// Module: Enforcement Audit Logging
// Description: Structured audit events for enforcement outcomes.
// Purpose: Emit enforcement records without a hard logging dependency.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Every enforcement that ends in a permit, a denial, or a mapped failure is
//! recorded as an [`EnforcementAuditEvent`]. Sinks serialize events as JSON
//! lines so deployments can route them to their own pipeline.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

use crate::decision::EnforcementPhase;
use crate::decision::Verdict;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Final state of one enforcement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnforcementOutcome {
    /// The call was allowed to proceed or its result was released.
    Permitted,
    /// The verdict was not `PERMIT`.
    Denied,
    /// Bundle construction failed (unhandled obligation or misuse).
    BundleRejected,
    /// A handler failed and the error chain produced a mapped error.
    FailedMapped,
    /// A handler failed and no mapper translated the error.
    FailedUnmapped,
}

/// Enforcement audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct EnforcementAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Phase the enforcement ran in.
    pub phase: EnforcementPhase,
    /// Verdict of the enforced decision.
    pub verdict: Verdict,
    /// Enforcement outcome.
    pub outcome: EnforcementOutcome,
    /// Short subscription id when known.
    pub subscription_id: Option<String>,
    /// Denial or failure detail.
    pub detail: Option<String>,
}

impl EnforcementAuditEvent {
    /// Creates a new audit event with a consistent timestamp.
    #[must_use]
    pub fn new(
        phase: EnforcementPhase,
        verdict: Verdict,
        outcome: EnforcementOutcome,
        detail: Option<String>,
    ) -> Self {
        let timestamp_ms =
            SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        Self {
            event: "enforcement",
            timestamp_ms,
            phase,
            verdict,
            outcome,
            subscription_id: None,
            detail,
        }
    }

    /// Attaches the short subscription id.
    #[must_use]
    pub fn with_subscription_id(mut self, subscription_id: impl Into<String>) -> Self {
        self.subscription_id = Some(subscription_id.into());
        self
    }
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Audit sink for enforcement events.
pub trait EnforcementAuditSink: Send + Sync {
    /// Record an audit event.
    fn record(&self, event: &EnforcementAuditEvent);
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl EnforcementAuditSink for StderrAuditSink {
    fn record(&self, event: &EnforcementAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Audit sink that logs JSON lines to a file.
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl EnforcementAuditSink for FileAuditSink {
    fn record(&self, event: &EnforcementAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// No-op audit sink.
pub struct NoopAuditSink;

impl EnforcementAuditSink for NoopAuditSink {
    fn record(&self, _event: &EnforcementAuditEvent) {}
}
