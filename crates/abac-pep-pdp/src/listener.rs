// crates/abac-pep-pdp/src/listener.rs
// ============================================================================
// Module: Decision Listeners
// Description: Callback seam for decisions delivered by channels.
// Purpose: Replace observable push delivery with explicit listener callbacks.
// Dependencies: abac-pep-core
// ============================================================================

//! ## Overview
//! A [`DecisionListener`] receives every decision delivered for the
//! subscription it was registered under, in wire order. Callbacks run on the
//! channel task and must not block.

// ============================================================================
// SECTION: Imports
// ============================================================================

use abac_pep_core::Decision;

use crate::error::PdpError;

// ============================================================================
// SECTION: Listener
// ============================================================================

/// Receiver of decision events.
pub trait DecisionListener: Send + Sync {
    /// Called for every decision, in the order received.
    fn on_decision(&self, decision: &Decision);

    /// Called when a one-shot request fails.
    fn on_error(&self, error: &PdpError) {
        let _ = error;
    }

    /// Called once when transmission for the subscription ends.
    fn on_completed(&self) {}
}
