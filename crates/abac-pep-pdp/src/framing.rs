// crates/abac-pep-pdp/src/framing.rs
// ============================================================================
// Module: Decision Stream Framing
// Description: Incremental decoder for streamed decision messages.
// Purpose: Split SSE events and newline-delimited JSON into decisions.
// Dependencies: bytes, serde_json, abac-pep-core
// ============================================================================

//! ## Overview
//! The streaming endpoint may answer with server-sent events (`data:` lines
//! terminated by a blank line) or with one JSON document per line. The framer
//! accepts arbitrary chunk boundaries and yields one item per message.
//! Invariants:
//! - A message larger than the configured limit is dropped as a decode error.
//! - SSE comments and `event:`/`id:`/`retry:` fields are ignored.

// ============================================================================
// SECTION: Imports
// ============================================================================

use abac_pep_core::Decision;
use bytes::BytesMut;

use crate::error::PdpError;

// ============================================================================
// SECTION: Framer
// ============================================================================

/// Incremental decision decoder.
#[derive(Debug)]
pub struct DecisionFramer {
    /// Bytes not yet terminated by a newline.
    buffer: BytesMut,
    /// Accumulated SSE `data:` payload for the current event.
    event_data: Vec<String>,
    /// Maximum bytes per message.
    max_message_bytes: usize,
}

impl DecisionFramer {
    /// Creates a framer with a per-message size limit.
    #[must_use]
    pub fn new(max_message_bytes: usize) -> Self {
        Self {
            buffer: BytesMut::new(),
            event_data: Vec::new(),
            max_message_bytes,
        }
    }

    /// Feeds a chunk and returns every message it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Result<Decision, PdpError>> {
        self.buffer.extend_from_slice(chunk);
        let mut out = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|byte| *byte == b'\n') {
            let line = self.buffer.split_to(newline + 1);
            if let Some(item) = self.line(&line[.. newline]) {
                out.push(item);
            }
        }
        if self.buffer.len() > self.max_message_bytes {
            self.buffer.clear();
            self.event_data.clear();
            out.push(Err(self.too_large()));
        }
        out
    }

    /// Flushes a trailing unterminated message at end of stream.
    pub fn finish(&mut self) -> Vec<Result<Decision, PdpError>> {
        let rest = self.buffer.split();
        let mut out = Vec::new();
        if let Some(item) = self.line(&rest) {
            out.push(item);
        }
        if let Some(item) = self.flush_event() {
            out.push(item);
        }
        out
    }

    /// Handles one complete line.
    fn line(&mut self, raw: &[u8]) -> Option<Result<Decision, PdpError>> {
        let Ok(text) = std::str::from_utf8(raw) else {
            return Some(Err(PdpError::Decode("stream line was not valid utf-8".to_string())));
        };
        let text = text.trim_end_matches('\r');
        if text.trim().is_empty() {
            return self.flush_event();
        }
        if let Some(data) = text.strip_prefix("data:") {
            self.event_data.push(data.trim_start().to_string());
            let pending: usize = self.event_data.iter().map(String::len).sum();
            if pending > self.max_message_bytes {
                self.event_data.clear();
                return Some(Err(self.too_large()));
            }
            return None;
        }
        if text.starts_with(':')
            || text.starts_with("event:")
            || text.starts_with("id:")
            || text.starts_with("retry:")
        {
            return None;
        }
        Some(decode(text))
    }

    /// Decodes the accumulated SSE event, if any.
    fn flush_event(&mut self) -> Option<Result<Decision, PdpError>> {
        if self.event_data.is_empty() {
            return None;
        }
        let payload = std::mem::take(&mut self.event_data).join("\n");
        Some(decode(&payload))
    }

    /// Builds the oversize error.
    fn too_large(&self) -> PdpError {
        PdpError::Decode(format!("message exceeds {} bytes", self.max_message_bytes))
    }
}

/// Decodes one JSON decision message.
///
/// # Errors
///
/// Returns [`PdpError::Decode`] when the payload is not a decision.
pub fn decode(payload: &str) -> Result<Decision, PdpError> {
    serde_json::from_str(payload.trim()).map_err(|err| PdpError::Decode(err.to_string()))
}
