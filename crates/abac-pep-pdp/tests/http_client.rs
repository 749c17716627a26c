// crates/abac-pep-pdp/tests/http_client.rs
// ============================================================================
// Module: HTTP PDP Client Tests
// Description: Wire-level tests against a local HTTP server.
// Purpose: Verify paths, credentials, framing, and failure handling.
// Dependencies: abac-pep-pdp, tiny_http, tokio
// ============================================================================

//! ## Overview
//! Each test starts a `tiny_http` server on a loopback port, answers one
//! request, and reports what it received back to the test.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

mod common;

use std::sync::mpsc;
use std::thread;

use abac_pep_core::Verdict;
use abac_pep_pdp::DecisionChannel;
use abac_pep_pdp::HttpPdpClient;
use abac_pep_pdp::PdpAuth;
use abac_pep_pdp::PdpClientConfig;
use abac_pep_pdp::PdpConnection;
use abac_pep_pdp::PdpError;
use serde_json::Value;
use tiny_http::Header;
use tiny_http::Response;
use tiny_http::Server;
use tokio_stream::StreamExt;
use url::Url;

use crate::common::subscription;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Request details captured by the test server.
#[derive(Debug)]
struct Captured {
    /// Request path.
    path: String,
    /// Authorization header, if sent.
    authorization: Option<String>,
    /// Parsed request body.
    body: Value,
}

/// Serves one request with `status`, `content_type`, and `body`.
fn serve_once(
    status: u16,
    content_type: &'static str,
    body: &'static str,
) -> (Url, mpsc::Receiver<Captured>, thread::JoinHandle<()>) {
    let server = Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr().to_ip().unwrap();
    let url = Url::parse(&format!("http://{addr}")).unwrap();
    let (sender, receiver) = mpsc::channel();
    let handle = thread::spawn(move || {
        if let Ok(mut request) = server.recv() {
            let mut raw = String::new();
            let _ = request.as_reader().read_to_string(&mut raw);
            let authorization = request
                .headers()
                .iter()
                .find(|header| header.field.equiv("Authorization"))
                .map(|header| header.value.to_string());
            let _ = sender.send(Captured {
                path: request.url().to_string(),
                authorization,
                body: serde_json::from_str(&raw).unwrap_or(Value::Null),
            });
            let header = Header::from_bytes("Content-Type", content_type).unwrap();
            let response = Response::from_string(body).with_status_code(status).with_header(header);
            let _ = request.respond(response);
        }
    });
    (url, receiver, handle)
}

/// Builds a client for `url` with `auth`.
fn client(url: Url, auth: PdpAuth) -> HttpPdpClient {
    HttpPdpClient::new(PdpClientConfig::new(url).with_auth(auth)).unwrap()
}

// ============================================================================
// SECTION: Decide Once
// ============================================================================

/// Tests that decide-once posts the subscription with bearer credentials.
#[tokio::test]
async fn decide_once_posts_subscription() {
    let (url, captured, handle) = serve_once(
        200,
        "application/json",
        r#"{"decision":"PERMIT","obligations":[{"type":"log"}]}"#,
    );
    let client = client(url, PdpAuth::Bearer("secret-token".to_string()));
    let decision = client.decide_once(&subscription()).await.unwrap();
    handle.join().unwrap();

    assert_eq!(decision.verdict, Verdict::Permit);
    assert_eq!(decision.obligations.len(), 1);
    let captured = captured.recv().unwrap();
    assert_eq!(captured.path, "/api/pdp/decide-once");
    assert_eq!(captured.authorization.as_deref(), Some("Bearer secret-token"));
    assert_eq!(captured.body["action"], "read");
    assert_eq!(captured.body["subject"]["name"], "alice");
}

/// Tests that basic credentials are sent as an Authorization header.
#[tokio::test]
async fn decide_once_sends_basic_auth() {
    let (url, captured, handle) = serve_once(200, "application/json", r#"{"decision":"DENY"}"#);
    let auth = PdpAuth::Basic {
        username: "client".to_string(),
        password: "pass".to_string(),
    };
    let decision = client(url, auth).decide_once(&subscription()).await.unwrap();
    handle.join().unwrap();

    assert_eq!(decision.verdict, Verdict::Deny);
    let header = captured.recv().unwrap().authorization.unwrap();
    assert!(header.starts_with("Basic "));
}

/// Tests that an error status surfaces as a status error and downgrades.
#[tokio::test]
async fn decide_once_error_status_downgrades_to_indeterminate() {
    let (url, _captured, handle) = serve_once(503, "text/plain", "unavailable");
    let client = client(url, PdpAuth::None);
    let decision = DecisionChannel::decide_once(&client, &subscription(), None).await;
    handle.join().unwrap();
    assert_eq!(decision.verdict, Verdict::Indeterminate);
}

/// Tests that an unparseable body is a decode error.
#[tokio::test]
async fn decide_once_garbage_body_is_decode_error() {
    let (url, _captured, handle) = serve_once(200, "application/json", "<html>");
    let err = client(url, PdpAuth::None).decide_once(&subscription()).await.unwrap_err();
    handle.join().unwrap();
    assert!(matches!(err, PdpError::Decode(_)));
}

/// Tests that a refused connection is a transport error.
#[tokio::test]
async fn decide_once_refused_connection_is_transport_error() {
    let server = Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr().to_ip().unwrap();
    drop(server);
    let url = Url::parse(&format!("http://{addr}")).unwrap();
    let err = client(url, PdpAuth::None).decide_once(&subscription()).await.unwrap_err();
    assert!(matches!(err, PdpError::Transport(_)));
}

// ============================================================================
// SECTION: Streaming
// ============================================================================

/// Tests that a streamed SSE body yields each decision in order.
#[tokio::test]
async fn decide_streams_sse_decisions() {
    let (url, captured, handle) = serve_once(
        200,
        "text/event-stream",
        "data: {\"decision\":\"INDETERMINATE\"}\n\ndata: {\"decision\":\"PERMIT\"}\n\n",
    );
    let stream = client(url, PdpAuth::None).decide(&subscription()).await.unwrap();
    let decisions: Vec<_> = stream.collect().await;
    handle.join().unwrap();

    let verdicts: Vec<Verdict> = decisions.into_iter().map(|item| item.unwrap().verdict).collect();
    assert_eq!(verdicts, vec![Verdict::Indeterminate, Verdict::Permit]);
    assert_eq!(captured.recv().unwrap().path, "/api/pdp/decide");
}

/// Tests that newline-delimited JSON is accepted as well.
#[tokio::test]
async fn decide_streams_ndjson_decisions() {
    let (url, _captured, handle) = serve_once(
        200,
        "application/x-ndjson",
        "{\"decision\":\"DENY\"}\n{\"decision\":\"PERMIT\"}\n",
    );
    let stream = client(url, PdpAuth::None).decide(&subscription()).await.unwrap();
    let decisions: Vec<_> = stream.collect().await;
    handle.join().unwrap();
    assert_eq!(decisions.len(), 2);
    assert!(decisions.iter().all(Result::is_ok));
}
