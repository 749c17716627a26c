// crates/abac-pep-cli/src/main_tests.rs
// ============================================================================
// Module: CLI Main Helpers Tests
// Description: Unit tests for argument parsing, bounded reads, and offline
// enforcement.
// Purpose: Keep the CLI surface stable and fail closed on bad inputs.
// Dependencies: abac-pep-cli main helpers, tempfile
// ============================================================================

//! ## Overview
//! Exercises the command parser, the size-limited input reader, and the
//! offline post-enforcement path used by `abac-pep enforce`.
//!
//! Security posture: CLI inputs are untrusted; size limits must fail closed.

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

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::sync::Arc;

use abac_pep_config::AbacPepConfig;
use abac_pep_core::Decision;
use abac_pep_core::NoopAuditSink;
use abac_pep_core::Subscription;
use clap::Parser;
use serde_json::json;

use super::Cli;
use super::Commands;
use super::ConfigCommand;
use super::ReadLimitError;
use super::enforce_offline;
use super::read_bytes_with_limit;
use super::read_json;
use super::summarize_config;

// ============================================================================
// SECTION: Argument Parsing
// ============================================================================

#[test]
fn watch_parses_count_and_flattened_pdp_args() {
    let cli = Cli::try_parse_from([
        "abac-pep",
        "watch",
        "--config",
        "pep.toml",
        "--subscription",
        "sub.json",
        "--count",
        "3",
    ])
    .unwrap();
    let Commands::Watch(command) = cli.command else {
        panic!("expected watch command");
    };
    assert_eq!(command.count, Some(3));
    assert_eq!(command.pdp.subscription.to_str(), Some("sub.json"));
    assert_eq!(command.pdp.config.as_deref().and_then(|path| path.to_str()), Some("pep.toml"));
}

#[test]
fn decide_once_requires_subscription() {
    assert!(Cli::try_parse_from(["abac-pep", "decide-once"]).is_err());
}

#[test]
fn config_check_config_is_optional() {
    let cli = Cli::try_parse_from(["abac-pep", "config", "check"]).unwrap();
    let Commands::Config {
        command: ConfigCommand::Check {
            config,
        },
    } = cli.command
    else {
        panic!("expected config check");
    };
    assert!(config.is_none());
}

#[test]
fn enforce_requires_decision_and_result() {
    assert!(Cli::try_parse_from(["abac-pep", "enforce", "--decision", "d.json"]).is_err());
    let cli =
        Cli::try_parse_from(["abac-pep", "enforce", "--decision", "d.json", "--result", "r.json"])
            .unwrap();
    let Commands::Enforce(command) = cli.command else {
        panic!("expected enforce command");
    };
    assert!(command.subscription.is_none());
    assert!(command.config.is_none());
}

// ============================================================================
// SECTION: Bounded Reads
// ============================================================================

#[test]
fn read_bytes_with_limit_rejects_oversized_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("big.json");
    fs::write(&path, vec![b'a'; 16]).unwrap();
    match read_bytes_with_limit(&path, 8) {
        Err(ReadLimitError::TooLarge {
            size,
            limit,
        }) => {
            assert_eq!(size, 16);
            assert_eq!(limit, 8);
        }
        other => panic!("expected size rejection, got {other:?}"),
    }
}

#[test]
fn read_bytes_with_limit_accepts_file_at_limit() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("exact.json");
    fs::write(&path, b"12345678").unwrap();
    let bytes = read_bytes_with_limit(&path, 8).unwrap();
    assert_eq!(bytes, b"12345678");
}

#[test]
fn read_bytes_with_limit_reports_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = read_bytes_with_limit(&dir.path().join("missing.json"), 8);
    assert!(matches!(result, Err(ReadLimitError::Io(_))));
}

#[test]
fn read_json_names_the_input_on_parse_failure() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("decision.json");
    fs::write(&path, b"{not json").unwrap();
    let err = read_json::<Decision>(&path, "decision").unwrap_err();
    assert!(err.to_string().starts_with("invalid decision json"));
}

#[test]
fn read_json_loads_subscription() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sub.json");
    fs::write(&path, br#"{"subject":"alice","action":"read","resource":"doc"}"#).unwrap();
    let subscription: Subscription = read_json(&path, "subscription").unwrap();
    assert_eq!(subscription.subject(), &json!("alice"));
    assert_eq!(subscription.action(), &json!("read"));
}

// ============================================================================
// SECTION: Offline Enforcement
// ============================================================================

#[test]
fn enforce_offline_applies_content_filter() {
    let decision = Decision::permit().with_obligation(json!({
        "type": "filterJsonPathContent",
        "conditions": [{
            "path": "$.ssn",
            "type": "==",
            "actions": [{"type": "blacken", "replacement": "*", "discloseRight": 4}]
        }]
    }));
    let released = enforce_offline(
        &Subscription::builder().build(),
        &decision,
        json!({"name": "alice", "ssn": "123-45-6789"}),
        Arc::new(NoopAuditSink),
    )
    .unwrap();
    assert_eq!(released, json!({"name": "alice", "ssn": "*******6789"}));
}

#[test]
fn enforce_offline_denies_non_permit() {
    let err = enforce_offline(
        &Subscription::builder().build(),
        &Decision::deny(),
        json!({"name": "alice"}),
        Arc::new(NoopAuditSink),
    )
    .unwrap_err();
    assert!(err.is_access_denied());
    assert_eq!(err.denial_payload().status, 401);
}

#[test]
fn enforce_offline_denies_unknown_obligation() {
    let decision = Decision::permit().with_obligation(json!({"type": "notifyOwner"}));
    let err = enforce_offline(
        &Subscription::builder().build(),
        &decision,
        json!({"name": "alice"}),
        Arc::new(NoopAuditSink),
    )
    .unwrap_err();
    assert_eq!(err.to_string(), "Access denied. Failed to construct bundle");
}

// ============================================================================
// SECTION: Config Summary
// ============================================================================

#[test]
fn summarize_config_reports_endpoints_and_auth() {
    let config = AbacPepConfig::from_toml(
        r#"
[pdp]
base_uri = "https://pdp.example.com/api"
api_key = "secret-token"

[audit]
enabled = false
"#,
    )
    .unwrap();
    let summary = summarize_config(&config).unwrap();
    assert_eq!(summary.status, "ok");
    assert_eq!(summary.auth, "bearer");
    assert!(!summary.audit_enabled);
    assert!(summary.decide_once_url.starts_with("https://pdp.example.com/api/"));
    assert!(summary.decide_url.starts_with("https://pdp.example.com/api/"));
}
