// crates/abac-pep-core/src/tests.rs
// ============================================================================
// Module: ABAC PEP Core Unit Tests
// Description: Unit tests for path selection, masking, and the decision model.
// Purpose: Validate building blocks in isolation from bundle flows.
// Dependencies: abac-pep-core, serde_json
// ============================================================================

//! ## Overview
//! Unit tests for selector parsing and evaluation, blacken masking, constraint
//! type lookup, and decision wire names.

// ============================================================================
// SECTION: Lint Configuration
// ============================================================================

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    reason = "Test-only assertions use unwrap/expect for clarity."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::json;

use crate::AccessDenied;
use crate::Decision;
use crate::EnforcementPhase;
use crate::PathExpression;
use crate::ResponsibleItem;
use crate::Signal;
use crate::Subscription;
use crate::TransformValueError;
use crate::Verdict;
use crate::blacken;
use crate::constraint_type;
use crate::document::path::PathStep;
use crate::document::path::remove_at;

// ============================================================================
// SECTION: Path Selection
// ============================================================================

#[test]
fn path_dotted_name_selects_nested_member() {
    let doc = json!({"name": {"first": "Ada", "last": "Lovelace"}});
    let path = PathExpression::parse("$.name.first").unwrap();
    assert_eq!(path.select_values(&doc), vec![&json!("Ada")]);
}

#[test]
fn path_bare_relative_name_is_accepted() {
    let doc = json!({"name": {"first": "Ada"}});
    let path = PathExpression::parse("name.first").unwrap();
    assert_eq!(
        path.select(&doc),
        vec![vec![PathStep::Key("name".to_string()), PathStep::Key("first".to_string())]]
    );
}

#[test]
fn path_empty_and_dollar_are_identity() {
    assert!(PathExpression::parse("").unwrap().is_identity());
    assert!(PathExpression::parse("$").unwrap().is_identity());
    assert!(PathExpression::parse("@").unwrap().is_identity());
}

#[test]
fn path_wildcard_and_index() {
    let doc = json!({"items": [1, 2, 3]});
    let all = PathExpression::parse("$.items[*]").unwrap();
    assert_eq!(all.select_values(&doc).len(), 3);
    let last = PathExpression::parse("$.items[2]").unwrap();
    assert_eq!(
        last.select(&doc),
        vec![vec![PathStep::Key("items".to_string()), PathStep::Index(2)]]
    );
    let missing = PathExpression::parse("$.items[7]").unwrap();
    assert!(missing.select(&doc).is_empty());
}

#[test]
fn path_slices_unions_and_name_lists() {
    let doc = json!([{"Name": "a", "Age": 1}, {"Name": "b"}, {"Name": "c"}]);
    let slice = PathExpression::parse("$[0:1]").unwrap();
    assert_eq!(slice.select(&doc), vec![vec![PathStep::Index(0)]]);
    let union = PathExpression::parse("$[0,2]").unwrap();
    assert_eq!(union.select(&doc), vec![vec![PathStep::Index(0)], vec![PathStep::Index(2)]]);
    let names = PathExpression::parse("$['Name','Age']").unwrap();
    assert_eq!(names.select_values(&doc[0]), vec![&json!("a"), &json!(1)]);
}

#[test]
fn path_descendant_collects_in_document_order() {
    let doc = json!({"a": {"id": 1, "b": {"id": 2}}, "id": 0});
    let path = PathExpression::parse("$..id").unwrap();
    assert_eq!(path.select_values(&doc), vec![&json!(1), &json!(2), &json!(0)]);
}

#[test]
fn path_quoted_bracket_name() {
    let doc = json!({"odd key": true});
    let path = PathExpression::parse("$['odd key']").unwrap();
    assert_eq!(path.select_values(&doc), vec![&json!(true)]);
}

#[test]
fn path_filter_compares_members() {
    let doc = json!([
        {"name": "a", "age": 17},
        {"name": "b", "age": 30},
        {"name": "c"}
    ]);
    let adults = PathExpression::parse("$[?(@.age >= 18)]").unwrap();
    assert_eq!(adults.select(&doc), vec![vec![PathStep::Index(1)]]);
    let named = PathExpression::parse("$[?(@.name == 'a' || @.name == \"c\")]").unwrap();
    assert_eq!(named.select(&doc).len(), 2);
}

#[test]
fn path_malformed_reports_invalid_path() {
    let err = PathExpression::parse("$.items[").unwrap_err();
    assert!(matches!(err, TransformValueError::InvalidPath { .. }));
    let err = PathExpression::parse("$[?(@.a == )]").unwrap_err();
    assert!(matches!(err, TransformValueError::InvalidPath { .. }));
}

#[test]
fn remove_at_shifts_array_and_keeps_member_order() {
    let mut doc = json!({"a": 1, "b": [10, 20, 30], "c": 3});
    remove_at(&mut doc, &[PathStep::Key("b".to_string()), PathStep::Index(0)]);
    remove_at(&mut doc, &[PathStep::Key("a".to_string())]);
    assert_eq!(doc, json!({"b": [20, 30], "c": 3}));
    assert_eq!(serde_json::to_string(&doc).unwrap(), r#"{"b":[20,30],"c":3}"#);
}

// ============================================================================
// SECTION: Masking
// ============================================================================

#[test]
fn blacken_discloses_edges() {
    assert_eq!(blacken("Test", "X", 1, 1), "TXXt");
    assert_eq!(blacken("secret", "\u{2588}", 0, 2), "\u{2588}\u{2588}\u{2588}\u{2588}et");
}

#[test]
fn blacken_short_text_is_unchanged() {
    assert_eq!(blacken("ab", "X", 1, 1), "ab");
    assert_eq!(blacken("a", "X", 3, 0), "a");
}

#[test]
fn blacken_counts_characters_not_bytes() {
    assert_eq!(blacken("Hällo", "*", 1, 1), "H***o");
}

// ============================================================================
// SECTION: Decision Model
// ============================================================================

#[test]
fn decision_uses_wire_names() {
    let decision: Decision = serde_json::from_value(json!({
        "decision": "PERMIT",
        "obligations": [{"type": "log"}],
        "resource": {"replaced": true}
    }))
    .unwrap();
    assert_eq!(decision.verdict, Verdict::Permit);
    assert_eq!(decision.obligations.len(), 1);
    assert!(decision.advice.is_empty());
    assert_eq!(decision.resource_replacement, Some(json!({"replaced": true})));
}

#[test]
fn decision_defaults_to_indeterminate() {
    let decision: Decision = serde_json::from_value(json!({})).unwrap();
    assert_eq!(decision.verdict, Verdict::Indeterminate);
    assert_eq!(Decision::default(), Decision::indeterminate());
}

#[test]
fn phases_map_to_signals() {
    assert_eq!(EnforcementPhase::Pre.signal(), Signal::OnDecision);
    assert_eq!(EnforcementPhase::Post.signal(), Signal::OnExecution);
}

#[test]
fn constraint_type_reads_nested_obligation() {
    assert_eq!(constraint_type(&json!({"type": "a"})), Some("a"));
    assert_eq!(constraint_type(&json!({"obligation": {"type": "b"}})), Some("b"));
    assert_eq!(constraint_type(&json!("plain")), None);
}

#[test]
fn responsible_item_matches_first_member_and_strings() {
    let item = ResponsibleItem::new("type", "log");
    assert!(item.is_match(&json!({"type": "log", "level": "info"})));
    assert!(!item.is_match(&json!({"level": "info", "type": "log"})));
    assert!(item.is_match(&json!("type:log")));
    assert!(!item.is_match(&json!(42)));
}

#[test]
fn access_denied_lists_unhandled_obligations() {
    let denial = AccessDenied::unhandled_obligations(&[json!({"type": "x"})]);
    let message = denial.to_string();
    assert!(message.starts_with("Access denied. No handler for obligation"));
    assert!(message.contains("\"type\""));
    assert_eq!(AccessDenied::new().to_string(), "Access denied.");
}

#[test]
fn subscription_key_is_order_insensitive() {
    let left = Subscription::builder()
        .subject(json!({"name": "alice", "role": "doctor"}))
        .action("read")
        .resource("record")
        .build();
    let right = Subscription::builder()
        .subject(json!({"role": "doctor", "name": "alice"}))
        .action("read")
        .resource("record")
        .build();
    assert_eq!(left.canonical_key(), right.canonical_key());
    assert_eq!(left.short_id().len(), 12);
}

#[test]
fn subscription_key_is_sorted_compact_json() {
    let subscription = Subscription::builder()
        .subject(json!({"role": "doctor", "tags": [{"b": 2, "a": 1}, "x"]}))
        .action("read")
        .resource(json!({"id": 7}))
        .build();
    assert_eq!(
        subscription.canonical_key().as_str(),
        r#"{"action":"read","resource":{"id":7},"subject":{"role":"doctor","tags":[{"a":1,"b":2},"x"]}}"#
    );
}

#[test]
fn distinct_subscriptions_get_distinct_keys() {
    let reader =
        Subscription::builder().subject("alice").action("read").resource("record").build();
    let writer =
        Subscription::builder().subject("alice").action("write").resource("record").build();
    let empty = Subscription::builder().build();
    assert_ne!(reader.canonical_key(), writer.canonical_key());
    assert_ne!(reader.canonical_key(), empty.canonical_key());
    assert!(!empty.canonical_key().as_str().is_empty());
    let located = Subscription::builder()
        .subject("alice")
        .action("read")
        .resource("record")
        .environment(json!({"ip": "10.0.0.1"}))
        .build();
    assert_ne!(reader.canonical_key(), located.canonical_key());
}

// ============================================================================
// SECTION: Audit
// ============================================================================

#[test]
fn file_audit_sink_appends_json_lines() {
    use crate::EnforcementAuditEvent;
    use crate::EnforcementAuditSink;
    use crate::EnforcementOutcome;
    use crate::FileAuditSink;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit.jsonl");
    let sink = FileAuditSink::new(&path).unwrap();
    for outcome in [EnforcementOutcome::Permitted, EnforcementOutcome::Denied] {
        sink.record(
            &EnforcementAuditEvent::new(EnforcementPhase::Post, Verdict::Permit, outcome, None)
                .with_subscription_id("abc123"),
        );
    }
    let contents = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<serde_json::Value> =
        contents.lines().map(|line| serde_json::from_str(line).unwrap()).collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["event"], "enforcement");
    assert_eq!(lines[0]["phase"], "post");
    assert_eq!(lines[1]["outcome"], "denied");
    assert_eq!(lines[1]["subscription_id"], "abc123");
}
