// crates/arp-conformance-contract/src/path/tests.rs
// ============================================================================
// Module: Instance Path Tests
// Description: Unit tests for pointer resolution and path ordering.
// Purpose: Keep violation locations readable and deterministically ordered.
// Dependencies: arp-conformance-contract, serde_json
// ============================================================================

//! ## Overview
//! Covers pointer resolution against arrays and objects, escaping, and the
//! prefix-first ordering used when sorting violations.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::missing_docs_in_private_items,
    reason = "Test-only assertions use panic-based helpers."
)]

use serde_json::json;

use super::InstancePath;
use super::PathSegment;

#[test]
fn empty_pointer_is_root() {
    let path = InstancePath::from_pointer("", &json!({"a": 1}));
    assert!(path.segments.is_empty());
    assert_eq!(path.to_string(), "$");
}

#[test]
fn numeric_tokens_index_arrays_only() {
    let instance = json!({"items": [{"0": true}], "map": {"7": 1}});
    assert_eq!(InstancePath::from_pointer("/items/0/0", &instance).to_string(), "$.items[0].0");
    assert_eq!(InstancePath::from_pointer("/map/7", &instance).to_string(), "$.map.7");
}

#[test]
fn escaped_tokens_are_decoded() {
    let instance = json!({"a/b": {"c~d": 1}});
    let path = InstancePath::from_pointer("/a~1b/c~0d", &instance);
    assert_eq!(
        path.segments,
        vec![PathSegment::Key("a/b".to_string()), PathSegment::Key("c~d".to_string())]
    );
}

#[test]
fn tokens_past_missing_values_stay_keys() {
    let path = InstancePath::from_pointer("/missing/0", &json!({}));
    assert_eq!(path.to_string(), "$.missing.0");
}

#[test]
fn prefixes_sort_before_extensions() {
    let instance = json!({"a": [1, 2], "b": 1});
    let mut paths = vec![
        InstancePath::from_pointer("/b", &instance),
        InstancePath::from_pointer("/a/1", &instance),
        InstancePath::from_pointer("/a", &instance),
        InstancePath::from_pointer("", &instance),
        InstancePath::from_pointer("/a/0", &instance),
    ];
    paths.sort();
    let rendered: Vec<String> = paths.iter().map(ToString::to_string).collect();
    assert_eq!(rendered, vec!["$", "$.a", "$.a[0]", "$.a[1]", "$.b"]);
}
