// crates/arp-conformance-contract/src/schemas/tests.rs
// ============================================================================
// Module: Schema Registry Unit Tests
// Description: Validates the bundled contract and registry diagnostics.
// Purpose: Ensure cross-schema refs resolve offline and output is ordered.
// Dependencies: arp-conformance-contract, serde_json, tempfile
// ============================================================================

//! ## Overview
//! Exercises the embedded `v1` snapshot, a directory-backed contract, and
//! the ordering and rendering of violations.

// ============================================================================
// SECTION: Lint Configuration
// ============================================================================

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    clippy::missing_docs_in_private_items,
    reason = "Test-only validation helpers use panic-based assertions for clarity."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;

use serde_json::Value;
use serde_json::json;

use super::ERROR_ENVELOPE_SCHEMA;
use super::SchemaRegistry;
use super::schema_uri;
use crate::error::ContractError;
use crate::source::ContractFile;
use crate::source::ContractSource;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

fn embedded() -> SchemaRegistry {
    SchemaRegistry::load(&ContractSource::Embedded, "v1").expect("embedded contract loads")
}

fn file(path: &str, contents: &Value) -> ContractFile {
    ContractFile {
        path: path.to_string(),
        contents: contents.to_string(),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn embedded_contract_contains_error_envelope() {
    let registry = embedded();
    assert!(registry.contains(ERROR_ENVELOPE_SCHEMA));
    assert!(!registry.contains("schemas/common/missing.schema.json"));
}

#[test]
fn schemas_without_id_are_registered_under_contract_uri() {
    let name_uri = schema_uri("v3", "schemas/common/name.schema.json");
    let registry = SchemaRegistry::from_files(
        "v3",
        vec![
            file("schemas/common/name.schema.json", &json!({"type": "string"})),
            file(
                "schemas/other/thing.schema.json",
                &json!({"type": "object", "properties": {"name": {"$ref": name_uri}}}),
            ),
        ],
    )
    .unwrap();
    let errors = registry.validate(&json!({"name": 7}), "schemas/other/thing.schema.json").unwrap();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].starts_with("$.name: "), "{errors:?}");
}

#[test]
fn valid_health_has_no_violations() {
    let errors = embedded()
        .validate(
            &json!({"status": "ok", "time": "2024-01-01T00:00:00Z"}),
            "schemas/common/health.schema.json",
        )
        .unwrap();
    assert!(errors.is_empty(), "unexpected errors: {errors:?}");
}

#[test]
fn relative_refs_resolve_across_directories() {
    let registry = embedded();
    let bad_result = json!({
        "run_id": "run_1",
        "ok": false,
        "error": {"message": "missing code"}
    });
    let errors = registry.validate(&bad_result, "schemas/runtime/runs/run_result.schema.json").unwrap();
    assert_eq!(errors.len(), 1, "{errors:?}");
    assert!(errors[0].starts_with("$.error: "), "{errors:?}");

    let list = json!({"instances": [{"instance_id": "i", "state": "ready"}]});
    let errors = registry
        .validate(&list, "schemas/daemon/instances/instance_list_response.schema.json")
        .unwrap();
    assert_eq!(errors.len(), 1, "{errors:?}");
    assert!(errors[0].starts_with("$.instances[0]: "), "{errors:?}");
}

#[test]
fn violations_are_sorted_by_location() {
    let registry = embedded();
    let instance = json!({
        "supported_api_versions": [1],
        "service_version": 7,
        "service_name": ""
    });
    let errors = registry.validate(&instance, "schemas/common/version_info.schema.json").unwrap();
    let locations: Vec<&str> =
        errors.iter().map(|line| line.split(": ").next().unwrap_or_default()).collect();
    assert_eq!(
        locations,
        vec!["$.service_name", "$.service_version", "$.supported_api_versions[0]"]
    );
    let again = registry.validate(&instance, "schemas/common/version_info.schema.json").unwrap();
    assert_eq!(errors, again);
}

#[test]
fn element_wise_validation_prefixes_index() {
    let registry = embedded();
    let tools = vec![
        json!({"tool_id": "t1", "name": "echo", "input_schema": {}, "source": "local"}),
        json!({"tool_id": "t2", "name": "echo", "input_schema": {}}),
    ];
    let errors = registry
        .validate_items(&tools, "schemas/tool_registry/tools/tool_definition.schema.json")
        .unwrap();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].starts_with("[1] $: "), "{errors:?}");
}

#[test]
fn unknown_schema_path_is_an_error() {
    let err = embedded().validate(&json!({}), "schemas/nope.schema.json").unwrap_err();
    assert!(matches!(err, ContractError::UnknownSchema(path) if path == "schemas/nope.schema.json"));
}

#[test]
fn unknown_embedded_version_is_rejected() {
    let err = SchemaRegistry::load(&ContractSource::Embedded, "v9").unwrap_err();
    assert!(matches!(err, ContractError::UnsupportedVersion(_)));
    let err = SchemaRegistry::load(&ContractSource::Embedded, "../v1").unwrap_err();
    assert!(matches!(err, ContractError::UnsupportedVersion(_)));
}

#[test]
fn directory_source_loads_nested_schemas() {
    let dir = tempfile::tempdir().unwrap();
    let common = dir.path().join("v2").join("schemas").join("common");
    fs::create_dir_all(&common).unwrap();
    fs::write(
        common.join("name.schema.json"),
        json!({"type": "string", "minLength": 1}).to_string(),
    )
    .unwrap();
    fs::write(
        common.join("thing.schema.json"),
        json!({
            "type": "object",
            "required": ["name"],
            "properties": {"name": {"$ref": "name.schema.json"}}
        })
        .to_string(),
    )
    .unwrap();
    fs::write(common.join("README.md"), "ignored").unwrap();

    let source = ContractSource::from_path(Some(dir.path().to_path_buf()));
    let registry = SchemaRegistry::load(&source, "v2").unwrap();
    assert!(registry.contains("schemas/common/name.schema.json"));
    assert!(registry.contains("schemas/common/thing.schema.json"));
    assert!(!registry.contains("schemas/common/README.md"));
    let errors =
        registry.validate(&json!({"name": ""}), "schemas/common/thing.schema.json").unwrap();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].starts_with("$.name: "));
}

#[test]
fn missing_directory_version_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let source = ContractSource::Directory(dir.path().to_path_buf());
    let err = SchemaRegistry::load(&source, "v1").unwrap_err();
    assert!(matches!(err, ContractError::UnsupportedVersion(_)));
}

#[test]
fn non_object_schema_is_invalid() {
    let err =
        SchemaRegistry::from_files("v1", vec![file("schemas/a.schema.json", &json!([1]))]).unwrap_err();
    assert!(matches!(err, ContractError::InvalidFile { .. }));
}

#[test]
fn dangling_ref_fails_at_load() {
    let files = vec![file(
        "schemas/a.schema.json",
        &json!({"type": "object", "properties": {"b": {"$ref": "missing.schema.json"}}}),
    )];
    assert!(SchemaRegistry::from_files("v1", files).is_err());
}
