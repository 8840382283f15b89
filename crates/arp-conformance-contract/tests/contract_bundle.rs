// crates/arp-conformance-contract/tests/contract_bundle.rs
// ============================================================================
// Module: Contract Bundle Tests
// Description: Integration tests for the public contract loading surface.
// Purpose: Ensure the bundled snapshot and on-disk copies behave the same.
// Dependencies: arp-conformance-contract, proptest, serde_json, tempfile
// ============================================================================

//! ## Overview
//! Writes the embedded snapshot to disk, reloads it through a directory
//! source, and checks both loads agree. Also property-tests path rendering.

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

use std::fs;

use arp_conformance_contract::Contract;
use arp_conformance_contract::ContractSource;
use arp_conformance_contract::InstancePath;
use arp_conformance_contract::ServiceKind;
use proptest::prelude::*;
use serde_json::json;

/// Copies the embedded v1 snapshot into `root/v1/`.
fn materialize_embedded(root: &std::path::Path) -> Result<(), Box<dyn std::error::Error>> {
    let source = ContractSource::Embedded;
    let mut paths: Vec<String> =
        source.schema_files("v1")?.into_iter().map(|file| file.path).collect();
    paths.push("conformance/required_endpoints.json".to_string());
    for path in paths {
        let target = root.join("v1").join(&path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(target, source.read_file("v1", &path)?)?;
    }
    Ok(())
}

#[test]
fn directory_copy_matches_embedded_contract() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    materialize_embedded(dir.path())?;

    let embedded = Contract::embedded()?;
    let on_disk = Contract::load(&ContractSource::Directory(dir.path().to_path_buf()), "v1")?;

    assert_eq!(embedded.spec_ref(), "arp-standard@v1");
    assert_eq!(on_disk.spec_ref(), embedded.spec_ref());
    for file in ContractSource::Embedded.schema_files("v1")? {
        assert!(on_disk.schemas().contains(&file.path), "{}", file.path);
    }
    assert_eq!(embedded.endpoints(), on_disk.endpoints());

    let sample = json!({"error": {"code": "not_found", "message": "nope", "extra": 1}});
    let path = "schemas/common/error.schema.json";
    assert_eq!(embedded.schemas().validate(&sample, path)?, on_disk.schemas().validate(&sample, path)?);
    Ok(())
}

#[cfg(unix)]
#[test]
fn directory_walk_ignores_symlinked_directories() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    materialize_embedded(dir.path())?;
    let schemas = dir.path().join("v1").join("schemas");
    std::os::unix::fs::symlink(&schemas, schemas.join("common").join("loop"))?;

    let source = ContractSource::Directory(dir.path().to_path_buf());
    let on_disk: Vec<String> = source.schema_files("v1")?.into_iter().map(|file| file.path).collect();
    let embedded: Vec<String> =
        ContractSource::Embedded.schema_files("v1")?.into_iter().map(|file| file.path).collect();
    assert_eq!(on_disk, embedded);
    assert!(Contract::load(&source, "v1").is_ok());
    Ok(())
}

#[test]
fn service_kinds_parse_from_wire_labels() {
    for kind in ServiceKind::ALL {
        assert_eq!(kind.as_str().parse::<ServiceKind>(), Ok(kind));
    }
    assert!("tool_registry".parse::<ServiceKind>().is_err());
}

proptest! {
    #[test]
    fn rendered_paths_start_at_root(keys in proptest::collection::vec("[a-z_]{1,8}", 0..6)) {
        let mut instance = json!(true);
        for key in keys.iter().rev() {
            let mut wrapped = serde_json::Map::new();
            wrapped.insert(key.clone(), instance);
            instance = serde_json::Value::Object(wrapped);
        }
        let pointer: String = keys.iter().map(|key| format!("/{key}")).collect();
        let expected: String = keys.iter().map(|key| format!(".{key}")).collect();
        let rendered = InstancePath::from_pointer(&pointer, &instance).to_string();
        prop_assert_eq!(rendered, format!("${expected}"));
    }

    #[test]
    fn path_order_is_prefix_first(
        base in proptest::collection::vec(0usize..4, 0..4),
        extra in 0usize..4,
    ) {
        let mut instance = json!([0, 1, 2, 3]);
        for _ in 0..=base.len() {
            instance = json!([instance.clone(), instance.clone(), instance.clone(), instance]);
        }
        let pointer: String = base.iter().map(|index| format!("/{index}")).collect();
        let prefix = InstancePath::from_pointer(&pointer, &instance);
        let longer = InstancePath::from_pointer(&format!("{pointer}/{extra}"), &instance);
        prop_assert!(prefix < longer);
        let suffix = format!("[{extra}]");
        prop_assert!(longer.to_string().ends_with(&suffix));
    }
}
