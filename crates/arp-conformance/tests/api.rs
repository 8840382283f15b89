// crates/arp-conformance/tests/api.rs
// ============================================================================
// Module: Conformance API Tests
// Description: Multi-service runs and contract loading failures.
// Purpose: Verify run ordering and that a report is always produced.
// Dependencies: arp-conformance, arp-conformance-contract, tempfile
// ============================================================================

//! ## Overview
//! Runs several services through the public entry points and checks that a
//! broken contract source still yields one report per service.

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

use arp_conformance::CheckStatus;
use arp_conformance::RunnerOptions;
use arp_conformance::ServiceTargets;
use arp_conformance::Tier;
use arp_conformance::reports_to_json;
use arp_conformance::run;
use arp_conformance::run_all;
use arp_conformance_contract::ServiceKind;

use crate::common::StubConfig;
use crate::common::StubService;

#[test]
fn run_all_follows_fixed_order_and_skips_missing_services() {
    let runtime = StubService::start(StubConfig::default());
    let daemon = StubService::start(StubConfig::default());
    let targets = ServiceTargets {
        runtime: Some(runtime.base_url().to_string()),
        tool_registry: None,
        daemon: Some(daemon.base_url().to_string()),
    };
    let reports = run_all(Tier::Smoke, &targets, &RunnerOptions::default());
    let services: Vec<ServiceKind> = reports.iter().map(|report| report.service).collect();
    assert_eq!(services, vec![ServiceKind::Runtime, ServiceKind::Daemon]);
    assert!(reports.iter().all(arp_conformance::ConformanceReport::ok));

    let rendered: serde_json::Value = serde_json::from_str(&reports_to_json(&reports).unwrap()).unwrap();
    assert_eq!(rendered["reports"].as_array().unwrap().len(), 2);
    assert_eq!(rendered["ok"], true);
}

#[test]
fn run_all_with_no_targets_is_empty() {
    assert!(run_all(Tier::Smoke, &ServiceTargets::default(), &RunnerOptions::default()).is_empty());
}

#[test]
fn missing_contract_directory_yields_exception_report() {
    let dir = tempfile::tempdir().unwrap();
    let options = RunnerOptions {
        spec_path: Some(dir.path().to_path_buf()),
        ..RunnerOptions::default()
    };
    let report = run(ServiceKind::Runtime, "http://127.0.0.1:1", Tier::Smoke, &options);
    assert_eq!(report.results().len(), 1);
    let failure = &report.results()[0];
    assert_eq!(failure.check_id, "runner.exception");
    assert_eq!(failure.status, CheckStatus::Fail);
    assert_eq!(report.spec_ref, "arp-standard@v1");
}

#[test]
fn unknown_contract_version_yields_exception_report() {
    let options = RunnerOptions {
        spec_version: "v9".to_string(),
        ..RunnerOptions::default()
    };
    let targets = ServiceTargets {
        runtime: Some("http://127.0.0.1:1".to_string()),
        ..ServiceTargets::default()
    };
    let reports = run_all(Tier::Smoke, &targets, &options);
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].results()[0].check_id, "runner.exception");
    assert_eq!(reports[0].spec_ref, "arp-standard@v9");
}
