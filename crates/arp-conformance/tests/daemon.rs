// crates/arp-conformance/tests/daemon.rs
// ============================================================================
// Module: Daemon Battery Tests
// Description: Profile selection, async submission, and cleanup accounting.
// Purpose: Verify every created resource is deleted exactly once.
// Dependencies: arp-conformance, arp-conformance-contract, serde_json
// ============================================================================

//! ## Overview
//! Drives the daemon core tier against the stub and counts DELETE calls to
//! confirm cleanup runs once per created resource, in order.

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
use arp_conformance::Tier;
use arp_conformance::run;
use arp_conformance_contract::ServiceKind;
use serde_json::json;

use crate::common::StubConfig;
use crate::common::StubService;
use crate::common::fast_options;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Core-tier run; surface calls are excluded from the counts below by only
/// looking at non-synthetic paths.
fn run_core(config: StubConfig, options: &RunnerOptions) -> (StubService, arp_conformance::ConformanceReport) {
    let stub = StubService::start(config);
    let report = run(ServiceKind::Daemon, stub.base_url(), Tier::Core, options);
    (stub, report)
}

fn count_exact(stub: &StubService, method: &str, path: &str) -> usize {
    stub.requests()
        .iter()
        .filter(|request| request.method == method && request.path == path)
        .count()
}

fn created_profile_path(stub: &StubService) -> Option<String> {
    stub.requests()
        .into_iter()
        .find(|request| request.method == "PUT" && request.body.as_ref().is_some_and(|body| body.get("description").is_some()))
        .map(|request| request.path)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn listed_profile_is_reused_and_instance_cleaned_up() {
    let (stub, report) = run_core(StubConfig::default(), &fast_options());
    assert!(report.ok(), "{}", report.to_text());
    assert!(report.result("core.daemon.create_runtime_profile").is_none());
    assert!(created_profile_path(&stub).is_none());
    let create = stub
        .requests()
        .into_iter()
        .find(|request| request.method == "POST" && request.path == "/v1/instances" && request.body.as_ref().is_some_and(|body| body.get("count").is_some()))
        .unwrap();
    assert_eq!(create.body.unwrap()["runtime_profile"], "default");
    assert_eq!(count_exact(&stub, "DELETE", "/v1/instances/inst_1"), 1);
}

#[test]
fn ephemeral_profile_is_created_and_deleted_after_instances() {
    let config = StubConfig {
        profiles: Vec::new(),
        ..StubConfig::default()
    };
    let (stub, report) = run_core(config, &fast_options());
    assert!(report.ok(), "{}", report.to_text());
    assert_eq!(
        report.result("core.daemon.create_runtime_profile").unwrap().status,
        CheckStatus::Pass
    );
    let profile_path = created_profile_path(&stub).unwrap();
    assert!(profile_path.starts_with("/v1/admin/runtime-profiles/profile_conformance_"));

    let requests = stub.requests();
    let instance_delete = requests
        .iter()
        .position(|request| request.method == "DELETE" && request.path == "/v1/instances/inst_1")
        .unwrap();
    let profile_delete = requests
        .iter()
        .position(|request| request.method == "DELETE" && request.path == profile_path)
        .unwrap();
    assert!(instance_delete < profile_delete);
    assert_eq!(count_exact(&stub, "DELETE", &profile_path), 1);
    assert_eq!(count_exact(&stub, "DELETE", "/v1/instances/inst_1"), 1);
}

#[test]
fn cleanup_disabled_leaves_resources() {
    let config = StubConfig {
        profiles: Vec::new(),
        ..StubConfig::default()
    };
    let options = RunnerOptions {
        cleanup: false,
        ..fast_options()
    };
    let (stub, report) = run_core(config, &options);
    assert!(report.ok(), "{}", report.to_text());
    let profile_path = created_profile_path(&stub).unwrap();
    assert_eq!(count_exact(&stub, "DELETE", &profile_path), 0);
    assert_eq!(count_exact(&stub, "DELETE", "/v1/instances/inst_1"), 0);
}

#[test]
fn synchronous_submit_fails_and_still_cleans_up() {
    let config = StubConfig {
        run_create_status: 200,
        ..StubConfig::default()
    };
    let (stub, report) = run_core(config, &fast_options());
    let submit = report.result("core.daemon.submit_run").unwrap();
    assert_eq!(submit.status, CheckStatus::Fail);
    assert_eq!(submit.message, "Expected 202 RunStatus, got 200");
    assert!(report.result("core.daemon.poll_status").is_none());
    assert_eq!(count_exact(&stub, "DELETE", "/v1/instances/inst_1"), 1);
}

#[test]
fn configured_profile_wins_over_listing() {
    let options = RunnerOptions {
        runtime_profile: Some("gpu".to_string()),
        ..fast_options()
    };
    let (stub, _) = run_core(StubConfig::default(), &options);
    let create = stub
        .requests()
        .into_iter()
        .find(|request| request.method == "POST" && request.path == "/v1/instances" && request.body.as_ref().is_some_and(|body| body.get("count").is_some()))
        .unwrap();
    assert_eq!(create.body.unwrap()["runtime_profile"], "gpu");
}

#[test]
fn schema_invalid_profile_is_still_deleted() {
    let config = StubConfig {
        profiles: Vec::new(),
        profile_put_body: Some(json!({ "profile": "wrong-field" })),
        ..StubConfig::default()
    };
    let (stub, report) = run_core(config, &fast_options());
    let create = report.result("core.daemon.create_runtime_profile").unwrap();
    assert_eq!(create.status, CheckStatus::Fail);
    assert!(!create.errors.is_empty());
    assert!(report.result("core.daemon.create_instance").is_none());
    let instance_creates = stub
        .requests()
        .into_iter()
        .filter(|request| request.method == "POST" && request.path == "/v1/instances")
        .filter(|request| request.body.as_ref().is_some_and(|body| body.get("count").is_some()))
        .count();
    assert_eq!(instance_creates, 0);

    let profile_path = created_profile_path(&stub).unwrap();
    assert_eq!(count_exact(&stub, "DELETE", &profile_path), 1);
}
