// crates/arp-conformance/tests/surface.rs
// ============================================================================
// Module: Surface Tier Tests
// Description: Surface verdicts for accepted invalid bodies and error paths.
// Purpose: Verify mutating endpoints must reject deliberately invalid input.
// Dependencies: arp-conformance, arp-conformance-contract
// ============================================================================

//! ## Overview
//! Exercises surface checks: synthetic path ids, `{}` bodies for mutating
//! calls, and the verdict when a service accepts an invalid body.

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

use crate::common::StubConfig;
use crate::common::StubService;

#[test]
fn accepting_an_invalid_run_body_fails() {
    let stub = StubService::start(StubConfig {
        accept_invalid_bodies: Some(201),
        ..StubConfig::default()
    });
    let report = run(ServiceKind::Runtime, stub.base_url(), Tier::Surface, &RunnerOptions::default());
    let create = report
        .results()
        .iter()
        .find(|result| result.name == "POST /v1/runs")
        .unwrap();
    assert_eq!(create.check_id, "surface.03");
    assert_eq!(create.status, CheckStatus::Fail);
    assert!(create.message.contains("201"));
    let exchange = create.exchange.as_ref().unwrap();
    assert_eq!(exchange.request_body, Some(serde_json::json!({})));
    assert!(!report.ok());
}

#[test]
fn templated_paths_are_filled_with_synthetic_ids() {
    let stub = StubService::start(StubConfig::default());
    let report = run(ServiceKind::Daemon, stub.base_url(), Tier::Surface, &RunnerOptions::default());
    assert!(report.ok(), "{}", report.to_text());
    let paths: Vec<String> = stub.requests().into_iter().map(|request| request.path).collect();
    assert!(paths.iter().any(|path| path.starts_with("/v1/instances/inst_conformance_")));
    assert!(
        paths
            .iter()
            .any(|path| path.starts_with("/v1/admin/runtime-profiles/profile_conformance_"))
    );
    assert!(paths.iter().all(|path| !path.contains('{')));
}

#[test]
fn surface_never_creates_resources() {
    let stub = StubService::start(StubConfig::default());
    let _ = run(ServiceKind::Daemon, stub.base_url(), Tier::Surface, &RunnerOptions::default());
    for request in stub.requests() {
        if matches!(request.method.as_str(), "POST" | "PUT") {
            assert_eq!(request.body, Some(serde_json::json!({})), "{}", request.path);
        }
    }
}
