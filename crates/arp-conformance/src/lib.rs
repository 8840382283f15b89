// crates/arp-conformance/src/lib.rs
// ============================================================================
// Module: ARP Conformance
// Description: Black-box conformance runner for ARP HTTP services.
// Purpose: Check a live runtime, tool registry, or daemon and report verdicts.
// Dependencies: arp-conformance-contract, reqwest, serde, time, tracing
// ============================================================================

//! ## Overview
//! The runner drives a live ARP service through cumulative tiers (`smoke`,
//! `surface`, `core`, `deep`) and records one [`CheckResult`] per check in a
//! [`ConformanceReport`]. Verdicts come only from validating responses
//! against the contract in `arp-conformance-contract`.
//!
//! Invariants:
//! - A run always produces a report, even when the contract fails to load.
//! - `core` and `deep` refuse to run without `allow_mutations`.
//! - Resources created by the daemon battery are deleted unless cleanup is
//!   disabled.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod api;
pub mod options;
pub mod report;
pub mod runner;
pub mod transport;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use api::ServiceTargets;
pub use api::load_contract;
pub use api::run;
pub use api::run_all;
pub use api::run_with_contract;
pub use options::OptionsError;
pub use options::RunnerOptions;
pub use options::Tier;
pub use report::CheckResult;
pub use report::CheckStatus;
pub use report::ConformanceReport;
pub use report::HttpExchange;
pub use report::StatusCounts;
pub use report::reports_to_json;
pub use report::reports_to_junit_xml;
pub use report::reports_to_text;
pub use runner::ConformanceRunner;
pub use runner::RunnerError;
pub use transport::HttpResponse;
pub use transport::HttpTransport;
pub use transport::TransportConfig;
pub use transport::TransportError;
