// crates/arp-conformance/src/api.rs
// ============================================================================
// Module: Conformance API
// Description: Entry points that load the contract and run one or more services.
// Purpose: Give library callers and the CLI a single, infallible surface.
// Dependencies: arp-conformance-contract, tracing
// ============================================================================

//! ## Overview
//! [`run`] and [`run_all`] always return reports: a contract that fails to
//! load becomes a report holding one `runner.exception` FAIL. [`run_all`]
//! loads the contract once and shares it across services, running them in
//! the fixed order runtime, tool registry, daemon.

// ============================================================================
// SECTION: Imports
// ============================================================================

use arp_conformance_contract::Contract;
use arp_conformance_contract::ContractError;
use arp_conformance_contract::ContractSource;
use arp_conformance_contract::ServiceKind;
use arp_conformance_contract::spec_ref;
use tracing::info;
use tracing::warn;

use crate::options::RunnerOptions;
use crate::options::Tier;
use crate::report::ConformanceReport;
use crate::runner::ConformanceRunner;
use crate::runner::epoch_ms;
use crate::runner::exception_result;

// ============================================================================
// SECTION: Targets
// ============================================================================

/// Base URLs for a multi-service run; absent services are skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceTargets {
    /// Runtime base URL.
    pub runtime: Option<String>,
    /// Tool registry base URL.
    pub tool_registry: Option<String>,
    /// Daemon base URL.
    pub daemon: Option<String>,
}

impl ServiceTargets {
    /// Returns the configured targets in run order.
    #[must_use]
    pub fn in_order(&self) -> Vec<(ServiceKind, &str)> {
        [
            (ServiceKind::Runtime, self.runtime.as_deref()),
            (ServiceKind::ToolRegistry, self.tool_registry.as_deref()),
            (ServiceKind::Daemon, self.daemon.as_deref()),
        ]
        .into_iter()
        .filter_map(|(service, url)| url.map(|url| (service, url)))
        .collect()
    }
}

// ============================================================================
// SECTION: Entry Points
// ============================================================================

/// Loads the contract selected by `options`.
///
/// # Errors
///
/// Returns [`ContractError`] when the contract cannot be read or compiled.
pub fn load_contract(options: &RunnerOptions) -> Result<Contract, ContractError> {
    let source = ContractSource::from_path(options.spec_path.clone());
    Contract::load(&source, &options.spec_version)
}

/// Runs `tier` against one service.
#[must_use]
pub fn run(service: ServiceKind, base_url: &str, tier: Tier, options: &RunnerOptions) -> ConformanceReport {
    match load_contract(options) {
        Ok(contract) => run_with_contract(&contract, service, base_url, tier, options),
        Err(err) => contract_failure_report(service, tier, options, &err),
    }
}

/// Runs `tier` against one service with an already loaded contract.
#[must_use]
pub fn run_with_contract(
    contract: &Contract,
    service: ServiceKind,
    base_url: &str,
    tier: Tier,
    options: &RunnerOptions,
) -> ConformanceReport {
    ConformanceRunner::new(contract, service, base_url, options.clone()).run(tier)
}

/// Runs `tier` against every configured service, in run order.
#[must_use]
pub fn run_all(tier: Tier, targets: &ServiceTargets, options: &RunnerOptions) -> Vec<ConformanceReport> {
    let services = targets.in_order();
    info!(%tier, services = services.len(), "multi-service conformance run");
    match load_contract(options) {
        Ok(contract) => services
            .into_iter()
            .map(|(service, url)| run_with_contract(&contract, service, url, tier, options))
            .collect(),
        Err(err) => services
            .into_iter()
            .map(|(service, _)| contract_failure_report(service, tier, options, &err))
            .collect(),
    }
}

/// Report for a run whose contract never loaded.
fn contract_failure_report(
    service: ServiceKind,
    tier: Tier,
    options: &RunnerOptions,
    err: &ContractError,
) -> ConformanceReport {
    warn!(%service, error = %err, "contract failed to load");
    let now = epoch_ms();
    ConformanceReport::new(
        service,
        tier,
        spec_ref(&options.spec_version),
        now,
        now,
        vec![exception_result(format!("contract error: {err}"))],
    )
}
