// crates/arp-conformance/src/runner.rs
// ============================================================================
// Module: Conformance Runner
// Description: Tiered check orchestration against one live ARP service.
// Purpose: Drive smoke, surface, core, and deep batteries and build a report.
// Dependencies: arp-conformance-contract, serde_json, time, tracing
// ============================================================================

//! ## Overview
//! A [`ConformanceRunner`] is bound to one service base URL and one options
//! set, runs exactly once, and is consumed by [`ConformanceRunner::run`].
//! Tiers are cumulative: running tier `T` executes every lower tier first, in
//! order. The only short-circuit is the mutation guard for `core` and `deep`.
//! Past the guard, options are validated and every schema the checks use must
//! be registered before the first request.
//!
//! Each check captures its own failure locally. Contract lookups that fail
//! and panics inside check logic are caught once at the run boundary and
//! recorded as a single `runner.exception` FAIL, so a run always yields a
//! report. The transport is closed on every exit path.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::any::Any;
use std::fmt;
use std::panic;
use std::panic::AssertUnwindSafe;
use std::time::Instant;

use arp_conformance_contract::Contract;
use arp_conformance_contract::ContractError;
use arp_conformance_contract::ERROR_ENVELOPE_SCHEMA;
use arp_conformance_contract::SchemaRegistry;
use arp_conformance_contract::ServiceKind;
use serde_json::Value;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::info;
use tracing::warn;

use crate::options::OptionsError;
use crate::options::RunnerOptions;
use crate::options::Tier;
use crate::report::CheckResult;
use crate::report::CheckStatus;
use crate::report::ConformanceReport;
use crate::report::HttpExchange;
use crate::transport::HttpResponse;
use crate::transport::HttpTransport;
use crate::transport::TransportConfig;
use crate::transport::TransportError;

// ============================================================================
// SECTION: Modules
// ============================================================================

mod core_daemon;
mod core_runtime;
mod core_tools;
mod deep;
mod polling;
mod schema_paths;
mod smoke;
mod surface;
pub mod synth;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Check id recorded when the mutation guard stops a run.
pub const GUARD_CHECK_ID: &str = "guard.allow_mutations";
/// Check id recorded for errors caught at the run boundary.
pub const EXCEPTION_CHECK_ID: &str = "runner.exception";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Internal failures that end a run early.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// The contract could not be loaded or queried.
    #[error("contract error: {0}")]
    Contract(#[from] ContractError),
    /// Options failed validation.
    #[error("invalid options: {0}")]
    Options(#[from] OptionsError),
}

// ============================================================================
// SECTION: Check Plumbing
// ============================================================================

/// Append-only result list for one run.
#[derive(Debug, Default)]
pub(crate) struct CheckLog {
    /// Results in execution order.
    results: Vec<CheckResult>,
}

impl CheckLog {
    /// Appends a result.
    pub(crate) fn push(&mut self, result: CheckResult) {
        self.results.push(result);
    }

    /// Consumes the log.
    pub(crate) fn into_results(self) -> Vec<CheckResult> {
        self.results
    }
}

/// Identity and timer of a check in progress.
pub(crate) struct Check {
    /// Stable check id.
    id: String,
    /// Display name.
    name: String,
    /// Start time.
    started: Instant,
}

impl Check {
    /// Starts a check.
    pub(crate) fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            started: Instant::now(),
        }
    }

    /// Builds a result stamped with the elapsed time.
    pub(crate) fn verdict(&self, status: CheckStatus, message: impl Into<String>) -> CheckResult {
        let elapsed = u64::try_from(self.started.elapsed().as_millis()).ok();
        CheckResult::new(self.id.clone(), self.name.clone(), status, message)
            .with_duration_ms(elapsed)
    }

    /// Records a network failure as FAIL.
    pub(crate) fn transport_failure(
        &self,
        method: &str,
        url: String,
        request_body: Option<&Value>,
        err: &TransportError,
    ) -> CheckResult {
        self.verdict(CheckStatus::Fail, format!("Request failed: {err}")).with_exchange(Some(
            HttpExchange {
                method: method.to_string(),
                url,
                request_body: request_body.cloned(),
                status_code: None,
                content_type: None,
                response_body: None,
            },
        ))
    }
}

/// Status a step must answer with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ExpectStatus {
    /// Any 2xx.
    Success,
    /// One exact code.
    Exactly(u16),
}

impl fmt::Display for ExpectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => f.write_str("2xx"),
            Self::Exactly(code) => write!(f, "{code}"),
        }
    }
}

/// What a successful step response must look like.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Expectation {
    /// Acceptable status.
    pub(crate) status: ExpectStatus,
    /// Schema for the body (or each element when `array`).
    pub(crate) schema: &'static str,
    /// Type name used in messages.
    pub(crate) label: &'static str,
    /// Body is a JSON array validated element-wise.
    pub(crate) array: bool,
}

impl Expectation {
    /// Expects any 2xx with a document matching `schema`.
    pub(crate) const fn success(schema: &'static str, label: &'static str) -> Self {
        Self {
            status: ExpectStatus::Success,
            schema,
            label,
            array: false,
        }
    }
}

/// Outcome of judging one response.
pub(crate) enum Judged {
    /// Expected status and schema-valid body.
    Valid {
        /// Parsed body.
        body: Value,
        /// Snapshot including the parsed body.
        exchange: HttpExchange,
    },
    /// The step already has its (failing) verdict.
    Verdict(CheckResult),
}

// ============================================================================
// SECTION: Runner
// ============================================================================

/// Runs conformance tiers against one service.
pub struct ConformanceRunner<'c> {
    /// Loaded contract shared across runs.
    contract: &'c Contract,
    /// Service kind under test.
    service: ServiceKind,
    /// Transport bound to the service base URL.
    transport: HttpTransport,
    /// Run options.
    options: RunnerOptions,
}

impl<'c> ConformanceRunner<'c> {
    /// Binds a runner to `base_url`; nothing is sent until [`Self::run`].
    #[must_use]
    pub fn new(
        contract: &'c Contract,
        service: ServiceKind,
        base_url: &str,
        options: RunnerOptions,
    ) -> Self {
        let transport = HttpTransport::new(TransportConfig {
            base_url: base_url.to_string(),
            timeout: options.timeout,
            retries: options.retries,
            headers: options.headers.clone(),
        });
        Self {
            contract,
            service,
            transport,
            options,
        }
    }

    /// Executes `tier` (and every lower tier) and returns the report.
    ///
    /// Never fails: internal errors and panics become a `runner.exception`
    /// FAIL appended after the results gathered so far.
    #[must_use]
    pub fn run(mut self, tier: Tier) -> ConformanceReport {
        let started = epoch_ms();
        let mut log = CheckLog::default();
        info!(service = %self.service, %tier, "conformance run started");
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.execute(tier, &mut log)));
        let failure = match outcome {
            Ok(Ok(())) => None,
            Ok(Err(err)) => Some(err.to_string()),
            Err(payload) => Some(format!("panic: {}", panic_message(payload.as_ref()))),
        };
        if let Some(message) = failure {
            warn!(service = %self.service, error = %message, "conformance run aborted");
            log.push(exception_result(message));
        }
        self.transport.close();
        let report = ConformanceReport::new(
            self.service,
            tier,
            self.contract.spec_ref(),
            started,
            epoch_ms(),
            log.into_results(),
        );
        info!(
            service = %self.service,
            %tier,
            ok = report.ok(),
            counts = %report.counts(),
            "conformance run finished"
        );
        report
    }

    /// Runs the tiers in order, honouring the mutation guard.
    fn execute(&self, tier: Tier, log: &mut CheckLog) -> Result<(), RunnerError> {
        if tier.requires_mutations() && !self.options.allow_mutations {
            log.push(guard_result(tier));
            return Ok(());
        }
        self.options.validate()?;
        if let Some(missing) =
            schema_paths::ALL.into_iter().find(|path| !self.schemas().contains(path))
        {
            return Err(ContractError::UnknownSchema(missing.to_string()).into());
        }
        for current in Tier::ALL.into_iter().take_while(|candidate| *candidate <= tier) {
            info!(service = %self.service, tier = %current, "entering tier");
            match (current, self.service) {
                (Tier::Smoke, _) => self.check_smoke(log)?,
                (Tier::Surface, _) => self.check_surface(log)?,
                (Tier::Core, ServiceKind::Runtime) => self.check_core_runtime(log)?,
                (Tier::Core, ServiceKind::ToolRegistry) => self.check_core_tool_registry(log)?,
                (Tier::Core, ServiceKind::Daemon) => self.check_core_daemon(log)?,
                (Tier::Deep, _) => self.check_deep(log)?,
            }
        }
        Ok(())
    }

    /// Returns the schema registry.
    pub(crate) const fn schemas(&self) -> &SchemaRegistry {
        self.contract.schemas()
    }

    /// Sends a request with default headers.
    pub(crate) fn send(
        &self,
        method: &str,
        path: &str,
        body: Option<&Value>,
    ) -> Result<HttpResponse, TransportError> {
        self.transport.request(method, path, body, &[])
    }

    /// Sends a request and judges it against `expect`.
    pub(crate) fn fetch(
        &self,
        check: &Check,
        method: &str,
        path: &str,
        body: Option<&Value>,
        expect: &Expectation,
    ) -> Result<Judged, RunnerError> {
        match self.send(method, path, body) {
            Ok(response) => self.judge(check, method, body, &response, expect),
            Err(err) => Ok(Judged::Verdict(check.transport_failure(
                method,
                self.transport.url_for(path),
                body,
                &err,
            ))),
        }
    }

    /// Applies the status, JSON, and schema gates to a response.
    pub(crate) fn judge(
        &self,
        check: &Check,
        method: &str,
        request_body: Option<&Value>,
        response: &HttpResponse,
        expect: &Expectation,
    ) -> Result<Judged, RunnerError> {
        let status_ok = match expect.status {
            ExpectStatus::Success => response.is_success(),
            ExpectStatus::Exactly(code) => response.status == code,
        };
        if !status_ok {
            let (parsed, errors) = self.error_body_diagnostics(response)?;
            return Ok(Judged::Verdict(
                check
                    .verdict(
                        CheckStatus::Fail,
                        format!("Expected {} {}, got {}", expect.status, expect.label, response.status),
                    )
                    .with_errors(errors)
                    .with_exchange(Some(exchange(method, response, request_body, parsed.as_ref()))),
            ));
        }
        let body = match response.json() {
            Ok(body) => body,
            Err(err) => {
                return Ok(Judged::Verdict(
                    check
                        .verdict(CheckStatus::Fail, format!("{} JSON parse failed", expect.label))
                        .with_errors(vec![format!("Response was not valid JSON: {err}")])
                        .with_exchange(Some(exchange(method, response, request_body, None))),
                ));
            }
        };
        let violations = if expect.array {
            match body.as_array() {
                Some(items) => self.schemas().validate_items(items, expect.schema)?,
                None => {
                    return Ok(Judged::Verdict(
                        check.verdict(CheckStatus::Fail, "Expected JSON array").with_exchange(Some(
                            exchange(method, response, request_body, Some(&body)),
                        )),
                    ));
                }
            }
        } else {
            self.schemas().validate(&body, expect.schema)?
        };
        let snapshot = exchange(method, response, request_body, Some(&body));
        if !violations.is_empty() {
            return Ok(Judged::Verdict(
                check
                    .verdict(CheckStatus::Fail, format!("{} did not match schema", expect.label))
                    .with_errors(violations)
                    .with_exchange(Some(snapshot)),
            ));
        }
        Ok(Judged::Valid {
            body,
            exchange: snapshot,
        })
    }

    /// Parses an error body and lists its envelope violations.
    pub(crate) fn error_body_diagnostics(
        &self,
        response: &HttpResponse,
    ) -> Result<(Option<Value>, Vec<String>), RunnerError> {
        match response.json() {
            Ok(value) => {
                let errors = self.schemas().validate(&value, ERROR_ENVELOPE_SCHEMA)?;
                Ok((Some(value), errors))
            }
            Err(err) => Ok((None, vec![format!("Error response was not valid JSON: {err}")])),
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Builds an exchange snapshot from a response.
pub(crate) fn exchange(
    method: &str,
    response: &HttpResponse,
    request_body: Option<&Value>,
    response_body: Option<&Value>,
) -> HttpExchange {
    HttpExchange {
        method: method.to_string(),
        url: response.url.clone(),
        request_body: request_body.cloned(),
        status_code: Some(response.status),
        content_type: response.content_type.clone(),
        response_body: response_body.cloned(),
    }
}

/// Result recorded when the mutation guard blocks a tier.
fn guard_result(tier: Tier) -> CheckResult {
    CheckResult::new(
        GUARD_CHECK_ID,
        "Require allow_mutations",
        CheckStatus::Fail,
        format!("Tier {tier} creates resources and requires allow_mutations (--allow-mutations)"),
    )
}

/// Result recorded for an error caught at the run boundary.
pub(crate) fn exception_result(message: String) -> CheckResult {
    CheckResult::new(EXCEPTION_CHECK_ID, "Unhandled runner error", CheckStatus::Fail, message)
}

/// Extracts a printable message from a panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string())
}

/// Returns milliseconds since the Unix epoch.
pub(crate) fn epoch_ms() -> u64 {
    let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
    u64::try_from(millis).unwrap_or_default()
}
