// crates/arp-conformance/src/runner/surface.rs
// ============================================================================
// Module: Surface Tier
// Description: Shape checks for every required endpoint of a service.
// Purpose: Verify each endpoint exists and answers in a contract shape.
// Dependencies: arp-conformance-contract, serde_json
// ============================================================================

//! ## Overview
//! Templated paths are filled with synthetic ids and mutating endpoints get
//! a deliberately empty body, so a conformant service answers most calls on
//! its error path. Verdicts, in order:
//! - mutating call accepted (< 400): FAIL, the invalid body was not rejected
//! - no-content endpoint answering 204: PASS
//! - status < 400: body must match the endpoint's success schema
//! - otherwise: body must match the error envelope

// ============================================================================
// SECTION: Imports
// ============================================================================

use arp_conformance_contract::Endpoint;
use serde_json::Map;
use serde_json::Value;
use tracing::debug;

use super::Check;
use super::CheckLog;
use super::ConformanceRunner;
use super::RunnerError;
use super::exchange;
use super::schema_paths;
use super::synth::fill_path;
use crate::report::CheckResult;
use crate::report::CheckStatus;
use crate::report::HttpExchange;
use crate::transport::HttpResponse;

// ============================================================================
// SECTION: Expectations
// ============================================================================

/// How a surface endpoint's success path is judged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct SurfaceExpectation {
    /// Success body schema; `None` accepts any success body.
    pub(crate) schema: Option<&'static str>,
    /// Success body is an array validated element-wise.
    pub(crate) array: bool,
    /// A 204 with no body is a valid success.
    pub(crate) no_content: bool,
}

impl SurfaceExpectation {
    /// Success body must match `schema`.
    const fn document(schema: &'static str) -> Self {
        Self {
            schema: Some(schema),
            array: false,
            no_content: false,
        }
    }

    /// Success body is an array of `schema` documents.
    const fn list(schema: &'static str) -> Self {
        Self {
            schema: Some(schema),
            array: true,
            no_content: false,
        }
    }

    /// Success is 204 without a body.
    const fn no_content() -> Self {
        Self {
            schema: None,
            array: false,
            no_content: true,
        }
    }
}

/// Success expectation for a known endpoint; unknown endpoints accept any
/// success body.
pub(crate) fn surface_expectation(method: &str, path: &str) -> SurfaceExpectation {
    match (method, path) {
        ("GET", "/v1/health") => SurfaceExpectation::document(schema_paths::HEALTH),
        ("GET", "/v1/version") => SurfaceExpectation::document(schema_paths::VERSION_INFO),
        ("GET", "/v1/tools") => SurfaceExpectation::list(schema_paths::TOOL_DEFINITION),
        ("GET", "/v1/tools/{tool_id}") => SurfaceExpectation::document(schema_paths::TOOL_DEFINITION),
        ("POST", "/v1/tool-invocations") => {
            SurfaceExpectation::document(schema_paths::TOOL_INVOCATION_RESULT)
        }
        ("POST", "/v1/runs") | ("GET", "/v1/runs/{run_id}") => {
            SurfaceExpectation::document(schema_paths::RUN_STATUS)
        }
        ("GET", "/v1/runs/{run_id}/result") => SurfaceExpectation::document(schema_paths::RUN_RESULT),
        ("GET", "/v1/runs") => SurfaceExpectation::document(schema_paths::RUN_LIST_RESPONSE),
        ("GET", "/v1/instances") => SurfaceExpectation::document(schema_paths::INSTANCE_LIST_RESPONSE),
        ("POST", "/v1/instances") => {
            SurfaceExpectation::document(schema_paths::INSTANCE_CREATE_RESPONSE)
        }
        ("POST", "/v1/instances:register") => {
            SurfaceExpectation::document(schema_paths::INSTANCE_REGISTER_RESPONSE)
        }
        ("GET", "/v1/admin/runtime-profiles") => {
            SurfaceExpectation::document(schema_paths::RUNTIME_PROFILE_LIST_RESPONSE)
        }
        ("GET" | "PUT", "/v1/admin/runtime-profiles/{runtime_profile}") => {
            SurfaceExpectation::document(schema_paths::RUNTIME_PROFILE)
        }
        ("DELETE", "/v1/instances/{instance_id}" | "/v1/admin/runtime-profiles/{runtime_profile}") => {
            SurfaceExpectation::no_content()
        }
        _ => SurfaceExpectation::default(),
    }
}

/// Methods that receive the deliberately invalid body.
pub(crate) fn is_mutating(method: &str) -> bool {
    matches!(method, "POST" | "PUT" | "PATCH")
}

// ============================================================================
// SECTION: Surface Checks
// ============================================================================

impl ConformanceRunner<'_> {
    /// Checks every required endpoint in inventory order.
    pub(super) fn check_surface(&self, log: &mut CheckLog) -> Result<(), RunnerError> {
        let endpoints = self.contract.endpoints().required_for(self.service);
        debug!(service = %self.service, count = endpoints.len(), "surface endpoints");
        for (index, endpoint) in endpoints.into_iter().enumerate() {
            let result = self.check_endpoint(index + 1, endpoint)?;
            log.push(result);
        }
        Ok(())
    }

    /// Judges one endpoint.
    fn check_endpoint(&self, ordinal: usize, endpoint: &Endpoint) -> Result<CheckResult, RunnerError> {
        let check = Check::new(
            format!("surface.{ordinal:02}"),
            format!("{} {}", endpoint.method, endpoint.path),
        );
        let method = endpoint.method.as_str();
        let path = fill_path(&endpoint.path);
        let mutating = is_mutating(method);
        let body = mutating.then(|| Value::Object(Map::new()));
        let response = match self.send(method, &path, body.as_ref()) {
            Ok(response) => response,
            Err(err) => {
                return Ok(check.transport_failure(
                    method,
                    self.transport.url_for(&path),
                    body.as_ref(),
                    &err,
                ));
            }
        };
        let expectation = surface_expectation(method, &endpoint.path);
        let snapshot = |parsed: Option<&Value>| Some(exchange(method, &response, body.as_ref(), parsed));

        if mutating && response.status < 400 {
            return Ok(check
                .verdict(
                    CheckStatus::Fail,
                    format!(
                        "Expected rejection of an invalid request body, got {}",
                        response.status
                    ),
                )
                .with_exchange(snapshot(response.json().ok().as_ref())));
        }
        if expectation.no_content && response.status == 204 {
            return Ok(check.verdict(CheckStatus::Pass, "OK (204)").with_exchange(snapshot(None)));
        }
        if response.status < 400 {
            return self.judge_success(&check, &response, expectation, snapshot);
        }
        let (parsed, errors) = self.error_body_diagnostics(&response)?;
        let result = if errors.is_empty() {
            check.verdict(CheckStatus::Pass, "OK (error path)")
        } else {
            check
                .verdict(CheckStatus::Fail, "Error response did not match ErrorEnvelope schema")
                .with_errors(errors)
        };
        Ok(result.with_exchange(snapshot(parsed.as_ref())))
    }

    /// Judges a success-range answer against the endpoint's schema.
    fn judge_success(
        &self,
        check: &Check,
        response: &HttpResponse,
        expectation: SurfaceExpectation,
        snapshot: impl Fn(Option<&Value>) -> Option<HttpExchange>,
    ) -> Result<CheckResult, RunnerError> {
        let Some(schema) = expectation.schema else {
            return Ok(check.verdict(CheckStatus::Pass, "OK").with_exchange(snapshot(None)));
        };
        let parsed = match response.json() {
            Ok(parsed) => parsed,
            Err(err) => {
                return Ok(check
                    .verdict(CheckStatus::Fail, "Success response JSON parse failed")
                    .with_errors(vec![format!("Response was not valid JSON: {err}")])
                    .with_exchange(snapshot(None)));
            }
        };
        let errors = match parsed.as_array() {
            Some(items) if expectation.array => self.schemas().validate_items(items, schema)?,
            _ => self.schemas().validate(&parsed, schema)?,
        };
        let result = if errors.is_empty() {
            check.verdict(CheckStatus::Pass, "OK")
        } else {
            check
                .verdict(CheckStatus::Fail, "Success response did not match schema")
                .with_errors(errors)
        };
        Ok(result.with_exchange(snapshot(Some(&parsed))))
    }
}
