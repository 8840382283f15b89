// crates/arp-conformance/src/runner/deep.rs
// ============================================================================
// Module: Deep Tier
// Description: Checks of optional endpoints (cancel, events, trace).
// Purpose: Check optional features without treating their absence as a fault.
// Dependencies: arp-conformance-contract, serde_json, tracing
// ============================================================================

//! ## Overview
//! Calls the endpoints the inventory marks `required: false` for the
//! service, in inventory order, with synthetic ids. Verdicts per response:
//! - 404 or 405: SKIP, the feature is not implemented
//! - other non-2xx: PASS when the body is a valid error envelope, else FAIL
//! - 2xx: the body must match the endpoint's success schema, when known
//!
//! The event stream is sampled with a byte bound. It must carry the exact
//! event-stream media type. The first JSON `data:` line is validated against
//! `RunEvent`; a sample with no parseable or schema-valid event is a WARN
//! carrying the diagnostics.

// ============================================================================
// SECTION: Imports
// ============================================================================

use arp_conformance_contract::Endpoint;
use arp_conformance_contract::ServiceKind;
use serde_json::Map;
use serde_json::Value;
use tracing::debug;

use super::Check;
use super::CheckLog;
use super::ConformanceRunner;
use super::RunnerError;
use super::exchange;
use super::schema_paths;
use super::surface::is_mutating;
use super::synth::fill_path;
use crate::report::CheckResult;
use crate::report::CheckStatus;
use crate::transport::EVENT_STREAM_MEDIA_TYPE;
use crate::transport::HttpResponse;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Byte bound when sampling an event stream.
pub(crate) const EVENT_SAMPLE_BYTES: usize = 2048;

/// Message for a reachable stream whose sample held no valid event.
const NO_EVENT_VALIDATED: &str = "Event stream reachable; no event validated from sample";

/// Statuses that mark an optional endpoint as absent.
const NOT_IMPLEMENTED: [u16; 2] = [404, 405];

// ============================================================================
// SECTION: Event Sampling
// ============================================================================

/// First event found in a stream sample.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SampledEvent {
    /// A JSON event payload.
    Parsed(Value),
    /// No JSON event; carries parse diagnostics.
    Missing(Vec<String>),
}

/// Extracts the first JSON event from a server-sent event sample.
///
/// Lines may carry a `data:` prefix. Non-JSON lines are ignored; lines that
/// look like JSON but fail to parse are reported.
pub(crate) fn first_event(sample: &str) -> SampledEvent {
    let mut diagnostics = Vec::new();
    for raw in sample.lines() {
        let line = raw.trim();
        let line = line.strip_prefix("data:").map_or(line, str::trim);
        if !line.starts_with('{') {
            continue;
        }
        match serde_json::from_str::<Value>(line) {
            Ok(event) => return SampledEvent::Parsed(event),
            Err(err) => diagnostics.push(format!("Event line was not valid JSON: {err}")),
        }
    }
    SampledEvent::Missing(diagnostics)
}

// ============================================================================
// SECTION: Call Kinds
// ============================================================================

/// How an optional endpoint is exercised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OptionalCall {
    /// Sampled as a server-sent event stream.
    EventStream,
    /// A JSON call; success bodies must match the schema when one is known.
    Document(Option<&'static str>),
}

/// Call kind for an optional endpoint.
pub(crate) fn optional_call(method: &str, path: &str) -> OptionalCall {
    let schema = match (method, path) {
        ("GET", "/v1/runs/{run_id}/events") => return OptionalCall::EventStream,
        ("POST", "/v1/runs/{run_id}:cancel") => Some(schema_paths::RUN_STATUS),
        ("GET", "/v1/runs/{run_id}/trace") => Some(schema_paths::TRACE_RESPONSE),
        _ => None,
    };
    OptionalCall::Document(schema)
}

/// Check id for an optional endpoint: `deep.<service>.<last path token>`.
pub(crate) fn deep_check_id(service: ServiceKind, path: &str) -> String {
    let action = path.rsplit(['/', ':']).next().unwrap_or_default();
    format!("deep.{}.{action}", service.as_str().replace('-', "_"))
}

// ============================================================================
// SECTION: Deep Checks
// ============================================================================

impl ConformanceRunner<'_> {
    /// Checks every optional endpoint the inventory lists for the service.
    pub(super) fn check_deep(&self, log: &mut CheckLog) -> Result<(), RunnerError> {
        let endpoints = self.contract.endpoints().optional_for(self.service);
        debug!(service = %self.service, count = endpoints.len(), "optional endpoints");
        for endpoint in endpoints {
            let result = self.check_optional_endpoint(endpoint)?;
            log.push(result);
        }
        Ok(())
    }

    /// Checks one optional endpoint with synthetic ids.
    fn check_optional_endpoint(&self, endpoint: &Endpoint) -> Result<CheckResult, RunnerError> {
        let method = endpoint.method.as_str();
        let check = Check::new(
            deep_check_id(self.service, &endpoint.path),
            format!("{method} {} (optional)", endpoint.path),
        );
        let path = fill_path(&endpoint.path);
        match optional_call(method, &endpoint.path) {
            OptionalCall::EventStream => match self.transport.stream_sample(
                method,
                &path,
                &[("Accept", EVENT_STREAM_MEDIA_TYPE)],
                EVENT_SAMPLE_BYTES,
            ) {
                Ok(response) => self.judge_event_stream(&check, method, &response),
                Err(err) => Ok(check.transport_failure(method, self.transport.url_for(&path), None, &err)),
            },
            OptionalCall::Document(schema) => {
                let body = is_mutating(method).then(|| Value::Object(Map::new()));
                match self.send(method, &path, body.as_ref()) {
                    Ok(response) => self.judge_optional(&check, method, body.as_ref(), &response, schema),
                    Err(err) => Ok(check.transport_failure(
                        method,
                        self.transport.url_for(&path),
                        body.as_ref(),
                        &err,
                    )),
                }
            }
        }
    }

    /// Shared verdict for the non-success side of an optional endpoint.
    ///
    /// Returns `None` for 2xx responses, which the caller judges itself.
    fn judge_optional_error(
        &self,
        check: &Check,
        method: &str,
        request_body: Option<&Value>,
        response: &HttpResponse,
    ) -> Result<Option<CheckResult>, RunnerError> {
        if NOT_IMPLEMENTED.contains(&response.status) {
            return Ok(Some(check.verdict(
                CheckStatus::Skip,
                format!("Endpoint not implemented ({})", response.status),
            )));
        }
        if response.is_success() {
            return Ok(None);
        }
        let (parsed, errors) = self.error_body_diagnostics(response)?;
        let result = if errors.is_empty() {
            check.verdict(CheckStatus::Pass, "Endpoint responded with error envelope (shape OK)")
        } else {
            check
                .verdict(CheckStatus::Fail, "Error response did not match ErrorEnvelope schema")
                .with_errors(errors)
        };
        Ok(Some(result.with_exchange(Some(exchange(
            method,
            response,
            request_body,
            parsed.as_ref(),
        )))))
    }

    /// Judges a JSON optional endpoint.
    fn judge_optional(
        &self,
        check: &Check,
        method: &str,
        request_body: Option<&Value>,
        response: &HttpResponse,
        schema: Option<&str>,
    ) -> Result<CheckResult, RunnerError> {
        if let Some(result) = self.judge_optional_error(check, method, request_body, response)? {
            return Ok(result);
        }
        let (parsed, errors) = match (response.json(), schema) {
            (Ok(parsed), Some(schema)) => {
                let errors = self.schemas().validate(&parsed, schema)?;
                (Some(parsed), errors)
            }
            (Ok(parsed), None) => (Some(parsed), Vec::new()),
            (Err(_), None) if response.text.trim().is_empty() => (None, Vec::new()),
            (Err(err), _) => (None, vec![format!("Response was not valid JSON: {err}")]),
        };
        let result = if errors.is_empty() {
            check.verdict(CheckStatus::Pass, "OK")
        } else {
            check
                .verdict(CheckStatus::Fail, "Response did not match expected schema")
                .with_errors(errors)
        };
        Ok(result.with_exchange(Some(exchange(method, response, request_body, parsed.as_ref()))))
    }

    /// Judges a sampled event stream.
    fn judge_event_stream(
        &self,
        check: &Check,
        method: &str,
        response: &HttpResponse,
    ) -> Result<CheckResult, RunnerError> {
        if let Some(result) = self.judge_optional_error(check, method, None, response)? {
            return Ok(result);
        }
        let snapshot = Some(exchange(method, response, None, None));
        let media_type = response.media_type();
        if media_type != EVENT_STREAM_MEDIA_TYPE {
            return Ok(check
                .verdict(
                    CheckStatus::Fail,
                    format!("Expected Content-Type {EVENT_STREAM_MEDIA_TYPE}, got \"{media_type}\""),
                )
                .with_exchange(snapshot));
        }
        let result = match first_event(&response.text) {
            SampledEvent::Parsed(event) => {
                let errors = self.schemas().validate(&event, schema_paths::RUN_EVENT)?;
                if errors.is_empty() {
                    check.verdict(CheckStatus::Pass, "OK")
                } else {
                    check.verdict(CheckStatus::Warn, NO_EVENT_VALIDATED).with_errors(errors)
                }
            }
            SampledEvent::Missing(diagnostics) => check
                .verdict(CheckStatus::Warn, NO_EVENT_VALIDATED)
                .with_errors(diagnostics),
        };
        Ok(result.with_exchange(snapshot))
    }
}
