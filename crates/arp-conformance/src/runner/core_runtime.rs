// crates/arp-conformance/src/runner/core_runtime.rs
// ============================================================================
// Module: Runtime Core Tier
// Description: Minimal run lifecycle against a runtime service.
// Purpose: Submit a run, poll it to completion, and fetch its result.
// Dependencies: serde_json
// ============================================================================

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;
use serde_json::json;

use super::Check;
use super::CheckLog;
use super::ConformanceRunner;
use super::Expectation;
use super::Judged;
use super::RunnerError;
use super::schema_paths;
use super::synth::synthetic_id;
use crate::report::CheckStatus;

// ============================================================================
// SECTION: Requests
// ============================================================================

/// Run timeout requested from the service, in milliseconds.
pub(crate) const RUN_TIMEOUT_MS: u64 = 10_000;

/// Builds a minimal run request.
pub(crate) fn run_request(run_id: &str, goal: &str, instance_id: Option<&str>) -> Value {
    let mut request = json!({
        "run_id": run_id,
        "input": { "goal": goal },
        "limits": { "timeout_ms": RUN_TIMEOUT_MS, "max_steps": 1 },
    });
    if let (Some(instance_id), Some(object)) = (instance_id, request.as_object_mut()) {
        object.insert("runtime_selector".to_string(), json!({ "instance_id": instance_id }));
    }
    request
}

/// Returns the server-assigned run id, falling back to the requested one.
pub(crate) fn effective_run_id(status: &Value, requested: &str) -> String {
    status
        .get("run_id")
        .and_then(Value::as_str)
        .filter(|run_id| !run_id.is_empty())
        .unwrap_or(requested)
        .to_string()
}

// ============================================================================
// SECTION: Runtime Core Checks
// ============================================================================

impl ConformanceRunner<'_> {
    /// Create, poll, and fetch the result of one run.
    pub(super) fn check_core_runtime(&self, log: &mut CheckLog) -> Result<(), RunnerError> {
        let requested = synthetic_id("run");
        let request = run_request(&requested, "ARP conformance test run", None);
        let check = Check::new("core.runtime.create_run", "POST /v1/runs (minimal success-path)");
        let expect = Expectation::success(schema_paths::RUN_STATUS, "RunStatus");
        let run_id = match self.fetch(&check, "POST", "/v1/runs", Some(&request), &expect)? {
            Judged::Verdict(result) => {
                log.push(result);
                return Ok(());
            }
            Judged::Valid { body, exchange } => {
                log.push(check.verdict(CheckStatus::Pass, "OK").with_exchange(Some(exchange)));
                effective_run_id(&body, &requested)
            }
        };
        let terminal = self.poll_run(log, "core.runtime.poll_status", &run_id)?;
        self.fetch_run_result(log, "core.runtime.get_result", &run_id, terminal)
    }
}
