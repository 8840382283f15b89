// crates/arp-conformance/src/runner/polling.rs
// ============================================================================
// Module: Run Polling
// Description: Bounded polling of run status and result retrieval.
// Purpose: Shared by the runtime and daemon core batteries.
// Dependencies: serde_json, tracing
// ============================================================================

//! ## Overview
//! Polling records exactly one verdict: PASS on the first terminal state,
//! FAIL on the first bad response, or FAIL when the deadline passes. The
//! deadline is measured from loop entry and no sleep runs past it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::thread;
use std::time::Instant;

use serde_json::Value;
use tracing::debug;

use super::Check;
use super::CheckLog;
use super::ConformanceRunner;
use super::Expectation;
use super::Judged;
use super::RunnerError;
use super::schema_paths;
use crate::report::CheckStatus;
use crate::report::HttpExchange;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Run states after which a run never changes again.
pub(crate) const TERMINAL_STATES: [&str; 3] = ["succeeded", "failed", "canceled"];

/// Returns the terminal state of a `RunStatus` body, if any.
pub(crate) fn terminal_state(status: &Value) -> Option<&str> {
    status
        .get("state")
        .and_then(Value::as_str)
        .filter(|state| TERMINAL_STATES.contains(state))
}

// ============================================================================
// SECTION: Polling
// ============================================================================

impl ConformanceRunner<'_> {
    /// Polls `GET /v1/runs/{run_id}` until a terminal state or the deadline.
    ///
    /// Returns whether a terminal state was observed.
    pub(super) fn poll_run(
        &self,
        log: &mut CheckLog,
        check_id: &str,
        run_id: &str,
    ) -> Result<bool, RunnerError> {
        let check = Check::new(check_id, "GET /v1/runs/{run_id} (poll)");
        let path = format!("/v1/runs/{run_id}");
        let expect = Expectation::success(schema_paths::RUN_STATUS, "RunStatus");
        let deadline = self.options.poll_timeout;
        let started = Instant::now();
        let mut polls = 0_u32;
        let mut last: Option<HttpExchange> = None;
        while started.elapsed() < deadline {
            polls += 1;
            match self.fetch(&check, "GET", &path, None, &expect)? {
                Judged::Verdict(result) => {
                    log.push(result);
                    return Ok(false);
                }
                Judged::Valid { body, exchange } => {
                    if let Some(state) = terminal_state(&body) {
                        log.push(
                            check
                                .verdict(CheckStatus::Pass, format!("Terminal state: {state}"))
                                .with_exchange(Some(exchange)),
                        );
                        return Ok(true);
                    }
                    let state = body.get("state").and_then(Value::as_str).unwrap_or_default();
                    debug!(run_id, polls, state, "run not terminal yet");
                    last = Some(exchange);
                }
            }
            let remaining = deadline.saturating_sub(started.elapsed());
            if remaining.is_zero() {
                break;
            }
            thread::sleep(self.options.poll_interval.min(remaining));
        }
        log.push(
            check
                .verdict(
                    CheckStatus::Fail,
                    format!(
                        "Polling timed out before terminal state ({polls} polls in {:.1}s)",
                        deadline.as_secs_f64()
                    ),
                )
                .with_exchange(last),
        );
        Ok(false)
    }

    /// Fetches `GET /v1/runs/{run_id}/result`, or records SKIP when the run
    /// never finished.
    pub(super) fn fetch_run_result(
        &self,
        log: &mut CheckLog,
        check_id: &str,
        run_id: &str,
        terminal: bool,
    ) -> Result<(), RunnerError> {
        let check = Check::new(check_id, "GET /v1/runs/{run_id}/result");
        if !terminal {
            log.push(check.verdict(CheckStatus::Skip, "Run did not reach a terminal state"));
            return Ok(());
        }
        let path = format!("/v1/runs/{run_id}/result");
        let expect = Expectation::success(schema_paths::RUN_RESULT, "RunResult");
        let result = match self.fetch(&check, "GET", &path, None, &expect)? {
            Judged::Verdict(result) => result,
            Judged::Valid { exchange, .. } => {
                check.verdict(CheckStatus::Pass, "OK").with_exchange(Some(exchange))
            }
        };
        log.push(result);
        Ok(())
    }
}
