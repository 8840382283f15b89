// crates/arp-conformance/src/runner/smoke.rs
// ============================================================================
// Module: Smoke Tier
// Description: Health and version checks.
// Purpose: Prove the service is reachable and speaks this contract version.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! Both endpoints must answer exactly 200 with a schema-valid body. A
//! non-JSON content type on an otherwise valid body is a WARN.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;

use super::Check;
use super::CheckLog;
use super::ConformanceRunner;
use super::ExpectStatus;
use super::Expectation;
use super::Judged;
use super::RunnerError;
use super::schema_paths;
use crate::report::CheckResult;
use crate::report::CheckStatus;
use crate::report::HttpExchange;
use crate::transport::JSON_MEDIA_TYPE;
use crate::transport::media_type;

// ============================================================================
// SECTION: Smoke Checks
// ============================================================================

impl ConformanceRunner<'_> {
    /// Runs `smoke.health` and the `smoke.version` pair.
    pub(super) fn check_smoke(&self, log: &mut CheckLog) -> Result<(), RunnerError> {
        self.check_health(log)?;
        self.check_version(log)
    }

    /// `GET /v1/health` must return a `Health` document.
    fn check_health(&self, log: &mut CheckLog) -> Result<(), RunnerError> {
        let check = Check::new("smoke.health", "GET /v1/health");
        let expect = exact_200(schema_paths::HEALTH, "Health");
        let result = match self.fetch(&check, "GET", "/v1/health", None, &expect)? {
            Judged::Verdict(result) => result,
            Judged::Valid { exchange, .. } => content_type_verdict(&check, exchange),
        };
        log.push(result);
        Ok(())
    }

    /// `GET /v1/version` must return a `VersionInfo` listing this version.
    fn check_version(&self, log: &mut CheckLog) -> Result<(), RunnerError> {
        let check = Check::new("smoke.version", "GET /v1/version");
        let expect = exact_200(schema_paths::VERSION_INFO, "VersionInfo");
        let (body, exchange) = match self.fetch(&check, "GET", "/v1/version", None, &expect)? {
            Judged::Verdict(result) => {
                log.push(result);
                return Ok(());
            }
            Judged::Valid { body, exchange } => (body, exchange),
        };
        log.push(content_type_verdict(&check, exchange));

        let version = self.contract.version();
        let check = Check::new(
            "smoke.version.supported_versions",
            "VersionInfo.supported_api_versions",
        );
        let supported = body
            .get("supported_api_versions")
            .and_then(Value::as_array)
            .is_some_and(|versions| versions.iter().any(|entry| entry.as_str() == Some(version)));
        log.push(if supported {
            check.verdict(CheckStatus::Pass, format!("Supports {version}"))
        } else {
            check.verdict(
                CheckStatus::Fail,
                format!("supported_api_versions does not include {version}"),
            )
        });
        Ok(())
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Smoke endpoints answer exactly 200.
const fn exact_200(schema: &'static str, label: &'static str) -> Expectation {
    Expectation {
        status: ExpectStatus::Exactly(200),
        schema,
        label,
        array: false,
    }
}

/// PASS for a JSON content type, WARN otherwise.
fn content_type_verdict(check: &Check, exchange: HttpExchange) -> CheckResult {
    let media_type = media_type(exchange.content_type.as_deref());
    let result = if media_type == JSON_MEDIA_TYPE {
        check.verdict(CheckStatus::Pass, "OK")
    } else {
        check.verdict(CheckStatus::Warn, format!("OK (unexpected Content-Type \"{media_type}\")"))
    };
    result.with_exchange(Some(exchange))
}
