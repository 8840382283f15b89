// crates/arp-conformance/src/report.rs
// ============================================================================
// Module: Conformance Report
// Description: Check results, HTTP exchange snapshots, and report rendering.
// Purpose: Record run outcomes and derive aggregate verdicts.
// Dependencies: arp-conformance-contract, serde, serde_json
// ============================================================================

//! ## Overview
//! A [`ConformanceReport`] is the only output of a run. Its result list is
//! assembled append-only by the runner and frozen when the report is built.
//! Aggregates (`ok`, `ok_strict`, counts) are derived, never stored.
//!
//! Rendering to JSON, plain text, and `JUnit` XML is a pure function of the
//! report.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::fmt::Write as _;

use arp_conformance_contract::ServiceKind;
use serde::Serialize;
use serde_json::Value;

use crate::options::Tier;

// ============================================================================
// SECTION: Check Results
// ============================================================================

/// Outcome of one check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CheckStatus {
    /// The service honoured the contract.
    Pass,
    /// The service violated the contract, or the check could not run.
    Fail,
    /// Contract honoured with a caveat.
    Warn,
    /// Not applicable to this service.
    Skip,
}

impl CheckStatus {
    /// Returns the upper-case label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Fail => "FAIL",
            Self::Warn => "WARN",
            Self::Skip => "SKIP",
        }
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of one HTTP request/response pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HttpExchange {
    /// Request method.
    pub method: String,
    /// Request URL (or path template when no request was made).
    pub url: String,
    /// JSON request body, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_body: Option<Value>,
    /// Response status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    /// Response content type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// Parsed response body, if JSON.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_body: Option<Value>,
}

/// Result of one atomic check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckResult {
    /// Stable identifier, unique within a report.
    pub check_id: String,
    /// Human-readable name, usually `METHOD /path`.
    pub name: String,
    /// Outcome.
    pub status: CheckStatus,
    /// Short explanation.
    pub message: String,
    /// Elapsed time of the check.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    /// Diagnostics, e.g. schema violations.
    pub errors: Vec<String>,
    /// HTTP snapshot for troubleshooting.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exchange: Option<HttpExchange>,
}

impl CheckResult {
    /// Creates a result with no diagnostics or exchange.
    #[must_use]
    pub fn new(
        check_id: impl Into<String>,
        name: impl Into<String>,
        status: CheckStatus,
        message: impl Into<String>,
    ) -> Self {
        Self {
            check_id: check_id.into(),
            name: name.into(),
            status,
            message: message.into(),
            duration_ms: None,
            errors: Vec::new(),
            exchange: None,
        }
    }

    /// Attaches diagnostics.
    #[must_use]
    pub fn with_errors(mut self, errors: Vec<String>) -> Self {
        self.errors = errors;
        self
    }

    /// Attaches an exchange snapshot.
    #[must_use]
    pub fn with_exchange(mut self, exchange: Option<HttpExchange>) -> Self {
        self.exchange = exchange;
        self
    }

    /// Records the elapsed time.
    #[must_use]
    pub fn with_duration_ms(mut self, duration_ms: Option<u64>) -> Self {
        self.duration_ms = duration_ms;
        self
    }
}

// ============================================================================
// SECTION: Report
// ============================================================================

/// Tally of results by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    /// PASS results.
    #[serde(rename = "PASS")]
    pub pass: usize,
    /// FAIL results.
    #[serde(rename = "FAIL")]
    pub fail: usize,
    /// WARN results.
    #[serde(rename = "WARN")]
    pub warn: usize,
    /// SKIP results.
    #[serde(rename = "SKIP")]
    pub skip: usize,
}

impl StatusCounts {
    /// Returns the count for `status`.
    #[must_use]
    pub const fn get(&self, status: CheckStatus) -> usize {
        match status {
            CheckStatus::Pass => self.pass,
            CheckStatus::Fail => self.fail,
            CheckStatus::Warn => self.warn,
            CheckStatus::Skip => self.skip,
        }
    }

    /// Returns the number of results counted.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.pass + self.fail + self.warn + self.skip
    }
}

impl fmt::Display for StatusCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PASS={} FAIL={} WARN={} SKIP={}", self.pass, self.fail, self.warn, self.skip)
    }
}

/// Outcome of one conformance run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConformanceReport {
    /// Service kind under test.
    pub service: ServiceKind,
    /// Requested tier.
    pub tier: Tier,
    /// Contract reference, `arp-standard@<version>`.
    pub spec_ref: String,
    /// Run start, milliseconds since the Unix epoch.
    pub started_at_epoch_ms: u64,
    /// Run end, milliseconds since the Unix epoch.
    pub finished_at_epoch_ms: u64,
    /// Results in execution order.
    results: Vec<CheckResult>,
}

/// Serialized form with derived aggregates.
#[derive(Serialize)]
struct ReportDocument<'a> {
    /// Report fields.
    #[serde(flatten)]
    report: &'a ConformanceReport,
    /// Lenient verdict.
    ok: bool,
    /// Strict verdict.
    ok_strict: bool,
    /// Per-status tally.
    counts: StatusCounts,
}

/// Serialized form of several reports.
#[derive(Serialize)]
struct ReportsDocument<'a> {
    /// Reports in run order.
    reports: Vec<ReportDocument<'a>>,
    /// True when every report is ok.
    ok: bool,
    /// True when every report is strictly ok.
    ok_strict: bool,
}

impl ConformanceReport {
    /// Freezes a result list into a report.
    #[must_use]
    pub const fn new(
        service: ServiceKind,
        tier: Tier,
        spec_ref: String,
        started_at_epoch_ms: u64,
        finished_at_epoch_ms: u64,
        results: Vec<CheckResult>,
    ) -> Self {
        Self {
            service,
            tier,
            spec_ref,
            started_at_epoch_ms,
            finished_at_epoch_ms,
            results,
        }
    }

    /// Returns results in execution order.
    #[must_use]
    pub fn results(&self) -> &[CheckResult] {
        &self.results
    }

    /// Returns the result with `check_id`, if present.
    #[must_use]
    pub fn result(&self, check_id: &str) -> Option<&CheckResult> {
        self.results.iter().find(|result| result.check_id == check_id)
    }

    /// Returns true when no check failed.
    #[must_use]
    pub fn ok(&self) -> bool {
        self.counts().get(CheckStatus::Fail) == 0
    }

    /// Returns true when every check passed.
    #[must_use]
    pub fn ok_strict(&self) -> bool {
        let counts = self.counts();
        counts.get(CheckStatus::Pass) == counts.total()
    }

    /// Returns `ok_strict()` when `strict`, else `ok()`.
    #[must_use]
    pub fn exit_ok(&self, strict: bool) -> bool {
        if strict { self.ok_strict() } else { self.ok() }
    }

    /// Tallies results by status.
    #[must_use]
    pub fn counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for result in &self.results {
            match result.status {
                CheckStatus::Pass => counts.pass += 1,
                CheckStatus::Fail => counts.fail += 1,
                CheckStatus::Warn => counts.warn += 1,
                CheckStatus::Skip => counts.skip += 1,
            }
        }
        counts
    }

    /// Renders pretty JSON including derived aggregates.
    ///
    /// # Errors
    ///
    /// Returns [`serde_json::Error`] if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.document())
    }

    /// Renders the plain-text summary.
    #[must_use]
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "service={} tier={} spec={}", self.service, self.tier, self.spec_ref);
        let _ = writeln!(out, "counts {} ok={} ok_strict={}", self.counts(), self.ok(), self.ok_strict());
        for result in &self.results {
            let _ = writeln!(out, "- {} {}: {}", result.status, result.check_id, result.message);
            if matches!(result.status, CheckStatus::Fail | CheckStatus::Warn) {
                for error in &result.errors {
                    let _ = writeln!(out, "    - {error}");
                }
            }
        }
        out
    }

    /// Renders a single-suite `JUnit` XML document.
    #[must_use]
    pub fn to_junit_xml(&self) -> String {
        reports_to_junit_xml(std::slice::from_ref(self))
    }

    /// Builds the serializable document.
    fn document(&self) -> ReportDocument<'_> {
        ReportDocument {
            report: self,
            ok: self.ok(),
            ok_strict: self.ok_strict(),
            counts: self.counts(),
        }
    }

    /// Appends this report as one `<testsuite>`.
    fn write_junit_suite(&self, out: &mut String) {
        let counts = self.counts();
        let elapsed = self.finished_at_epoch_ms.saturating_sub(self.started_at_epoch_ms);
        let _ = writeln!(
            out,
            r#"  <testsuite name="arp-conformance.{}" tests="{}" failures="{}" skipped="{}" errors="0" time="{}">"#,
            self.service,
            counts.total(),
            counts.fail,
            counts.skip,
            seconds(elapsed),
        );
        let _ = writeln!(out, "    <properties>");
        for (name, value) in
            [("tier", self.tier.as_str()), ("spec_ref", self.spec_ref.as_str())]
        {
            let _ = writeln!(
                out,
                r#"      <property name="{name}" value="{}"/>"#,
                xml_escape(value)
            );
        }
        let _ = writeln!(out, "    </properties>");
        for result in &self.results {
            let _ = write!(
                out,
                r#"    <testcase classname="{}" name="{}" time="{}""#,
                xml_escape(&format!("arp-conformance.{}", self.service)),
                xml_escape(&result.check_id),
                seconds(result.duration_ms.unwrap_or(0)),
            );
            let detail = xml_escape(&detail_text(result));
            let message = xml_escape(&result.message);
            match result.status {
                CheckStatus::Pass => {
                    let _ = writeln!(out, "/>");
                }
                CheckStatus::Fail => {
                    let _ = writeln!(out, ">");
                    let _ = writeln!(out, r#"      <failure message="{message}">{detail}</failure>"#);
                    let _ = writeln!(out, "    </testcase>");
                }
                CheckStatus::Skip => {
                    let _ = writeln!(out, ">");
                    let _ = writeln!(out, r#"      <skipped message="{message}"/>"#);
                    let _ = writeln!(out, "    </testcase>");
                }
                CheckStatus::Warn => {
                    let _ = writeln!(out, ">");
                    let _ = writeln!(out, "      <system-out>WARN: {detail}</system-out>");
                    let _ = writeln!(out, "    </testcase>");
                }
            }
        }
        let _ = writeln!(out, "  </testsuite>");
    }
}

// ============================================================================
// SECTION: Multi-Report Rendering
// ============================================================================

/// Renders several reports as one JSON document with overall verdicts.
///
/// # Errors
///
/// Returns [`serde_json::Error`] if serialization fails.
pub fn reports_to_json(reports: &[ConformanceReport]) -> Result<String, serde_json::Error> {
    let document = ReportsDocument {
        reports: reports.iter().map(ConformanceReport::document).collect(),
        ok: reports.iter().all(ConformanceReport::ok),
        ok_strict: reports.iter().all(ConformanceReport::ok_strict),
    };
    serde_json::to_string_pretty(&document)
}

/// Renders several text summaries separated by blank lines.
#[must_use]
pub fn reports_to_text(reports: &[ConformanceReport]) -> String {
    reports.iter().map(ConformanceReport::to_text).collect::<Vec<_>>().join("\n")
}

/// Renders several reports as one `<testsuites>` document.
#[must_use]
pub fn reports_to_junit_xml(reports: &[ConformanceReport]) -> String {
    let (tests, failures, skipped) = reports.iter().map(ConformanceReport::counts).fold(
        (0, 0, 0),
        |(tests, failures, skipped), counts| {
            (tests + counts.total(), failures + counts.fail, skipped + counts.skip)
        },
    );
    let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    let _ = writeln!(
        out,
        r#"<testsuites name="arp-conformance" tests="{tests}" failures="{failures}" skipped="{skipped}" errors="0">"#
    );
    for report in reports {
        report.write_junit_suite(&mut out);
    }
    out.push_str("</testsuites>\n");
    out
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Joins message and diagnostics for XML bodies.
fn detail_text(result: &CheckResult) -> String {
    let mut text = result.message.clone();
    for error in &result.errors {
        text.push('\n');
        text.push_str(error);
    }
    text
}

/// Formats milliseconds as decimal seconds.
fn seconds(millis: u64) -> String {
    format!("{}.{:03}", millis / 1000, millis % 1000)
}

/// Escapes XML special characters for attributes and text.
fn xml_escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            ch if ch.is_control() && !matches!(ch, '\n' | '\t' | '\r') => {}
            ch => out.push(ch),
        }
    }
    out
}
