// crates/arp-conformance/tests/common/mod.rs
// ============================================================================
// Module: Stub ARP Service
// Description: In-process ARP service double backed by tiny_http.
// Purpose: Give runner integration tests a controllable live endpoint.
// Dependencies: arp-conformance, serde_json, tiny_http
// ============================================================================

//! ## Overview
//! [`StubService`] serves one router covering runtime, tool registry, and
//! daemon endpoints. The default [`StubConfig`] is fully conformant; tests
//! flip individual knobs to provoke one specific deviation. Every request is
//! recorded for call-count assertions.

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
#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::thread;
use std::thread::JoinHandle;
use std::time::Duration;

use arp_conformance::RunnerOptions;
use serde_json::Value;
use serde_json::json;
use tiny_http::Header;
use tiny_http::Response;
use tiny_http::Server;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Knobs controlling how the stub deviates from the contract.
#[derive(Debug, Clone)]
pub struct StubConfig {
    /// Versions listed by `GET /v1/version`.
    pub supported_versions: Vec<&'static str>,
    /// Content type of `GET /v1/health`.
    pub health_content_type: &'static str,
    /// Status of `GET /v1/health`.
    pub health_status: u16,
    /// Status answered to a valid `POST /v1/runs`.
    pub run_create_status: u16,
    /// States served for successive polls of one run; the last repeats.
    pub run_states: Vec<&'static str>,
    /// Tools listed by the registry.
    pub tools: Vec<Value>,
    /// `ok` flag of invocation results.
    pub invocation_ok: bool,
    /// Profiles listed by the daemon.
    pub profiles: Vec<Value>,
    /// Content type and body of the events stream; `None` answers 404.
    pub events: Option<(&'static str, String)>,
    /// Accept empty bodies on mutating endpoints (with this status).
    pub accept_invalid_bodies: Option<u16>,
    /// Body answered with 200 to a profile PUT; `None` echoes the profile.
    pub profile_put_body: Option<Value>,
}

impl Default for StubConfig {
    fn default() -> Self {
        Self {
            supported_versions: vec!["v1"],
            health_content_type: "application/json",
            health_status: 200,
            run_create_status: 202,
            run_states: vec!["succeeded"],
            tools: vec![echo_tool()],
            invocation_ok: true,
            profiles: vec![json!({ "runtime_profile": "default" })],
            events: None,
            accept_invalid_bodies: None,
            profile_put_body: None,
        }
    }
}

/// A conformant tool with one required string argument.
pub fn echo_tool() -> Value {
    json!({
        "tool_id": "tool_echo",
        "name": "echo",
        "source": "local",
        "input_schema": {
            "type": "object",
            "properties": { "text": { "type": "string" } },
            "required": ["text"]
        }
    })
}

/// Options suitable for a fast, mutation-enabled run.
pub fn fast_options() -> RunnerOptions {
    RunnerOptions {
        timeout: Duration::from_secs(5),
        poll_timeout: Duration::from_secs(2),
        poll_interval: Duration::from_millis(20),
        allow_mutations: true,
        ..RunnerOptions::default()
    }
}

// ============================================================================
// SECTION: Recorded Requests
// ============================================================================

/// One request seen by the stub.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// Request method.
    pub method: String,
    /// Request path without query.
    pub path: String,
    /// Parsed JSON body, if any.
    pub body: Option<Value>,
    /// Request headers (lowercased names).
    pub headers: BTreeMap<String, String>,
}

/// Mutable router state.
#[derive(Debug, Default)]
struct StubState {
    /// Poll counts per created run.
    runs: BTreeMap<String, usize>,
    /// Instances created so far.
    instances_created: usize,
}

// ============================================================================
// SECTION: Stub Service
// ============================================================================

/// A running stub service; stops when dropped.
pub struct StubService {
    server: Arc<Server>,
    base_url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    handle: Option<JoinHandle<()>>,
}

impl StubService {
    /// Starts a stub on an ephemeral port.
    pub fn start(config: StubConfig) -> Self {
        let server = Arc::new(Server::http("127.0.0.1:0").unwrap());
        let addr = server.server_addr().to_ip().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let handle = {
            let server = Arc::clone(&server);
            let requests = Arc::clone(&requests);
            thread::spawn(move || {
                let mut state = StubState::default();
                for mut request in server.incoming_requests() {
                    let mut raw = String::new();
                    let _ = request.as_reader().read_to_string(&mut raw);
                    let recorded = RecordedRequest {
                        method: request.method().as_str().to_ascii_uppercase(),
                        path: request.url().split('?').next().unwrap_or_default().to_string(),
                        body: serde_json::from_str(&raw).ok(),
                        headers: request
                            .headers()
                            .iter()
                            .map(|header| {
                                (
                                    header.field.as_str().as_str().to_ascii_lowercase(),
                                    header.value.as_str().to_string(),
                                )
                            })
                            .collect(),
                    };
                    let reply = route(&config, &mut state, &recorded);
                    requests.lock().unwrap().push(recorded);
                    let mut response =
                        Response::from_string(reply.body).with_status_code(reply.status);
                    if let Some(content_type) = reply.content_type {
                        response = response.with_header(
                            Header::from_bytes(&b"Content-Type"[..], content_type.as_bytes())
                                .unwrap(),
                        );
                    }
                    let _ = request.respond(response);
                }
            })
        };
        Self {
            server,
            base_url: format!("http://{addr}"),
            requests,
            handle: Some(handle),
        }
    }

    /// Base URL of the stub.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Snapshot of every request seen so far.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Run id submitted by the first valid `POST /v1/runs`.
    pub fn submitted_run_id(&self) -> Option<String> {
        self.requests().into_iter().find_map(|request| {
            (request.method == "POST" && request.path == "/v1/runs")
                .then(|| request.body?.get("run_id")?.as_str().map(str::to_string))
                .flatten()
        })
    }

    /// Counts requests with `method` whose path starts with `prefix`.
    pub fn count(&self, method: &str, prefix: &str) -> usize {
        self.requests()
            .iter()
            .filter(|request| request.method == method && request.path.starts_with(prefix))
            .count()
    }
}

impl Drop for StubService {
    fn drop(&mut self) {
        self.server.unblock();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

// ============================================================================
// SECTION: Router
// ============================================================================

/// A response produced by the router.
struct Reply {
    status: u16,
    content_type: Option<String>,
    body: String,
}

impl Reply {
    fn json(status: u16, body: &Value) -> Self {
        Self {
            status,
            content_type: Some("application/json".to_string()),
            body: body.to_string(),
        }
    }

    fn raw(status: u16, content_type: &str, body: String) -> Self {
        Self {
            status,
            content_type: Some(content_type.to_string()),
            body,
        }
    }

    fn no_content() -> Self {
        Self {
            status: 204,
            content_type: None,
            body: String::new(),
        }
    }

    fn error(status: u16, code: &str) -> Self {
        Self::json(status, &json!({ "error": { "code": code, "message": format!("stub {code}") } }))
    }
}

/// True when the body is missing or an empty object.
fn is_invalid(body: Option<&Value>) -> bool {
    body.and_then(Value::as_object).is_none_or(serde_json::Map::is_empty)
}

fn route(config: &StubConfig, state: &mut StubState, request: &RecordedRequest) -> Reply {
    let segments: Vec<&str> = request.path.trim_start_matches('/').split('/').collect();
    let body = request.body.as_ref();
    let mutating = matches!(request.method.as_str(), "POST" | "PUT");
    if mutating && is_invalid(body) {
        if let Some(status) = config.accept_invalid_bodies {
            return Reply::json(status, &json!({ "run_id": "run_accepted", "state": "queued" }));
        }
        if !segments.last().is_some_and(|last| last.ends_with(":cancel")) {
            return Reply::error(400, "invalid_request");
        }
    }
    match (request.method.as_str(), segments.as_slice()) {
        ("GET", ["v1", "health"]) => Reply::raw(
            config.health_status,
            config.health_content_type,
            json!({ "status": "ok", "time": "2026-01-01T00:00:00Z" }).to_string(),
        ),
        ("GET", ["v1", "version"]) => Reply::json(
            200,
            &json!({
                "service_name": "stub",
                "service_version": "0.0.1",
                "supported_api_versions": config.supported_versions,
            }),
        ),
        ("GET", ["v1", "tools"]) => Reply::json(200, &Value::Array(config.tools.clone())),
        ("GET", ["v1", "tools", tool_id]) => config
            .tools
            .iter()
            .find(|tool| tool["tool_id"] == *tool_id)
            .map_or_else(|| Reply::error(404, "not_found"), |tool| Reply::json(200, tool)),
        ("POST", ["v1", "tool-invocations"]) => Reply::json(
            200,
            &json!({
                "invocation_id": body.and_then(|b| b.get("invocation_id")).cloned().unwrap_or(json!("inv")),
                "ok": config.invocation_ok,
                "result": {}
            }),
        ),
        ("POST", ["v1", "runs"]) => {
            let run_id = body
                .and_then(|b| b.get("run_id"))
                .and_then(Value::as_str)
                .unwrap_or("run_stub")
                .to_string();
            state.runs.insert(run_id.clone(), 0);
            Reply::json(config.run_create_status, &json!({ "run_id": run_id, "state": "queued" }))
        }
        ("GET", ["v1", "runs"]) => Reply::json(200, &json!({ "runs": [] })),
        ("GET", ["v1", "runs", run_id]) => match state.runs.get_mut(*run_id) {
            Some(polls) => {
                let index = (*polls).min(config.run_states.len().saturating_sub(1));
                *polls += 1;
                Reply::json(200, &json!({ "run_id": run_id, "state": config.run_states[index] }))
            }
            None => Reply::error(404, "run_not_found"),
        },
        ("GET", ["v1", "runs", run_id, "result"]) if state.runs.contains_key(*run_id) => {
            Reply::json(200, &json!({ "run_id": run_id, "ok": true, "output": {} }))
        }
        ("GET", ["v1", "runs", _, "events"]) => match &config.events {
            Some((content_type, text)) => Reply::raw(200, content_type, text.clone()),
            None => Reply::error(404, "not_found"),
        },
        ("GET", ["v1", "instances"]) => Reply::json(200, &json!({ "instances": [] })),
        ("POST", ["v1", "instances"]) => {
            state.instances_created += 1;
            Reply::json(
                200,
                &json!({ "instances": [{
                    "instance_id": format!("inst_{}", state.instances_created),
                    "state": "ready",
                    "runtime_type": "stub"
                }] }),
            )
        }
        ("DELETE", ["v1", "instances", _] | ["v1", "admin", "runtime-profiles", _]) => {
            Reply::no_content()
        }
        ("GET", ["v1", "admin", "runtime-profiles"]) => {
            Reply::json(200, &json!({ "profiles": config.profiles }))
        }
        ("PUT", ["v1", "admin", "runtime-profiles", name]) => match &config.profile_put_body {
            Some(reply) => Reply::json(200, reply),
            None => Reply::json(
                200,
                &json!({
                    "runtime_profile": name,
                    "description": body.and_then(|b| b.get("description")).cloned().unwrap_or(json!("")),
                }),
            ),
        },
        _ => Reply::error(404, "not_found"),
    }
}
