// crates/arp-conformance/src/runner/core_daemon.rs
// ============================================================================
// Module: Daemon Core Tier
// Description: Profile, instance, and async run lifecycle against a daemon.
// Purpose: Exercise the daemon success path and release what it created.
// Dependencies: serde_json, tracing
// ============================================================================

//! ## Overview
//! The battery may create a runtime profile and instances. Each resource is
//! recorded in a [`CleanupGuard`] the moment its creation succeeds, and the
//! guard deletes them (instances first, then the profile) when the battery
//! returns by any path, including unwinding. Delete failures are logged and
//! never change a verdict. With cleanup disabled nothing is deleted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;
use serde_json::json;
use tracing::debug;
use tracing::warn;

use super::Check;
use super::CheckLog;
use super::ConformanceRunner;
use super::ExpectStatus;
use super::Expectation;
use super::Judged;
use super::RunnerError;
use super::core_runtime::effective_run_id;
use super::core_runtime::run_request;
use super::schema_paths;
use super::synth::synthetic_id;
use crate::report::CheckStatus;
use crate::transport::HttpTransport;

// ============================================================================
// SECTION: Cleanup
// ============================================================================

/// Deletes resources created by the daemon battery when dropped.
pub(crate) struct CleanupGuard<'t> {
    /// Transport used for the delete calls.
    transport: &'t HttpTransport,
    /// Deletes are issued only when true.
    enabled: bool,
    /// Instance ids in creation order.
    instances: Vec<String>,
    /// Ephemeral runtime profile, if one was created.
    profile: Option<String>,
}

impl<'t> CleanupGuard<'t> {
    /// Creates an empty guard.
    pub(crate) const fn new(transport: &'t HttpTransport, enabled: bool) -> Self {
        Self {
            transport,
            enabled,
            instances: Vec::new(),
            profile: None,
        }
    }

    /// Records a created instance.
    pub(crate) fn track_instance(&mut self, instance_id: String) {
        self.instances.push(instance_id);
    }

    /// Records the ephemeral profile.
    pub(crate) fn track_profile(&mut self, profile: String) {
        self.profile = Some(profile);
    }

    /// Issues one best-effort delete.
    fn delete(&self, path: &str) {
        match self.transport.request("DELETE", path, None, &[]) {
            Ok(response) if response.is_success() => debug!(path, "cleanup delete succeeded"),
            Ok(response) => warn!(path, status = response.status, "cleanup delete rejected"),
            Err(err) => warn!(path, error = %err, "cleanup delete failed"),
        }
    }
}

impl Drop for CleanupGuard<'_> {
    fn drop(&mut self) {
        if !self.enabled {
            if !self.instances.is_empty() || self.profile.is_some() {
                debug!(
                    instances = self.instances.len(),
                    profile = self.profile.is_some(),
                    "cleanup disabled; leaving created resources"
                );
            }
            return;
        }
        for instance_id in &self.instances {
            self.delete(&format!("/v1/instances/{instance_id}"));
        }
        if let Some(profile) = &self.profile {
            self.delete(&format!("/v1/admin/runtime-profiles/{profile}"));
        }
    }
}

/// Instance ids listed in an `InstanceCreateResponse` body.
pub(crate) fn created_instance_ids(body: &Value) -> Vec<String> {
    body.get("instances")
        .and_then(Value::as_array)
        .map(|instances| {
            instances
                .iter()
                .filter_map(|instance| instance.get("instance_id").and_then(Value::as_str))
                .filter(|instance_id| !instance_id.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// First profile name in a `RuntimeProfileListResponse` body.
fn first_listed_profile(body: &Value) -> Option<String> {
    body.get("profiles")
        .and_then(Value::as_array)
        .and_then(|profiles| profiles.first())
        .and_then(|profile| profile.get("runtime_profile"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

// ============================================================================
// SECTION: Daemon Core Checks
// ============================================================================

impl ConformanceRunner<'_> {
    /// Profile, instance, run, poll, result; then cleanup.
    pub(super) fn check_core_daemon(&self, log: &mut CheckLog) -> Result<(), RunnerError> {
        let mut guard = CleanupGuard::new(&self.transport, self.options.cleanup);

        let check = Check::new("core.daemon.list_runtime_profiles", "GET /v1/admin/runtime-profiles");
        let expect = Expectation::success(
            schema_paths::RUNTIME_PROFILE_LIST_RESPONSE,
            "RuntimeProfileListResponse",
        );
        let listed = match self.fetch(&check, "GET", "/v1/admin/runtime-profiles", None, &expect)? {
            Judged::Verdict(result) => {
                log.push(result);
                return Ok(());
            }
            Judged::Valid { body, exchange } => {
                log.push(check.verdict(CheckStatus::Pass, "OK").with_exchange(Some(exchange)));
                body
            }
        };

        let profile = match self.options.runtime_profile.clone().or_else(|| first_listed_profile(&listed)) {
            Some(profile) => profile,
            None => match self.create_profile(log, &mut guard)? {
                Some(profile) => profile,
                None => return Ok(()),
            },
        };
        debug!(runtime_profile = %profile, "using runtime profile");

        let Some(instance_id) = self.create_instance(log, &mut guard, &profile)? else {
            return Ok(());
        };

        let requested = synthetic_id("run");
        let request = run_request(&requested, "ARP conformance daemon run", Some(&instance_id));
        let check = Check::new("core.daemon.submit_run", "POST /v1/runs");
        let expect = Expectation {
            status: ExpectStatus::Exactly(202),
            schema: schema_paths::RUN_STATUS,
            label: "RunStatus",
            array: false,
        };
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
        let terminal = self.poll_run(log, "core.daemon.poll_status", &run_id)?;
        self.fetch_run_result(log, "core.daemon.get_result", &run_id, terminal)
    }

    /// Creates an ephemeral profile; `None` means the battery must stop.
    fn create_profile(
        &self,
        log: &mut CheckLog,
        guard: &mut CleanupGuard<'_>,
    ) -> Result<Option<String>, RunnerError> {
        let profile = synthetic_id("profile");
        let check = Check::new(
            "core.daemon.create_runtime_profile",
            "PUT /v1/admin/runtime-profiles/{runtime_profile}",
        );
        let path = format!("/v1/admin/runtime-profiles/{profile}");
        let request = json!({ "description": "ARP conformance test profile" });
        let response = match self.send("PUT", &path, Some(&request)) {
            Ok(response) => response,
            Err(err) => {
                log.push(check.transport_failure("PUT", self.transport.url_for(&path), Some(&request), &err));
                return Ok(None);
            }
        };
        if response.is_success() {
            guard.track_profile(profile.clone());
        }
        let expect = Expectation::success(schema_paths::RUNTIME_PROFILE, "RuntimeProfile");
        match self.judge(&check, "PUT", Some(&request), &response, &expect)? {
            Judged::Verdict(result) => {
                log.push(result);
                Ok(None)
            }
            Judged::Valid { exchange, .. } => {
                log.push(
                    check
                        .verdict(CheckStatus::Pass, format!("Created {profile}"))
                        .with_exchange(Some(exchange)),
                );
                Ok(Some(profile))
            }
        }
    }

    /// Creates one instance; `None` means the battery must stop.
    fn create_instance(
        &self,
        log: &mut CheckLog,
        guard: &mut CleanupGuard<'_>,
        profile: &str,
    ) -> Result<Option<String>, RunnerError> {
        let check = Check::new("core.daemon.create_instance", "POST /v1/instances");
        let request = json!({ "runtime_profile": profile, "count": 1 });
        let response = match self.send("POST", "/v1/instances", Some(&request)) {
            Ok(response) => response,
            Err(err) => {
                log.push(check.transport_failure(
                    "POST",
                    self.transport.url_for("/v1/instances"),
                    Some(&request),
                    &err,
                ));
                return Ok(None);
            }
        };
        if response.is_success()
            && let Ok(body) = response.json()
        {
            for instance_id in created_instance_ids(&body) {
                guard.track_instance(instance_id);
            }
        }
        let expect =
            Expectation::success(schema_paths::INSTANCE_CREATE_RESPONSE, "InstanceCreateResponse");
        match self.judge(&check, "POST", Some(&request), &response, &expect)? {
            Judged::Verdict(result) => {
                log.push(result);
                Ok(None)
            }
            Judged::Valid { body, exchange } => {
                let Some(instance_id) = created_instance_ids(&body).into_iter().next() else {
                    log.push(
                        check
                            .verdict(
                                CheckStatus::Fail,
                                "InstanceCreateResponse.instances[0].instance_id missing",
                            )
                            .with_exchange(Some(exchange)),
                    );
                    return Ok(None);
                };
                log.push(check.verdict(CheckStatus::Pass, "OK").with_exchange(Some(exchange)));
                Ok(Some(instance_id))
            }
        }
    }
}
