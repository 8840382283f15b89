// crates/arp-conformance/src/runner/schema_paths.rs
// ============================================================================
// Module: Runner Schema Paths
// Description: Contract-relative schema paths used by the check batteries.
// Purpose: Keep every schema reference in one place.
// Dependencies: arp-conformance-contract
// ============================================================================

//! ## Overview
//! Paths are relative to the contract version root.

use arp_conformance_contract::ERROR_ENVELOPE_SCHEMA;

/// `Health` document.
pub(crate) const HEALTH: &str = "schemas/common/health.schema.json";
/// `VersionInfo` document.
pub(crate) const VERSION_INFO: &str = "schemas/common/version_info.schema.json";
/// `RunStatus` document.
pub(crate) const RUN_STATUS: &str = "schemas/runtime/runs/run_status.schema.json";
/// `RunResult` document.
pub(crate) const RUN_RESULT: &str = "schemas/runtime/runs/run_result.schema.json";
/// `RunEvent` document.
pub(crate) const RUN_EVENT: &str = "schemas/runtime/runs/run_event.schema.json";
/// `ToolDefinition` document.
pub(crate) const TOOL_DEFINITION: &str = "schemas/tool_registry/tools/tool_definition.schema.json";
/// `ToolInvocationResult` document.
pub(crate) const TOOL_INVOCATION_RESULT: &str =
    "schemas/tool_registry/tools/tool_invocation_result.schema.json";
/// `InstanceListResponse` document.
pub(crate) const INSTANCE_LIST_RESPONSE: &str =
    "schemas/daemon/instances/instance_list_response.schema.json";
/// `InstanceCreateResponse` document.
pub(crate) const INSTANCE_CREATE_RESPONSE: &str =
    "schemas/daemon/instances/instance_create_response.schema.json";
/// `InstanceRegisterResponse` document.
pub(crate) const INSTANCE_REGISTER_RESPONSE: &str =
    "schemas/daemon/instances/instance_register_response.schema.json";
/// `RuntimeProfile` document.
pub(crate) const RUNTIME_PROFILE: &str = "schemas/daemon/runtime_profiles/runtime_profile.schema.json";
/// `RuntimeProfileListResponse` document.
pub(crate) const RUNTIME_PROFILE_LIST_RESPONSE: &str =
    "schemas/daemon/runtime_profiles/runtime_profile_list_response.schema.json";
/// `RunListResponse` document.
pub(crate) const RUN_LIST_RESPONSE: &str = "schemas/daemon/runs/run_list_response.schema.json";
/// `TraceResponse` document.
pub(crate) const TRACE_RESPONSE: &str = "schemas/daemon/runs/trace_response.schema.json";

/// Every schema the batteries reference, checked before a run sends anything.
pub(crate) const ALL: [&str; 15] = [
    HEALTH,
    VERSION_INFO,
    RUN_STATUS,
    RUN_RESULT,
    RUN_EVENT,
    TOOL_DEFINITION,
    TOOL_INVOCATION_RESULT,
    INSTANCE_LIST_RESPONSE,
    INSTANCE_CREATE_RESPONSE,
    INSTANCE_REGISTER_RESPONSE,
    RUNTIME_PROFILE,
    RUNTIME_PROFILE_LIST_RESPONSE,
    RUN_LIST_RESPONSE,
    TRACE_RESPONSE,
    ERROR_ENVELOPE_SCHEMA,
];
