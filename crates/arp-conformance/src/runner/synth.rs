// crates/arp-conformance/src/runner/synth.rs
// ============================================================================
// Module: Synthetic Inputs
// Description: Synthetic identifiers, path filling, and argument synthesis.
// Purpose: Produce requests that are structurally valid but carry no meaning.
// Dependencies: rand, serde_json
// ============================================================================

//! ## Overview
//! Identifiers look like `run_conformance_1a2b3c4d5e6f` so that anything the
//! checks create is recognisable on the server side. Arguments are derived
//! from a tool's input schema, one conservative value per type.

// ============================================================================
// SECTION: Imports
// ============================================================================

use rand::RngCore;
use serde_json::Map;
use serde_json::Value;

// ============================================================================
// SECTION: Identifiers
// ============================================================================

/// Mask keeping the low 48 bits (12 hex digits).
const ID_MASK: u64 = 0xffff_ffff_ffff;

/// Returns `{prefix}_conformance_{12 hex}`, fresh on every call.
#[must_use]
pub fn synthetic_id(prefix: &str) -> String {
    let suffix = rand::thread_rng().next_u64() & ID_MASK;
    format!("{prefix}_conformance_{suffix:012x}")
}

/// Maps a path placeholder name to its identifier prefix.
fn placeholder_prefix(name: &str) -> &str {
    match name {
        "run_id" => "run",
        "tool_id" => "tool",
        "instance_id" => "inst",
        "runtime_profile" => "profile",
        other => other.strip_suffix("_id").unwrap_or(other),
    }
}

/// Replaces every `{name}` placeholder with a fresh synthetic id.
///
/// An unterminated `{` is copied through unchanged.
#[must_use]
pub fn fill_path(template: &str) -> String {
    let mut filled = String::with_capacity(template.len() + 32);
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        let Some(close) = rest[open..].find('}') else {
            break;
        };
        filled.push_str(&rest[..open]);
        let name = &rest[open + 1..open + close];
        filled.push_str(&synthetic_id(placeholder_prefix(name)));
        rest = &rest[open + close + 1..];
    }
    filled.push_str(rest);
    filled
}

// ============================================================================
// SECTION: Arguments
// ============================================================================

/// Builds a minimal value for a tool input schema.
///
/// Enumerations yield their first member; objects recurse over required
/// keys that also appear in `properties`. Anything unrecognised becomes `{}`.
#[must_use]
pub fn synthesize_arguments(schema: &Value) -> Value {
    let Some(schema) = schema.as_object() else {
        return Value::Object(Map::new());
    };
    if let Some(first) = schema.get("enum").and_then(Value::as_array).and_then(|values| values.first()) {
        return first.clone();
    }
    match schema.get("type").and_then(Value::as_str) {
        Some("string") => Value::String("conformance".to_string()),
        Some("integer" | "number") => Value::from(0),
        Some("boolean") => Value::Bool(false),
        Some("array") => Value::Array(Vec::new()),
        Some("object") => synthesize_object(schema),
        _ => Value::Object(Map::new()),
    }
}

/// Fills the required properties of an object schema.
fn synthesize_object(schema: &Map<String, Value>) -> Value {
    let properties = schema.get("properties").and_then(Value::as_object);
    let required = schema.get("required").and_then(Value::as_array);
    let mut object = Map::new();
    if let (Some(properties), Some(required)) = (properties, required) {
        for key in required.iter().filter_map(Value::as_str) {
            if let Some(property) = properties.get(key) {
                object.insert(key.to_string(), synthesize_arguments(property));
            }
        }
    }
    Value::Object(object)
}
