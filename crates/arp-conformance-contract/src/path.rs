// crates/arp-conformance-contract/src/path.rs
// ============================================================================
// Module: Instance Paths
// Description: Structural locations inside a validated JSON instance.
// Purpose: Render and order schema violations deterministically.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! Validators report locations as JSON pointers. [`InstancePath`] resolves a
//! pointer against the instance it came from so array indices and object
//! keys are distinguished, then renders it as `$`, `$.key`, `$.items[0]`.
//!
//! Ordering is segment-wise with a prefix sorting before its extensions,
//! which is what makes violation lists reproducible across runs.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde_json::Value;

// ============================================================================
// SECTION: Types
// ============================================================================

/// One step into a JSON value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) enum PathSegment {
    /// Object member name.
    Key(String),
    /// Array position.
    Index(usize),
}

/// Location of a value inside a JSON instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InstancePath {
    /// Segments from the root.
    segments: Vec<PathSegment>,
}

impl InstancePath {
    /// Resolves an RFC 6901 pointer against `instance`.
    ///
    /// Tokens addressing an array become index segments when numeric;
    /// everything else is a key. Tokens past a missing value stay keys.
    #[must_use]
    pub fn from_pointer(pointer: &str, instance: &Value) -> Self {
        let mut segments = Vec::new();
        let mut current = Some(instance);
        for raw in pointer.split('/').skip(1) {
            let token = raw.replace("~1", "/").replace("~0", "~");
            match (current, token.parse::<usize>()) {
                (Some(Value::Array(items)), Ok(index)) => {
                    current = items.get(index);
                    segments.push(PathSegment::Index(index));
                }
                (Some(Value::Object(map)), _) => {
                    current = map.get(&token);
                    segments.push(PathSegment::Key(token));
                }
                _ => {
                    current = None;
                    segments.push(PathSegment::Key(token));
                }
            }
        }
        Self {
            segments,
        }
    }
}

impl fmt::Display for InstancePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("$")?;
        for segment in &self.segments {
            match segment {
                PathSegment::Key(key) => write!(f, ".{key}")?,
                PathSegment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests;
