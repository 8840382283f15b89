// crates/arp-conformance-contract/src/service.rs
// ============================================================================
// Module: Service Kinds
// Description: Closed set of ARP service kinds covered by the contract.
// Purpose: Key endpoint inventories and runner dispatch by service.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! The contract defines exactly three services. [`ServiceKind`] is parsed at
//! the boundary (CLI, config, inventory file) so the rest of the system never
//! handles an unknown service label.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Types
// ============================================================================

/// ARP service kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceKind {
    /// Agent runtime executing runs synchronously.
    Runtime,
    /// Tool registry listing and invoking tools.
    ToolRegistry,
    /// Daemon managing runtime profiles, instances, and async runs.
    Daemon,
}

impl ServiceKind {
    /// All service kinds in canonical order.
    pub const ALL: [Self; 3] = [Self::Runtime, Self::ToolRegistry, Self::Daemon];

    /// Returns the wire label for the service.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Runtime => "runtime",
            Self::ToolRegistry => "tool-registry",
            Self::Daemon => "daemon",
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a service label is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown service kind: {0} (expected runtime, tool-registry, or daemon)")]
pub struct UnknownServiceKind(pub String);

impl FromStr for ServiceKind {
    type Err = UnknownServiceKind;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value)
            .ok_or_else(|| UnknownServiceKind(value.to_string()))
    }
}
