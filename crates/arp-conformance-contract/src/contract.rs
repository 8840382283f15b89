// crates/arp-conformance-contract/src/contract.rs
// ============================================================================
// Module: Contract Bundle
// Description: A loaded contract version: schemas plus endpoint inventory.
// Purpose: Load a contract once and share it by reference across runs.
// Dependencies: none beyond this crate
// ============================================================================

//! ## Overview
//! [`Contract`] pairs the [`SchemaRegistry`] and [`RequiredEndpoints`] of one
//! version. It is built once and borrowed by every runner, so concurrent or
//! sequential runs never share mutable validation state.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::error::ContractError;
use crate::inventory::RequiredEndpoints;
use crate::schemas::SchemaRegistry;
use crate::source::ContractSource;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default contract version.
pub const DEFAULT_VERSION: &str = "v1";
/// Name of the standard a report's `spec_ref` points at.
pub const STANDARD_NAME: &str = "arp-standard";

// ============================================================================
// SECTION: Contract
// ============================================================================

/// A fully loaded contract version.
#[derive(Debug)]
pub struct Contract {
    /// Version label, e.g. `v1`.
    version: String,
    /// Compiled schemas.
    schemas: SchemaRegistry,
    /// Required endpoint inventory.
    endpoints: RequiredEndpoints,
}

impl Contract {
    /// Loads schemas and inventory for `version` from `source`.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError`] when either part fails to load.
    pub fn load(source: &ContractSource, version: &str) -> Result<Self, ContractError> {
        let schemas = SchemaRegistry::load(source, version)?;
        let endpoints = RequiredEndpoints::load(source, version)?;
        Ok(Self {
            version: version.to_string(),
            schemas,
            endpoints,
        })
    }

    /// Loads the bundled default contract.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError`] if the bundled snapshot fails to compile.
    pub fn embedded() -> Result<Self, ContractError> {
        Self::load(&ContractSource::Embedded, DEFAULT_VERSION)
    }

    /// Returns the version label.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Returns the schema registry.
    #[must_use]
    pub const fn schemas(&self) -> &SchemaRegistry {
        &self.schemas
    }

    /// Returns the endpoint inventory.
    #[must_use]
    pub const fn endpoints(&self) -> &RequiredEndpoints {
        &self.endpoints
    }

    /// Returns the report reference, `arp-standard@<version>`.
    #[must_use]
    pub fn spec_ref(&self) -> String {
        spec_ref(&self.version)
    }
}

/// Formats the report reference for a contract version.
#[must_use]
pub fn spec_ref(version: &str) -> String {
    format!("{STANDARD_NAME}@{version}")
}
