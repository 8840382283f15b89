// crates/arp-conformance-contract/src/inventory.rs
// ============================================================================
// Module: Endpoint Inventory
// Description: Declarative list of endpoints each service must expose.
// Purpose: Drive surface-tier coverage from contract data, not code.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! The inventory file lists endpoints common to every service plus one list
//! per [`ServiceKind`]. Entries default to `required: true`; optional ones are
//! exercised by the deep tier instead of the surface tier.
//!
//! Invariants:
//! - Methods are normalized to upper case on load.
//! - Per-service order is preserved exactly as declared.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::error::ContractError;
use crate::service::ServiceKind;
use crate::source::ContractSource;
use crate::source::REQUIRED_ENDPOINTS_PATH;

// ============================================================================
// SECTION: Types
// ============================================================================

/// One HTTP operation declared by the contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    /// HTTP method, upper case.
    pub method: String,
    /// Path template; may contain `{placeholder}` segments.
    pub path: String,
    /// Whether the service must implement the endpoint.
    #[serde(default = "default_required")]
    pub required: bool,
}

/// Serde default for [`Endpoint::required`].
const fn default_required() -> bool {
    true
}

/// Required endpoints for a contract version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RequiredEndpoints {
    /// Endpoints every service exposes.
    #[serde(default)]
    pub common: Vec<Endpoint>,
    /// Service-specific endpoints.
    #[serde(default)]
    pub services: BTreeMap<ServiceKind, Vec<Endpoint>>,
}

impl RequiredEndpoints {
    /// Loads the inventory for `version` from `source`.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError`] when the file is missing or malformed.
    pub fn load(source: &ContractSource, version: &str) -> Result<Self, ContractError> {
        let text = source.read_file(version, REQUIRED_ENDPOINTS_PATH)?;
        Self::from_json(&text)
    }

    /// Parses an inventory document.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError::InvalidFile`] when the document does not parse.
    pub fn from_json(text: &str) -> Result<Self, ContractError> {
        let mut inventory: Self =
            serde_json::from_str(text).map_err(|err| ContractError::InvalidFile {
                path: REQUIRED_ENDPOINTS_PATH.to_string(),
                message: err.to_string(),
            })?;
        let endpoints =
            inventory.common.iter_mut().chain(inventory.services.values_mut().flatten());
        for endpoint in endpoints {
            endpoint.method.make_ascii_uppercase();
        }
        Ok(inventory)
    }

    /// Returns the required endpoints for `service`: common first, then the
    /// service's own list.
    #[must_use]
    pub fn required_for(&self, service: ServiceKind) -> Vec<&Endpoint> {
        self.common
            .iter()
            .chain(self.service_endpoints(service))
            .filter(|endpoint| endpoint.required)
            .collect()
    }

    /// Returns endpoints `service` may omit.
    #[must_use]
    pub fn optional_for(&self, service: ServiceKind) -> Vec<&Endpoint> {
        self.service_endpoints(service).iter().filter(|endpoint| !endpoint.required).collect()
    }

    /// Returns the service-specific list, or an empty slice.
    fn service_endpoints(&self, service: ServiceKind) -> &[Endpoint] {
        self.services.get(&service).map(Vec::as_slice).unwrap_or_default()
    }
}
