// crates/arp-conformance-contract/src/schemas.rs
// ============================================================================
// Module: Schema Registry
// Description: Addressable store of contract JSON Schemas with validation.
// Purpose: Validate arbitrary JSON values against named contract schemas.
// Dependencies: jsonschema, serde_json
// ============================================================================

//! ## Overview
//! [`SchemaRegistry`] loads every schema of a contract version, registers each
//! under `arp://contract/<version>/<logical path>` so relative `$ref`s resolve
//! offline, and compiles one validator per schema up front.
//!
//! Invariants:
//! - The registry is immutable after [`SchemaRegistry::load`].
//! - Violations are returned sorted by instance location (prefix first),
//!   discovery order breaking ties, so repeated validation is byte-identical.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use jsonschema::Draft;
use jsonschema::Registry;
use jsonschema::Validator;
use serde_json::Value;

use crate::error::ContractError;
use crate::path::InstancePath;
use crate::source::ContractFile;
use crate::source::ContractSource;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// URI prefix under which contract schemas are registered.
pub const CONTRACT_URI_PREFIX: &str = "arp://contract";
/// Logical path of the shared error envelope schema.
pub const ERROR_ENVELOPE_SCHEMA: &str = "schemas/common/error.schema.json";

// ============================================================================
// SECTION: Violations
// ============================================================================

/// A single schema violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Location of the offending value.
    pub path: InstancePath,
    /// Validator message.
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Compiled schemas for one contract version.
pub struct SchemaRegistry {
    /// Compiled validators keyed by logical path.
    validators: BTreeMap<String, Validator>,
}

impl fmt::Debug for SchemaRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaRegistry")
            .field("schemas", &self.validators.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl SchemaRegistry {
    /// Loads and compiles every schema for `version` from `source`.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError`] when files are missing, malformed, or fail to compile.
    pub fn load(source: &ContractSource, version: &str) -> Result<Self, ContractError> {
        let files = source.schema_files(version)?;
        Self::from_files(version, files)
    }

    /// Builds a registry from already-read schema files.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError`] when a file is not a JSON object, references
    /// cannot be registered, or a schema fails to compile.
    pub fn from_files(version: &str, files: Vec<ContractFile>) -> Result<Self, ContractError> {
        let mut documents = BTreeMap::new();
        for file in files {
            let mut schema: Value =
                serde_json::from_str(&file.contents).map_err(|err| ContractError::InvalidFile {
                    path: file.path.clone(),
                    message: err.to_string(),
                })?;
            let Value::Object(map) = &mut schema else {
                return Err(ContractError::InvalidFile {
                    path: file.path,
                    message: "schema document must be a JSON object".to_string(),
                });
            };
            map.entry("$id").or_insert_with(|| Value::String(schema_uri(version, &file.path)));
            documents.insert(file.path, schema);
        }
        if documents.is_empty() {
            return Err(ContractError::NoSchemas(version.to_string()));
        }

        let resources = documents
            .iter()
            .map(|(path, schema)| {
                let id = schema
                    .get("$id")
                    .and_then(Value::as_str)
                    .map_or_else(|| schema_uri(version, path), str::to_string);
                (id, Draft::Draft202012.create_resource(schema.clone()))
            })
            .collect::<Vec<_>>();
        let registry = Registry::try_from_resources(resources.into_iter())
            .map_err(|err| ContractError::Registry(err.to_string()))?;

        let mut validators = BTreeMap::new();
        for (path, schema) in &documents {
            let validator = jsonschema::options()
                .with_draft(Draft::Draft202012)
                .with_registry(registry.clone())
                .build(schema)
                .map_err(|err| ContractError::Compile {
                    path: path.clone(),
                    message: err.to_string(),
                })?;
            validators.insert(path.clone(), validator);
        }

        Ok(Self {
            validators,
        })
    }

    /// Returns true when `schema_path` is part of the contract.
    #[must_use]
    pub fn contains(&self, schema_path: &str) -> bool {
        self.validators.contains_key(schema_path)
    }

    /// Validates `instance` and returns ordered violations.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError::UnknownSchema`] when the schema path is not registered.
    pub fn violations(
        &self,
        instance: &Value,
        schema_path: &str,
    ) -> Result<Vec<Violation>, ContractError> {
        let validator = self
            .validators
            .get(schema_path)
            .ok_or_else(|| ContractError::UnknownSchema(schema_path.to_string()))?;
        let mut violations = validator
            .iter_errors(instance)
            .map(|err| Violation {
                path: InstancePath::from_pointer(&err.instance_path.to_string(), instance),
                message: err.to_string(),
            })
            .collect::<Vec<_>>();
        violations.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(violations)
    }

    /// Validates `instance` and returns rendered `"<path>: <message>"` lines.
    ///
    /// An empty list means the instance conforms.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError::UnknownSchema`] when the schema path is not registered.
    pub fn validate(&self, instance: &Value, schema_path: &str) -> Result<Vec<String>, ContractError> {
        Ok(self.violations(instance, schema_path)?.iter().map(ToString::to_string).collect())
    }

    /// Validates each element of `items` against `schema_path`, prefixing
    /// diagnostics with the element index as `[i] `.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError::UnknownSchema`] when the schema path is not registered.
    pub fn validate_items(
        &self,
        items: &[Value],
        schema_path: &str,
    ) -> Result<Vec<String>, ContractError> {
        let mut out = Vec::new();
        for (index, item) in items.iter().enumerate() {
            out.extend(
                self.validate(item, schema_path)?
                    .into_iter()
                    .map(|line| format!("[{index}] {line}")),
            );
        }
        Ok(out)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the registration URI for a logical schema path.
#[must_use]
pub fn schema_uri(version: &str, path: &str) -> String {
    format!("{CONTRACT_URI_PREFIX}/{version}/{path}")
}

#[cfg(test)]
mod tests;
