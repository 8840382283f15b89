// crates/arp-conformance-contract/src/lib.rs
// ============================================================================
// Module: ARP Conformance Contract
// Description: Versioned ARP contract: JSON Schemas and endpoint inventory.
// Purpose: Load a contract offline and validate JSON against it.
// Dependencies: jsonschema, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! This crate owns everything the conformance runner knows about the ARP
//! contract without talking to a service: where the contract files live
//! ([`ContractSource`]), the compiled [`SchemaRegistry`], and the
//! [`RequiredEndpoints`] inventory. A snapshot of contract `v1` is compiled
//! into the crate.
//!
//! Invariants:
//! - A [`Contract`] is immutable once loaded.
//! - Validation output ordering is deterministic for a given input.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod contract;
pub mod error;
pub mod inventory;
pub mod path;
pub mod schemas;
pub mod service;
pub mod source;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use contract::Contract;
pub use contract::DEFAULT_VERSION;
pub use contract::spec_ref;
pub use error::ContractError;
pub use inventory::Endpoint;
pub use inventory::RequiredEndpoints;
pub use path::InstancePath;
pub use schemas::ERROR_ENVELOPE_SCHEMA;
pub use schemas::SchemaRegistry;
pub use schemas::Violation;
pub use service::ServiceKind;
pub use service::UnknownServiceKind;
pub use source::ContractSource;
