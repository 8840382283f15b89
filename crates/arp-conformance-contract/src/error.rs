// crates/arp-conformance-contract/src/error.rs
// ============================================================================
// Module: Contract Errors
// Description: Error type for contract loading and schema validation.
// Purpose: Give contract failures a typed shape callers can report.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! [`ContractError`] covers every way a contract can fail to load or a schema
//! lookup can fail at validation time. The runner converts these into failed
//! checks rather than aborting a run.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;

use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while loading or querying a contract.
#[derive(Debug, Error)]
pub enum ContractError {
    /// The requested version is not present in the selected source.
    #[error("unsupported contract version: {0}")]
    UnsupportedVersion(String),
    /// A contract directory or file could not be read.
    #[error("contract io error at {path}: {message}")]
    Io {
        /// Path that failed.
        path: PathBuf,
        /// Underlying error message.
        message: String,
    },
    /// A contract file is not valid JSON or does not match its expected shape.
    #[error("invalid contract file {path}: {message}")]
    InvalidFile {
        /// Logical path of the file.
        path: String,
        /// Parse failure detail.
        message: String,
    },
    /// No schema files were found for the version.
    #[error("no schemas found for contract version {0}")]
    NoSchemas(String),
    /// The schema store could not be assembled.
    #[error("schema registry build failed: {0}")]
    Registry(String),
    /// A schema failed to compile.
    #[error("schema {path} failed to compile: {message}")]
    Compile {
        /// Logical schema path.
        path: String,
        /// Compiler message.
        message: String,
    },
    /// The requested schema path is not part of the contract.
    #[error("unknown schema: {0}")]
    UnknownSchema(String),
}
