// crates/arp-conformance-contract/src/source.rs
// ============================================================================
// Module: Contract Sources
// Description: Locates contract files in the bundled snapshot or on disk.
// Purpose: Give the schema registry and inventory one file-access seam.
// Dependencies: std
// ============================================================================

//! ## Overview
//! A contract version is a directory tree holding `schemas/**/*.schema.json`
//! and `conformance/required_endpoints.json`. [`ContractSource::Embedded`]
//! serves the snapshot compiled into this crate; [`ContractSource::Directory`]
//! reads `<root>/<version>/...` from disk.
//!
//! Logical paths are always forward-slash paths relative to the version root.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use crate::error::ContractError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Directory, relative to a version root, holding schema files.
pub const SCHEMA_DIR: &str = "schemas";
/// File suffix identifying schema documents.
pub const SCHEMA_SUFFIX: &str = ".schema.json";
/// Logical path of the required endpoint inventory.
pub const REQUIRED_ENDPOINTS_PATH: &str = "conformance/required_endpoints.json";
/// Contract versions bundled with this crate.
pub const EMBEDDED_VERSIONS: &[&str] = &["v1"];

/// Builds the embedded v1 file table from paths relative to `contract/v1/`.
macro_rules! embedded_v1 {
    ($($path:literal),* $(,)?) => {
        &[$(($path, include_str!(concat!("../contract/v1/", $path)))),*]
    };
}

/// Files in the bundled `v1` snapshot, as `(logical path, contents)`.
static EMBEDDED_V1: &[(&str, &str)] = embedded_v1![
    "conformance/required_endpoints.json",
    "schemas/common/error.schema.json",
    "schemas/common/extensions.schema.json",
    "schemas/common/health.schema.json",
    "schemas/common/metadata.schema.json",
    "schemas/common/resource_ref.schema.json",
    "schemas/common/version_info.schema.json",
    "schemas/daemon/instances/instance_create_response.schema.json",
    "schemas/daemon/instances/instance_list_response.schema.json",
    "schemas/daemon/instances/instance_register_response.schema.json",
    "schemas/daemon/instances/runtime_instance.schema.json",
    "schemas/daemon/runs/run_list_response.schema.json",
    "schemas/daemon/runs/trace_response.schema.json",
    "schemas/daemon/runtime_profiles/runtime_profile.schema.json",
    "schemas/daemon/runtime_profiles/runtime_profile_list_response.schema.json",
    "schemas/runtime/runs/run_event.schema.json",
    "schemas/runtime/runs/run_result.schema.json",
    "schemas/runtime/runs/run_status.schema.json",
    "schemas/tool_registry/tools/tool_definition.schema.json",
    "schemas/tool_registry/tools/tool_invocation_result.schema.json",
];

// ============================================================================
// SECTION: Types
// ============================================================================

/// One file read from a contract source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractFile {
    /// Forward-slash path relative to the version root.
    pub path: String,
    /// UTF-8 file contents.
    pub contents: String,
}

/// Where contract files are loaded from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ContractSource {
    /// The snapshot compiled into this crate.
    #[default]
    Embedded,
    /// A contract root on disk containing one directory per version.
    Directory(PathBuf),
}

impl ContractSource {
    /// Selects a directory source when a path is given, otherwise the embedded snapshot.
    #[must_use]
    pub fn from_path(path: Option<PathBuf>) -> Self {
        path.map_or(Self::Embedded, Self::Directory)
    }

    /// Returns every schema file for `version`, sorted by logical path.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError`] when the version is unknown or files cannot be read.
    pub fn schema_files(&self, version: &str) -> Result<Vec<ContractFile>, ContractError> {
        check_version(version)?;
        let mut files = match self {
            Self::Embedded => embedded_table(version)?
                .iter()
                .filter(|(path, _)| is_schema_path(path))
                .map(|(path, contents)| ContractFile {
                    path: (*path).to_string(),
                    contents: (*contents).to_string(),
                })
                .collect::<Vec<_>>(),
            Self::Directory(root) => {
                let version_root = version_dir(root, version)?;
                let schema_root = version_root.join(SCHEMA_DIR);
                let mut paths = Vec::new();
                collect_schema_paths(&schema_root, SCHEMA_DIR, &mut paths)?;
                paths
                    .into_iter()
                    .map(|path| {
                        let contents = read_to_string(&version_root.join(&path))?;
                        Ok(ContractFile {
                            path,
                            contents,
                        })
                    })
                    .collect::<Result<Vec<_>, ContractError>>()?
            }
        };
        if files.is_empty() {
            return Err(ContractError::NoSchemas(version.to_string()));
        }
        files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(files)
    }

    /// Reads a single contract file by logical path.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError`] when the version or file is missing.
    pub fn read_file(&self, version: &str, path: &str) -> Result<String, ContractError> {
        check_version(version)?;
        match self {
            Self::Embedded => embedded_table(version)?
                .iter()
                .find(|(candidate, _)| *candidate == path)
                .map(|(_, contents)| (*contents).to_string())
                .ok_or_else(|| ContractError::Io {
                    path: PathBuf::from(path),
                    message: format!("not present in embedded contract {version}"),
                }),
            Self::Directory(root) => {
                let version_root = version_dir(root, version)?;
                read_to_string(&version_root.join(path))
            }
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Rejects version labels that are not a single plain path component.
fn check_version(version: &str) -> Result<(), ContractError> {
    let plain = !version.is_empty()
        && version != "."
        && version != ".."
        && !version.contains(['/', '\\']);
    if plain { Ok(()) } else { Err(ContractError::UnsupportedVersion(version.to_string())) }
}

/// Returns the embedded file table for a version.
fn embedded_table(version: &str) -> Result<&'static [(&'static str, &'static str)], ContractError> {
    match version {
        "v1" => Ok(EMBEDDED_V1),
        other => Err(ContractError::UnsupportedVersion(other.to_string())),
    }
}

/// Resolves `<root>/<version>` and checks that it exists.
fn version_dir(root: &Path, version: &str) -> Result<PathBuf, ContractError> {
    let dir = root.join(version);
    if dir.is_dir() {
        Ok(dir)
    } else {
        Err(ContractError::UnsupportedVersion(format!("{version} (not found under {})", root.display())))
    }
}

/// Returns true when a logical path names a schema document.
fn is_schema_path(path: &str) -> bool {
    path.starts_with("schemas/") && path.ends_with(SCHEMA_SUFFIX)
}

/// Recursively collects logical schema paths beneath `dir`.
///
/// Symlinked directories are not descended into.
fn collect_schema_paths(
    dir: &Path,
    logical: &str,
    out: &mut Vec<String>,
) -> Result<(), ContractError> {
    let entries = fs::read_dir(dir).map_err(|err| ContractError::Io {
        path: dir.to_path_buf(),
        message: err.to_string(),
    })?;
    for entry in entries {
        let entry = entry.map_err(|err| ContractError::Io {
            path: dir.to_path_buf(),
            message: err.to_string(),
        })?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let child = format!("{logical}/{name}");
        let file_type = entry.file_type().map_err(|err| ContractError::Io {
            path: entry.path(),
            message: err.to_string(),
        })?;
        if file_type.is_dir() {
            collect_schema_paths(&entry.path(), &child, out)?;
        } else if is_schema_path(&child) {
            out.push(child);
        }
    }
    Ok(())
}

/// Reads a file as UTF-8.
fn read_to_string(path: &Path) -> Result<String, ContractError> {
    fs::read_to_string(path).map_err(|err| ContractError::Io {
        path: path.to_path_buf(),
        message: err.to_string(),
    })
}
