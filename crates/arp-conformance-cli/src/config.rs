// crates/arp-conformance-cli/src/config.rs
// ============================================================================
// Module: CLI Configuration
// Description: Config file loading, header parsing, and option resolution.
// Purpose: Merge defaults, a TOML config file, and flags into RunnerOptions.
// Dependencies: arp-conformance, serde, toml
// ============================================================================

//! ## Overview
//! Precedence is flag > config file > default. Headers merge in the same
//! order: `[runner].headers`, then `[headers]`, then `--headers-file`, then
//! `--headers`, later entries replacing earlier ones with the same name.
//!
//! Config and header files are untrusted input and are read with a size cap.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::path::PathBuf;

use arp_conformance::RunnerOptions;
use arp_conformance::options::duration_from_secs;
use serde::Deserialize;
use thiserror::Error;

use crate::CliError;
use crate::CliResult;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum size of a TOML config file.
pub(crate) const MAX_CONFIG_BYTES: usize = 1024 * 1024;
/// Maximum size of a headers file.
pub(crate) const MAX_HEADERS_FILE_BYTES: usize = 256 * 1024;

// ============================================================================
// SECTION: Bounded Reads
// ============================================================================

/// Failure reading a size-capped input file.
#[derive(Debug, Error)]
pub(crate) enum ReadLimitError {
    /// The file could not be opened or read.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// The file exceeds the cap.
    #[error("file is {size} bytes, limit is {limit}")]
    TooLarge {
        /// Observed size.
        size: u64,
        /// Configured cap.
        limit: usize,
    },
}

/// Reads at most `max_bytes` from `path`, failing when the file is larger.
pub(crate) fn read_bytes_with_limit(path: &Path, max_bytes: usize) -> Result<Vec<u8>, ReadLimitError> {
    let file = File::open(path)?;
    let size = file.metadata()?.len();
    let limit = u64::try_from(max_bytes).unwrap_or(u64::MAX);
    if size > limit {
        return Err(ReadLimitError::TooLarge {
            size,
            limit: max_bytes,
        });
    }
    let mut bytes = Vec::new();
    file.take(limit.saturating_add(1)).read_to_end(&mut bytes)?;
    if bytes.len() > max_bytes {
        return Err(ReadLimitError::TooLarge {
            size: u64::try_from(bytes.len()).unwrap_or(u64::MAX),
            limit: max_bytes,
        });
    }
    Ok(bytes)
}

/// Reads a capped UTF-8 text file; `kind` names it in errors.
fn read_text(path: &Path, max_bytes: usize, kind: &str) -> CliResult<String> {
    let bytes = read_bytes_with_limit(path, max_bytes)
        .map_err(|err| CliError::new(format!("failed to read {kind} {}: {err}", path.display())))?;
    String::from_utf8(bytes)
        .map_err(|_| CliError::new(format!("{kind} {} is not valid UTF-8", path.display())))
}

// ============================================================================
// SECTION: Config File
// ============================================================================

/// Parsed `--config` file.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct ConfigFile {
    /// Runner options; missing fields keep their defaults.
    pub(crate) runner: RunnerOptions,
    /// Extra request headers.
    pub(crate) headers: BTreeMap<String, String>,
}

impl ConfigFile {
    /// Loads and parses a TOML config file.
    pub(crate) fn load(path: &Path) -> CliResult<Self> {
        let text = read_text(path, MAX_CONFIG_BYTES, "config file")?;
        Self::parse(&text)
            .map_err(|err| CliError::new(format!("invalid config file {}: {err}", path.display())))
    }

    /// Parses TOML config text.
    pub(crate) fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

// ============================================================================
// SECTION: Headers
// ============================================================================

/// Parses one `KEY=VALUE` header; both sides are trimmed.
pub(crate) fn parse_header_pair(raw: &str) -> Result<(String, String), String> {
    let Some((key, value)) = raw.split_once('=') else {
        return Err(format!("expected KEY=VALUE, got \"{raw}\""));
    };
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty header name in \"{raw}\""));
    }
    Ok((key.to_string(), value.trim().to_string()))
}

/// Parses a headers file: one `KEY=VALUE` per line, `#` comments allowed.
pub(crate) fn parse_headers_file(text: &str) -> Result<BTreeMap<String, String>, String> {
    let mut headers = BTreeMap::new();
    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (key, value) =
            parse_header_pair(line).map_err(|err| format!("line {}: {err}", index + 1))?;
        headers.insert(key, value);
    }
    Ok(headers)
}

/// Loads a headers file from disk.
pub(crate) fn load_headers_file(path: &Path) -> CliResult<BTreeMap<String, String>> {
    let text = read_text(path, MAX_HEADERS_FILE_BYTES, "headers file")?;
    parse_headers_file(&text)
        .map_err(|err| CliError::new(format!("invalid headers file {}: {err}", path.display())))
}

// ============================================================================
// SECTION: Resolution
// ============================================================================

/// Option values given on the command line; `None` defers to the config.
#[derive(Debug, Clone, Default)]
pub(crate) struct OptionOverrides {
    /// Per-call timeout in seconds.
    pub(crate) timeout: Option<f64>,
    /// Retry budget.
    pub(crate) retries: Option<u32>,
    /// Polling deadline in seconds.
    pub(crate) poll_timeout: Option<f64>,
    /// Polling interval in seconds.
    pub(crate) poll_interval: Option<f64>,
    /// `--allow-mutations` was given.
    pub(crate) allow_mutations: bool,
    /// `--no-cleanup` was given.
    pub(crate) no_cleanup: bool,
    /// `--strict` was given.
    pub(crate) strict: bool,
    /// Contract directory.
    pub(crate) spec_path: Option<PathBuf>,
    /// Contract version.
    pub(crate) spec_version: Option<String>,
    /// Tool id hint.
    pub(crate) tool_id: Option<String>,
    /// Tool name hint.
    pub(crate) tool_name: Option<String>,
    /// Runtime profile hint.
    pub(crate) runtime_profile: Option<String>,
    /// Headers from `--headers-file` then `--headers`, in that order.
    pub(crate) headers: Vec<(String, String)>,
}

/// Merges config and overrides into validated options.
pub(crate) fn resolve_options(
    config: Option<ConfigFile>,
    overrides: OptionOverrides,
) -> CliResult<RunnerOptions> {
    let (mut options, extra_headers) = match config {
        Some(config) => (config.runner, config.headers),
        None => (RunnerOptions::default(), BTreeMap::new()),
    };
    options.headers.extend(extra_headers);
    options.headers.extend(overrides.headers);

    if let Some(timeout) = overrides.timeout {
        options.timeout = seconds("timeout", timeout)?;
    }
    if let Some(retries) = overrides.retries {
        options.retries = retries;
    }
    if let Some(poll_timeout) = overrides.poll_timeout {
        options.poll_timeout = seconds("poll_timeout", poll_timeout)?;
    }
    if let Some(poll_interval) = overrides.poll_interval {
        options.poll_interval = seconds("poll_interval", poll_interval)?;
    }
    options.allow_mutations |= overrides.allow_mutations;
    if overrides.no_cleanup {
        options.cleanup = false;
    }
    options.strict |= overrides.strict;
    if overrides.spec_path.is_some() {
        options.spec_path = overrides.spec_path;
    }
    if let Some(spec_version) = overrides.spec_version {
        options.spec_version = spec_version;
    }
    options.tool_id = overrides.tool_id.or(options.tool_id);
    options.tool_name = overrides.tool_name.or(options.tool_name);
    options.runtime_profile = overrides.runtime_profile.or(options.runtime_profile);

    options.validate().map_err(|err| CliError::new(format!("invalid options: {err}")))?;
    Ok(options)
}

/// Converts a seconds flag into a duration.
fn seconds(field: &'static str, value: f64) -> CliResult<std::time::Duration> {
    duration_from_secs(field, value).map_err(|err| CliError::new(format!("invalid options: {err}")))
}
