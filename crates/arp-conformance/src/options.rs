// crates/arp-conformance/src/options.rs
// ============================================================================
// Module: Runner Options
// Description: Tier ordering and the runner configuration bundle.
// Purpose: Describe what a conformance run does and how long it may block.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! [`Tier`] is a strictly ordered, cumulative battery selector. [`RunnerOptions`]
//! carries every knob a run honours; every field has a default so partial
//! configuration (from code, TOML, or flags) is always complete.
//!
//! Durations are expressed as fractional seconds when deserialized.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use arp_conformance_contract::DEFAULT_VERSION;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Invalid option values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OptionsError {
    /// Tier label is not one of smoke, surface, core, deep.
    #[error("unknown tier: {0} (expected smoke, surface, core, or deep)")]
    UnknownTier(String),
    /// A duration is negative, not finite, or out of range.
    #[error("invalid {field}: {value} seconds")]
    InvalidDuration {
        /// Option name.
        field: &'static str,
        /// Offending value.
        value: f64,
    },
    /// A duration that must be positive is zero.
    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),
}

// ============================================================================
// SECTION: Tier
// ============================================================================

/// Conformance tiers, ordered from least to most invasive.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Liveness and version reporting.
    #[default]
    Smoke,
    /// Every required endpoint answers in contract shape.
    Surface,
    /// End-to-end service flows; creates resources.
    Core,
    /// Optional endpoints; creates resources.
    Deep,
}

impl Tier {
    /// All tiers in execution order.
    pub const ALL: [Self; 4] = [Self::Smoke, Self::Surface, Self::Core, Self::Deep];

    /// Returns the wire label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Smoke => "smoke",
            Self::Surface => "surface",
            Self::Core => "core",
            Self::Deep => "deep",
        }
    }

    /// Returns true when the tier may create or mutate service state.
    #[must_use]
    pub fn requires_mutations(self) -> bool {
        self >= Self::Core
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = OptionsError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|tier| tier.as_str() == value)
            .ok_or_else(|| OptionsError::UnknownTier(value.to_string()))
    }
}

// ============================================================================
// SECTION: Options
// ============================================================================

/// Configuration for one conformance run.
///
/// # Invariants
/// - `timeout` and `poll_interval` are positive after [`RunnerOptions::validate`].
/// - `strict` affects only the aggregate verdict, never individual checks.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunnerOptions {
    /// Per-call timeout.
    #[serde(with = "duration_secs")]
    pub timeout: Duration,
    /// Retry budget for transient transport failures.
    pub retries: u32,
    /// Wall-clock bound on run-status polling.
    #[serde(with = "duration_secs")]
    pub poll_timeout: Duration,
    /// Wait between polls.
    #[serde(with = "duration_secs")]
    pub poll_interval: Duration,
    /// Gate for tiers that create resources.
    pub allow_mutations: bool,
    /// Delete resources created during the run.
    pub cleanup: bool,
    /// Treat WARN and SKIP as failures in the aggregate verdict.
    pub strict: bool,
    /// Contract root on disk; `None` selects the bundled snapshot.
    pub spec_path: Option<PathBuf>,
    /// Contract version.
    pub spec_version: String,
    /// Tool to invoke in the tool-registry core tier, by id.
    pub tool_id: Option<String>,
    /// Tool to invoke in the tool-registry core tier, by name.
    pub tool_name: Option<String>,
    /// Runtime profile to use in the daemon core tier.
    pub runtime_profile: Option<String>,
    /// Headers sent with every request.
    pub headers: BTreeMap<String, String>,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            retries: 0,
            poll_timeout: Duration::from_secs(60),
            poll_interval: Duration::from_secs(1),
            allow_mutations: false,
            cleanup: true,
            strict: false,
            spec_path: None,
            spec_version: DEFAULT_VERSION.to_string(),
            tool_id: None,
            tool_name: None,
            runtime_profile: None,
            headers: BTreeMap::new(),
        }
    }
}

impl RunnerOptions {
    /// Checks value ranges that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`OptionsError::ZeroDuration`] for a zero timeout or poll interval.
    pub fn validate(&self) -> Result<(), OptionsError> {
        if self.timeout.is_zero() {
            return Err(OptionsError::ZeroDuration("timeout"));
        }
        if self.poll_interval.is_zero() {
            return Err(OptionsError::ZeroDuration("poll_interval"));
        }
        Ok(())
    }
}

/// Converts fractional seconds to a [`Duration`].
///
/// # Errors
///
/// Returns [`OptionsError::InvalidDuration`] for negative or non-finite values.
pub fn duration_from_secs(field: &'static str, value: f64) -> Result<Duration, OptionsError> {
    Duration::try_from_secs_f64(value).map_err(|_| OptionsError::InvalidDuration {
        field,
        value,
    })
}

/// Serde adapter for durations written as fractional seconds.
mod duration_secs {
    use std::time::Duration;

    use serde::Deserialize;
    use serde::Deserializer;
    use serde::de::Error as _;

    /// Deserializes a non-negative number of seconds.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs)
            .map_err(|_| D::Error::custom(format!("invalid duration: {secs} seconds")))
    }
}
