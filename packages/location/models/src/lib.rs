#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Location types shared by the geocoder, resolver, and API layers.
//!
//! A [`Coordinate`] is what the map surface reports on click. The
//! [`LocationCodeTable`] maps postal-code fragments to the integer
//! categories the prediction model was trained on, and
//! [`LocationOutcome`] is the result of resolving one against the other.

use std::path::Path;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use thiserror::Error;

/// Location code reported when a coordinate cannot be mapped to any
/// table entry, for whatever reason.
pub const UNRESOLVED_LOCATION_CODE: i64 = -1;

/// A WGS84 point reported by the map surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinate")]
pub struct Coordinate {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

impl Coordinate {
    /// Creates a coordinate, rejecting NaN and infinite components.
    ///
    /// Geographic range is not checked; the map surface only reports
    /// points it can display.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidCoordinateError`] if either component is not
    /// finite.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, InvalidCoordinateError> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return Err(InvalidCoordinateError {
                latitude,
                longitude,
            });
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }
}

/// Unchecked wire form of a [`Coordinate`].
#[derive(Deserialize)]
struct RawCoordinate {
    latitude: f64,
    longitude: f64,
}

impl TryFrom<RawCoordinate> for Coordinate {
    type Error = InvalidCoordinateError;

    fn try_from(raw: RawCoordinate) -> Result<Self, Self::Error> {
        Self::new(raw.latitude, raw.longitude)
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.latitude, self.longitude)
    }
}

/// Error returned when a coordinate has a non-finite component.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("invalid coordinate ({latitude}, {longitude}): components must be finite")]
pub struct InvalidCoordinateError {
    /// The rejected latitude.
    pub latitude: f64,
    /// The rejected longitude.
    pub longitude: f64,
}

/// One row of the location code table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationCodeEntry {
    /// Postal-code fragment to look for in the geocoded address.
    pub key: String,
    /// Integer category assigned to this area at training time.
    pub code: i64,
}

/// How a table key is compared against a geocoded postcode.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum MatchPolicy {
    /// The key matches when it appears anywhere in the postcode.
    /// Order-dependent and prone to false positives, but it is what the
    /// trained code assignments were produced with.
    #[default]
    Substring,
    /// The key must equal the trimmed postcode.
    Exact,
}

impl MatchPolicy {
    /// Returns whether `key` matches `postcode` under this policy.
    #[must_use]
    pub fn matches(self, key: &str, postcode: &str) -> bool {
        match self {
            Self::Substring => postcode.contains(key),
            Self::Exact => postcode.trim() == key,
        }
    }
}

/// Errors from building or loading a [`LocationCodeTable`].
#[derive(Debug, Error)]
pub enum TableError {
    /// Two entries share the same key.
    #[error("Duplicate location code key: {key}")]
    DuplicateKey {
        /// The repeated key.
        key: String,
    },

    /// An entry has an empty key, which would match every postcode.
    #[error("Location code entry {index} has an empty key")]
    EmptyKey {
        /// Position of the offending entry.
        index: usize,
    },

    /// The table file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The table file is not valid TOML for a table.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// On-disk shape of a table file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TableFile {
    #[serde(default)]
    entries: Vec<LocationCodeEntry>,
}

const DEFAULT_TABLE_TOML: &str = include_str!("../location_codes.toml");

/// Ordered, read-only mapping from postal-code fragments to location
/// codes.
///
/// Lookups walk the entries in insertion order and return the first
/// match, so the file order is the tie-break.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocationCodeTable {
    entries: Vec<LocationCodeEntry>,
}

impl LocationCodeTable {
    /// Builds a table, rejecting duplicate and empty keys.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::DuplicateKey`] or [`TableError::EmptyKey`].
    pub fn new(entries: Vec<LocationCodeEntry>) -> Result<Self, TableError> {
        let mut seen = std::collections::BTreeSet::new();
        for (index, entry) in entries.iter().enumerate() {
            if entry.key.is_empty() {
                return Err(TableError::EmptyKey { index });
            }
            if !seen.insert(entry.key.as_str()) {
                return Err(TableError::DuplicateKey {
                    key: entry.key.clone(),
                });
            }
        }
        Ok(Self { entries })
    }

    /// Parses a table from TOML (`[[entries]]` with `key` and `code`).
    ///
    /// # Errors
    ///
    /// Returns [`TableError`] if the TOML is malformed or the entries
    /// violate the key rules.
    pub fn from_toml_str(s: &str) -> Result<Self, TableError> {
        let file: TableFile = toml::de::from_str(s)?;
        Self::new(file.entries)
    }

    /// Loads a table from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`TableError`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, TableError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Returns the table shipped with the crate.
    ///
    /// # Panics
    ///
    /// Panics if the embedded `location_codes.toml` is malformed.
    #[must_use]
    pub fn default_table() -> Self {
        Self::from_toml_str(DEFAULT_TABLE_TOML)
            .unwrap_or_else(|e| panic!("Failed to parse embedded location codes: {e}"))
    }

    /// Returns the first entry whose key matches `postcode`.
    #[must_use]
    pub fn lookup(&self, postcode: &str, policy: MatchPolicy) -> Option<&LocationCodeEntry> {
        self.entries
            .iter()
            .find(|entry| policy.matches(&entry.key, postcode))
    }

    /// Returns the entries in lookup order.
    #[must_use]
    pub fn entries(&self) -> &[LocationCodeEntry] {
        &self.entries
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Result of resolving a coordinate to a location code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum LocationOutcome {
    /// A table entry matched the geocoded postcode.
    Resolved {
        /// The matching table key.
        key: String,
        /// The key's location code.
        code: i64,
    },
    /// The geocoder answered but no table entry matched.
    NotFound {
        /// Postcode reported by the geocoder, if any.
        postcode: Option<String>,
    },
    /// The geocoder timed out or failed.
    ServiceUnavailable {
        /// Description of the failure.
        reason: String,
    },
}

impl LocationOutcome {
    /// The location code to feed the model; the sentinel unless resolved.
    #[must_use]
    pub const fn code(&self) -> i64 {
        match self {
            Self::Resolved { code, .. } => *code,
            Self::NotFound { .. } | Self::ServiceUnavailable { .. } => UNRESOLVED_LOCATION_CODE,
        }
    }

    /// The matching table key, if resolved.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::Resolved { key, .. } => Some(key),
            Self::NotFound { .. } | Self::ServiceUnavailable { .. } => None,
        }
    }

    /// Whether a table entry matched.
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved { .. })
    }

    /// Flattens into the `(key, code)` pair where "not found" and
    /// "service unavailable" both become `(None, -1)`.
    #[must_use]
    pub fn into_pair(self) -> (Option<String>, i64) {
        match self {
            Self::Resolved { key, code } => (Some(key), code),
            Self::NotFound { .. } | Self::ServiceUnavailable { .. } => {
                (None, UNRESOLVED_LOCATION_CODE)
            }
        }
    }
}
