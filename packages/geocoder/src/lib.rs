#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Reverse geocoding for map clicks.
//!
//! Turns a [`Coordinate`] into a structured address so the resolver can
//! read its postcode. The [`ReverseGeocoder`] trait is the seam the
//! resolver depends on; [`nominatim::NominatimGeocoder`] is the
//! production implementation, configured from the embedded TOML files in
//! `services/` via the [`service_registry`].

pub mod nominatim;
pub mod service_registry;

use std::collections::BTreeMap;

use async_trait::async_trait;
use crime_predict_location_models::Coordinate;
use thiserror::Error;

/// A structured address returned by a reverse geocoder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReverseGeocodedAddress {
    /// Full human-readable label for the location.
    pub display_name: Option<String>,
    /// Address components keyed by the provider's field names
    /// (e.g., `"road"`, `"suburb"`, `"postcode"`).
    pub address: BTreeMap<String, String>,
}

impl ReverseGeocodedAddress {
    /// Returns the postal code component, if the provider reported one.
    #[must_use]
    pub fn postcode(&self) -> Option<&str> {
        self.address.get("postcode").map(String::as_str)
    }
}

/// Errors from reverse geocoding operations.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// The request did not complete within the configured timeout.
    #[error("Geocoder timed out after {seconds}s")]
    Timeout {
        /// The timeout that was exceeded.
        seconds: u64,
    },

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("Geocoder returned status {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },

    /// Response parsing failed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },

    /// Rate limit exceeded.
    #[error("Rate limit exceeded")]
    RateLimited,
}

/// A service that maps a coordinate to a structured address.
#[async_trait]
pub trait ReverseGeocoder: Send + Sync {
    /// Looks up the single best address for `coordinate`.
    ///
    /// Returns `Ok(None)` when the service answered but has no address
    /// for the point (e.g., open water).
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] if the service is unreachable, times out,
    /// or returns a response that cannot be parsed.
    async fn reverse(
        &self,
        coordinate: Coordinate,
    ) -> Result<Option<ReverseGeocodedAddress>, GeocodeError>;
}
