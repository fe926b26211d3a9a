#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Resolves a clicked coordinate to a location code.
//!
//! The resolver reverse-geocodes the point, reads the postcode out of the
//! returned address, and scans the [`LocationCodeTable`] for a matching
//! key. Geocoder failures never surface as errors: they become
//! [`LocationOutcome::ServiceUnavailable`], which callers that only care
//! about the code flatten to the same `-1` sentinel as a miss.

use std::sync::Arc;

use crime_predict_geocoder::ReverseGeocoder;
use crime_predict_location_models::{Coordinate, LocationCodeTable, LocationOutcome, MatchPolicy};

/// Maps coordinates to location codes using a reverse geocoder and a
/// fixed code table.
#[derive(Clone)]
pub struct LocationResolver {
    geocoder: Arc<dyn ReverseGeocoder>,
    table: Arc<LocationCodeTable>,
    policy: MatchPolicy,
}

impl std::fmt::Debug for LocationResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocationResolver")
            .field("table", &self.table)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl LocationResolver {
    /// Creates a resolver over `table` using `geocoder` for lookups.
    #[must_use]
    pub fn new(
        geocoder: Arc<dyn ReverseGeocoder>,
        table: Arc<LocationCodeTable>,
        policy: MatchPolicy,
    ) -> Self {
        Self {
            geocoder,
            table,
            policy,
        }
    }

    /// The table this resolver matches against.
    #[must_use]
    pub fn table(&self) -> &LocationCodeTable {
        &self.table
    }

    /// The active match policy.
    #[must_use]
    pub const fn policy(&self) -> MatchPolicy {
        self.policy
    }

    /// Resolves `coordinate` to a [`LocationOutcome`].
    ///
    /// Issues one reverse geocoding request. An address without a
    /// postcode is matched as if the postcode were empty.
    pub async fn resolve(&self, coordinate: Coordinate) -> LocationOutcome {
        let address = match self.geocoder.reverse(coordinate).await {
            Ok(address) => address,
            Err(e) => {
                log::warn!("Reverse geocoding failed for {coordinate}: {e}");
                return LocationOutcome::ServiceUnavailable {
                    reason: e.to_string(),
                };
            }
        };

        let postcode = address
            .as_ref()
            .and_then(|a| a.postcode())
            .map(String::from);

        match self
            .table
            .lookup(postcode.as_deref().unwrap_or(""), self.policy)
        {
            Some(entry) => {
                log::debug!(
                    "Resolved {coordinate} (postcode {postcode:?}) to {} => {}",
                    entry.key,
                    entry.code
                );
                LocationOutcome::Resolved {
                    key: entry.key.clone(),
                    code: entry.code,
                }
            }
            None => {
                log::info!("No location code for {coordinate} (postcode {postcode:?})");
                LocationOutcome::NotFound { postcode }
            }
        }
    }

    /// Resolves `coordinate` to a `(key, code)` pair, collapsing every
    /// unresolved case to `(None, -1)`.
    pub async fn resolve_code(&self, coordinate: Coordinate) -> (Option<String>, i64) {
        self.resolve(coordinate).await.into_pair()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use crime_predict_geocoder::{GeocodeError, ReverseGeocodedAddress};
    use crime_predict_location_models::{LocationCodeEntry, UNRESOLVED_LOCATION_CODE};

    /// Geocoder stub returning a canned response for every coordinate.
    enum MockGeocoder {
        Postcode(&'static str),
        NoPostcode,
        NoResult,
        Timeout,
        Status(u16),
    }

    #[async_trait]
    impl ReverseGeocoder for MockGeocoder {
        async fn reverse(
            &self,
            _coordinate: Coordinate,
        ) -> Result<Option<ReverseGeocodedAddress>, GeocodeError> {
            match self {
                Self::Postcode(postcode) => {
                    let mut address = ReverseGeocodedAddress::default();
                    address
                        .address
                        .insert("postcode".to_string(), (*postcode).to_string());
                    Ok(Some(address))
                }
                Self::NoPostcode => Ok(Some(ReverseGeocodedAddress::default())),
                Self::NoResult => Ok(None),
                Self::Timeout => Err(GeocodeError::Timeout { seconds: 10 }),
                Self::Status(status) => Err(GeocodeError::Status { status: *status }),
            }
        }
    }

    fn resolver_with(
        geocoder: MockGeocoder,
        entries: &[(&str, i64)],
        policy: MatchPolicy,
    ) -> LocationResolver {
        let table = LocationCodeTable::new(
            entries
                .iter()
                .map(|(key, code)| LocationCodeEntry {
                    key: (*key).to_string(),
                    code: *code,
                })
                .collect(),
        )
        .unwrap();
        LocationResolver::new(Arc::new(geocoder), Arc::new(table), policy)
    }

    fn default_resolver(geocoder: MockGeocoder) -> LocationResolver {
        LocationResolver::new(
            Arc::new(geocoder),
            Arc::new(LocationCodeTable::default_table()),
            MatchPolicy::Substring,
        )
    }

    fn nyc() -> Coordinate {
        Coordinate::new(40.7128, -74.0060).unwrap()
    }

    #[tokio::test]
    async fn resolves_nyc_center_by_substring() {
        let resolver = default_resolver(MockGeocoder::Postcode("87G8R3PJ+99"));
        assert_eq!(
            resolver.resolve_code(nyc()).await,
            (Some("87G8R3PJ+".to_string()), 0)
        );
    }

    #[tokio::test]
    async fn resolves_exact_postcode() {
        let resolver = default_resolver(MockGeocoder::Postcode("87G8R3PJ+"));
        assert_eq!(
            resolver.resolve(nyc()).await,
            LocationOutcome::Resolved {
                key: "87G8R3PJ+".to_string(),
                code: 0
            }
        );
    }

    #[tokio::test]
    async fn unknown_postcode_is_not_found() {
        let resolver = default_resolver(MockGeocoder::Postcode("00000"));
        let origin = Coordinate::new(0.0, 0.0).unwrap();

        let outcome = resolver.resolve(origin).await;
        assert_eq!(
            outcome,
            LocationOutcome::NotFound {
                postcode: Some("00000".to_string())
            }
        );
        assert_eq!(outcome.into_pair(), (None, UNRESOLVED_LOCATION_CODE));
    }

    #[tokio::test]
    async fn timeout_is_service_unavailable() {
        let resolver = default_resolver(MockGeocoder::Timeout);
        let outcome = resolver.resolve(nyc()).await;
        assert!(matches!(outcome, LocationOutcome::ServiceUnavailable { .. }));
        assert_eq!(outcome.into_pair(), (None, UNRESOLVED_LOCATION_CODE));
    }

    #[tokio::test]
    async fn service_errors_collapse_to_sentinel() {
        let resolver = default_resolver(MockGeocoder::Status(503));
        assert_eq!(
            resolver.resolve_code(nyc()).await,
            (None, UNRESOLVED_LOCATION_CODE)
        );
    }

    #[tokio::test]
    async fn missing_address_is_not_found() {
        for geocoder in [MockGeocoder::NoResult, MockGeocoder::NoPostcode] {
            let resolver = default_resolver(geocoder);
            assert_eq!(
                resolver.resolve(nyc()).await,
                LocationOutcome::NotFound { postcode: None }
            );
        }
    }

    #[tokio::test]
    async fn substring_policy_takes_first_entry_in_table_order() {
        let resolver = resolver_with(
            MockGeocoder::Postcode("10001-2062"),
            &[("11201", 5), ("1000", 2), ("10001", 1)],
            MatchPolicy::Substring,
        );
        // "1000" is a false positive for 10001, but it comes first.
        assert_eq!(
            resolver.resolve_code(nyc()).await,
            (Some("1000".to_string()), 2)
        );
    }

    #[tokio::test]
    async fn exact_policy_skips_partial_matches() {
        let resolver = resolver_with(
            MockGeocoder::Postcode("10001"),
            &[("1000", 2), ("10001", 1)],
            MatchPolicy::Exact,
        );
        assert_eq!(
            resolver.resolve_code(nyc()).await,
            (Some("10001".to_string()), 1)
        );

        let resolver = resolver_with(
            MockGeocoder::Postcode("87G8R3PJ+99"),
            &[("87G8R3PJ+", 0)],
            MatchPolicy::Exact,
        );
        assert_eq!(
            resolver.resolve_code(nyc()).await,
            (None, UNRESOLVED_LOCATION_CODE)
        );
    }
}
