//! Nominatim / OpenStreetMap reverse geocoder client.
//!
//! The public instance allows at most **1 request per second** and
//! requires an identifying `User-Agent`. Each map click issues exactly
//! one request; nothing here retries or caches.
//!
//! See <https://nominatim.org/release-docs/develop/api/Reverse/>

use std::collections::BTreeMap;

use async_trait::async_trait;
use crime_predict_location_models::Coordinate;

use crate::service_registry::GeocodingService;
use crate::{GeocodeError, ReverseGeocodedAddress, ReverseGeocoder};

/// Reverse geocoder backed by a Nominatim `/reverse` endpoint.
#[derive(Debug, Clone)]
pub struct NominatimGeocoder {
    client: reqwest::Client,
    base_url: String,
    zoom: String,
    timeout_secs: u64,
}

impl NominatimGeocoder {
    /// Builds a client for `service`, applying its user agent and
    /// per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Http`] if the HTTP client cannot be built
    /// (e.g., the TLS backend fails to initialise).
    pub fn new(service: &GeocodingService) -> Result<Self, GeocodeError> {
        let client = reqwest::Client::builder()
            .user_agent(service.user_agent.as_str())
            .timeout(service.timeout())
            .build()?;

        Ok(Self {
            client,
            base_url: service.base_url.clone(),
            zoom: service.zoom.to_string(),
            timeout_secs: service.timeout_secs,
        })
    }

    /// Maps a transport error, singling out timeouts.
    fn classify(&self, e: reqwest::Error) -> GeocodeError {
        if e.is_timeout() {
            GeocodeError::Timeout {
                seconds: self.timeout_secs,
            }
        } else {
            GeocodeError::Http(e)
        }
    }
}

#[async_trait]
impl ReverseGeocoder for NominatimGeocoder {
    async fn reverse(
        &self,
        coordinate: Coordinate,
    ) -> Result<Option<ReverseGeocodedAddress>, GeocodeError> {
        log::debug!("Reverse geocoding {coordinate} via {}", self.base_url);

        let resp = self
            .client
            .get(&self.base_url)
            .query(&[
                ("lat", coordinate.latitude.to_string()),
                ("lon", coordinate.longitude.to_string()),
                ("format", "jsonv2".to_string()),
                ("addressdetails", "1".to_string()),
                ("zoom", self.zoom.clone()),
            ])
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(GeocodeError::RateLimited);
        }

        if !resp.status().is_success() {
            return Err(GeocodeError::Status {
                status: resp.status().as_u16(),
            });
        }

        let body: serde_json::Value = resp.json().await.map_err(|e| self.classify(e))?;
        parse_response(&body)
    }
}

/// Parses a Nominatim `jsonv2` reverse response.
///
/// Nominatim answers points it cannot place with a 200 and an `error`
/// field, which is reported as `Ok(None)`.
fn parse_response(body: &serde_json::Value) -> Result<Option<ReverseGeocodedAddress>, GeocodeError> {
    let obj = body.as_object().ok_or_else(|| GeocodeError::Parse {
        message: "Nominatim response is not an object".to_string(),
    })?;

    if let Some(error) = obj.get("error") {
        log::debug!("Nominatim has no address for point: {error}");
        return Ok(None);
    }

    let address = match obj.get("address") {
        None | Some(serde_json::Value::Null) => BTreeMap::new(),
        Some(serde_json::Value::Object(fields)) => fields
            .iter()
            .filter_map(|(k, v)| match v {
                serde_json::Value::String(s) => Some((k.clone(), s.clone())),
                serde_json::Value::Number(n) => Some((k.clone(), n.to_string())),
                _ => None,
            })
            .collect(),
        Some(_) => {
            return Err(GeocodeError::Parse {
                message: "Nominatim 'address' is not an object".to_string(),
            });
        }
    };

    let display_name = obj
        .get("display_name")
        .and_then(serde_json::Value::as_str)
        .map(String::from);

    Ok(Some(ReverseGeocodedAddress {
        display_name,
        address,
    }))
}
