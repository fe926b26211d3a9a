#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the crime prediction server.
//!
//! These types are serialized to JSON for the REST API. They are separate
//! from the pipeline's report types to allow independent evolution of the
//! API contract.

use crime_predict_location_models::{Coordinate, LocationCodeEntry, LocationOutcome};
use crime_predict_model::{FeatureOverrides, FeatureRecord};
use crime_predict_pipeline_models::ClickReport;
use serde::{Deserialize, Serialize};

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// Whether the server is healthy.
    pub healthy: bool,
    /// Server version.
    pub version: String,
}

/// Error body returned with non-2xx responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Human-readable description.
    pub error: String,
}

/// Body of `POST /api/predict`: a map click.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictRequest {
    /// Clicked latitude.
    pub latitude: f64,
    /// Clicked longitude.
    pub longitude: f64,
    /// Replacements for the placeholder feature values.
    #[serde(default)]
    pub features: FeatureOverrides,
}

/// A model score as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiPrediction {
    /// Crime likelihood score.
    pub score: f64,
    /// The record that was scored, keyed by model column name.
    pub features: FeatureRecord,
}

/// Response of `POST /api/predict`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiPredictResponse {
    /// The clicked point.
    pub coordinate: Coordinate,
    /// Detailed resolution outcome.
    pub outcome: LocationOutcome,
    /// Matching table key, absent when unresolved.
    pub location_key: Option<String>,
    /// Location code fed to the model; `-1` when unresolved.
    pub location_code: i64,
    /// Prediction, present only when the location resolved.
    pub prediction: Option<ApiPrediction>,
    /// Plain text lines for display.
    pub lines: Vec<String>,
}

impl From<ClickReport> for ApiPredictResponse {
    fn from(report: ClickReport) -> Self {
        let lines = report.lines();
        let location_key = report.outcome.key().map(String::from);
        let location_code = report.outcome.code();
        Self {
            coordinate: report.coordinate,
            outcome: report.outcome,
            location_key,
            location_code,
            prediction: report.prediction.map(|p| ApiPrediction {
                score: p.score,
                features: p.record,
            }),
            lines,
        }
    }
}

/// One row of the location code table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiLocationCode {
    /// Postal-code fragment.
    pub key: String,
    /// Location code.
    pub code: i64,
}

impl From<&LocationCodeEntry> for ApiLocationCode {
    fn from(entry: &LocationCodeEntry) -> Self {
        Self {
            key: entry.key.clone(),
            code: entry.code,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predict_request_features_are_optional() {
        let req: PredictRequest =
            serde_json::from_str(r#"{"latitude": 40.7128, "longitude": -74.006}"#).unwrap();
        assert_eq!(req.features, FeatureOverrides::default());

        let req: PredictRequest = serde_json::from_str(
            r#"{"latitude": 40.7128, "longitude": -74.006, "features": {"hour": 2, "addressPrecinct": 75}}"#,
        )
        .unwrap();
        assert_eq!(req.features.hour, Some(2));
        assert_eq!(req.features.address_precinct, Some(75));
    }

    #[test]
    fn unresolved_report_maps_to_sentinel_code() {
        let report = ClickReport {
            coordinate: Coordinate::new(0.0, 0.0).unwrap(),
            outcome: LocationOutcome::NotFound {
                postcode: Some("00000".to_string()),
            },
            prediction: None,
        };
        let resp = ApiPredictResponse::from(report);
        assert_eq!(resp.location_key, None);
        assert_eq!(resp.location_code, -1);
        assert!(resp.prediction.is_none());
        assert_eq!(resp.lines.len(), 1);
    }
}
