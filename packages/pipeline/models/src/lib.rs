#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Result types produced by the click-to-prediction pipeline.
//!
//! A [`ClickReport`] carries everything the display surface needs for
//! one click and renders it as plain text lines via
//! [`ClickReport::lines`].

use crime_predict_location_models::{Coordinate, LocationOutcome};
use crime_predict_model::FeatureRecord;
use serde::{Deserialize, Serialize};

/// Shown when a click cannot be mapped to a location code, whether the
/// geocoder failed or the postcode is not in the table.
pub const UNMAPPED_MESSAGE: &str = "Could not map location to crime prediction.";

/// A model score together with the record it was computed from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// The exact record submitted to the model.
    pub record: FeatureRecord,
    /// The model's crime likelihood score.
    pub score: f64,
}

/// Outcome of handling one map click.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClickReport {
    /// The clicked point.
    pub coordinate: Coordinate,
    /// How the point resolved against the location code table.
    pub outcome: LocationOutcome,
    /// The prediction, present only when the location resolved.
    pub prediction: Option<Prediction>,
}

impl ClickReport {
    /// Renders the report as display lines.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        let LocationOutcome::Resolved { key, code } = &self.outcome else {
            return vec![UNMAPPED_MESSAGE.to_string()];
        };

        let mut lines = vec![
            format!(
                "You clicked at latitude: {}, longitude: {}",
                self.coordinate.latitude, self.coordinate.longitude
            ),
            format!("Mapped Location Code: {key}, Numeric Code: {code}"),
        ];
        if let Some(prediction) = &self.prediction {
            lines.push(format!(
                "Predicted Crime Likelihood: {:.2}",
                prediction.score
            ));
        }
        lines
    }
}
