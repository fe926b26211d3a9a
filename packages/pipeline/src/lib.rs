#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Click-to-prediction pipeline.
//!
//! Wires the three steps of a map click together:
//!
//! 1. **Click intake** hands a [`Coordinate`] to [`ClickPipeline::handle_click`].
//! 2. The [`LocationResolver`] turns it into a location code.
//! 3. The [`PredictionInvoker`] builds a feature record around the code
//!    and scores it with the loaded model.
//!
//! Geocoding problems are absorbed by the resolver; model failures are
//! not, and surface as [`PipelineError::Model`].
//!
//! [`config::AppConfig`] reads the runtime configuration from the
//! environment and builds a ready pipeline from it.

pub mod config;

use std::sync::Arc;

use crime_predict_location::LocationResolver;
use crime_predict_location_models::Coordinate;
use crime_predict_model::{CrimeModel, FeatureDefaults, FeatureOverrides, ModelError};
use crime_predict_pipeline_models::{ClickReport, Prediction};
use thiserror::Error;

/// Errors from handling a click.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The model failed to score the record.
    #[error("Prediction failed: {0}")]
    Model(#[from] ModelError),
}

/// Builds feature records and submits them to the model.
#[derive(Clone)]
pub struct PredictionInvoker {
    model: Arc<dyn CrimeModel>,
    defaults: FeatureDefaults,
}

impl std::fmt::Debug for PredictionInvoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PredictionInvoker")
            .field("defaults", &self.defaults)
            .finish_non_exhaustive()
    }
}

impl PredictionInvoker {
    /// Creates an invoker that fills placeholder fields from `defaults`.
    #[must_use]
    pub fn new(model: Arc<dyn CrimeModel>, defaults: FeatureDefaults) -> Self {
        Self { model, defaults }
    }

    /// The placeholder values used for every record.
    #[must_use]
    pub const fn defaults(&self) -> &FeatureDefaults {
        &self.defaults
    }

    /// Scores `location_code` with the defaults plus `overrides`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError`] if the model cannot score the record.
    pub fn predict(
        &self,
        location_code: i64,
        overrides: &FeatureOverrides,
    ) -> Result<Prediction, ModelError> {
        let mut record = self.defaults.record(location_code);
        overrides.apply(&mut record);

        let score = self.model.predict(&record)?;
        log::debug!("Scored {record:?} => {score}");

        Ok(Prediction { record, score })
    }
}

/// The full click handler: resolve, then predict.
#[derive(Debug, Clone)]
pub struct ClickPipeline {
    resolver: LocationResolver,
    invoker: PredictionInvoker,
}

impl ClickPipeline {
    /// Creates a pipeline from its two stages.
    #[must_use]
    pub const fn new(resolver: LocationResolver, invoker: PredictionInvoker) -> Self {
        Self { resolver, invoker }
    }

    /// The location resolver stage.
    #[must_use]
    pub const fn resolver(&self) -> &LocationResolver {
        &self.resolver
    }

    /// The prediction stage.
    #[must_use]
    pub const fn invoker(&self) -> &PredictionInvoker {
        &self.invoker
    }

    /// Handles one click.
    ///
    /// The model is only consulted when the coordinate resolves to a
    /// table entry; otherwise the report carries no prediction.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Model`] if the model fails. Geocoding
    /// failures are reported through the outcome instead.
    pub async fn handle_click(
        &self,
        coordinate: Coordinate,
        overrides: &FeatureOverrides,
    ) -> Result<ClickReport, PipelineError> {
        let outcome = self.resolver.resolve(coordinate).await;

        let prediction = if outcome.is_resolved() {
            Some(self.invoker.predict(outcome.code(), overrides)?)
        } else {
            None
        };

        Ok(ClickReport {
            coordinate,
            outcome,
            prediction,
        })
    }
}
