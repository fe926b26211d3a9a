//! Runtime configuration read from the environment.
//!
//! | Variable | Default |
//! |---|---|
//! | `MODEL_PATH` | `data/model.json` |
//! | `LOCATION_CODES_PATH` | embedded table |
//! | `FEATURE_DEFAULTS_PATH` | built-in placeholders |
//! | `LOCATION_MATCH_POLICY` | `substring` |
//! | `GEOCODER_BASE_URL` | from `services/nominatim.toml` |
//! | `GEOCODER_USER_AGENT` | from `services/nominatim.toml` |
//! | `GEOCODER_TIMEOUT_SECS` | from `services/nominatim.toml` |
//!
//! Everything is loaded once at startup; the resulting
//! [`ClickPipeline`] is read-only.

use std::path::PathBuf;
use std::sync::Arc;

use crime_predict_geocoder::nominatim::NominatimGeocoder;
use crime_predict_geocoder::service_registry::{self, GeocodingService, ServiceOverrides};
use crime_predict_geocoder::GeocodeError;
use crime_predict_location::LocationResolver;
use crime_predict_location_models::{LocationCodeTable, MatchPolicy, TableError};
use crime_predict_model::tree::TreeEnsemble;
use crime_predict_model::{FeatureDefaults, ModelError};
use thiserror::Error;

use crate::{ClickPipeline, PredictionInvoker};

/// Model file used when `MODEL_PATH` is unset.
pub const DEFAULT_MODEL_PATH: &str = "data/model.json";

/// Errors from reading configuration or building the pipeline.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable holds an unusable value.
    #[error("Invalid value for {name}: '{value}'")]
    InvalidValue {
        /// Variable name.
        name: &'static str,
        /// The rejected value.
        value: String,
    },

    /// The configured geocoding service does not exist.
    #[error("Unknown geocoding service: {0}")]
    UnknownService(String),

    /// The location code table failed to load.
    #[error("Location code table: {0}")]
    Table(#[from] TableError),

    /// The model or feature defaults failed to load.
    #[error("Model: {0}")]
    Model(#[from] ModelError),

    /// The geocoder client could not be built.
    #[error("Geocoder: {0}")]
    Geocoder(#[from] GeocodeError),
}

/// Startup configuration for the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Tree ensemble JSON dump.
    pub model_path: PathBuf,
    /// Location code table TOML; the embedded table when `None`.
    pub location_codes_path: Option<PathBuf>,
    /// Feature defaults TOML; the built-in placeholders when `None`.
    pub feature_defaults_path: Option<PathBuf>,
    /// How table keys are compared against postcodes.
    pub match_policy: MatchPolicy,
    /// Resolved reverse geocoding service.
    pub geocoder: GeocodingService,
}

impl AppConfig {
    /// Reads configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if a variable cannot be
    /// parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads configuration through `lookup`, treating empty values as
    /// unset.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if a variable cannot be
    /// parsed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let match_policy = match get("LOCATION_MATCH_POLICY") {
            Some(value) => value.trim().parse().map_err(|_| ConfigError::InvalidValue {
                name: "LOCATION_MATCH_POLICY",
                value,
            })?,
            None => MatchPolicy::default(),
        };

        let timeout_secs = match get("GEOCODER_TIMEOUT_SECS") {
            Some(value) => Some(
                value
                    .trim()
                    .parse::<u64>()
                    .ok()
                    .filter(|secs| *secs > 0)
                    .ok_or(ConfigError::InvalidValue {
                        name: "GEOCODER_TIMEOUT_SECS",
                        value,
                    })?,
            ),
            None => None,
        };

        let geocoder = service_registry::service(service_registry::DEFAULT_SERVICE_ID)
            .ok_or_else(|| {
                ConfigError::UnknownService(service_registry::DEFAULT_SERVICE_ID.to_string())
            })?
            .with_overrides(ServiceOverrides {
                base_url: get("GEOCODER_BASE_URL"),
                user_agent: get("GEOCODER_USER_AGENT"),
                timeout_secs,
            });

        Ok(Self {
            model_path: get("MODEL_PATH")
                .map_or_else(|| PathBuf::from(DEFAULT_MODEL_PATH), PathBuf::from),
            location_codes_path: get("LOCATION_CODES_PATH").map(PathBuf::from),
            feature_defaults_path: get("FEATURE_DEFAULTS_PATH").map(PathBuf::from),
            match_policy,
            geocoder,
        })
    }

    /// Loads the location code table.
    ///
    /// # Errors
    ///
    /// Returns [`TableError`] if the configured file is unreadable or
    /// invalid.
    pub fn load_table(&self) -> Result<LocationCodeTable, TableError> {
        match &self.location_codes_path {
            Some(path) => {
                log::info!("Loading location codes from {}", path.display());
                LocationCodeTable::load(path)
            }
            None => Ok(LocationCodeTable::default_table()),
        }
    }

    /// Loads the feature placeholder values.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError`] if the configured file is unreadable or
    /// invalid.
    pub fn load_feature_defaults(&self) -> Result<FeatureDefaults, ModelError> {
        match &self.feature_defaults_path {
            Some(path) => {
                log::info!("Loading feature defaults from {}", path.display());
                FeatureDefaults::load(path)
            }
            None => Ok(FeatureDefaults::default()),
        }
    }

    /// Loads every resource and assembles the pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the table, defaults, or model fail to
    /// load, or the geocoder client cannot be built.
    pub fn build_pipeline(&self) -> Result<ClickPipeline, ConfigError> {
        let table = self.load_table()?;
        log::info!(
            "Using {} location code(s) with {} matching",
            table.len(),
            self.match_policy
        );
        if table.is_empty() {
            log::warn!("Location code table is empty; every click will be unmapped");
        }

        let defaults = self.load_feature_defaults()?;
        let model = TreeEnsemble::load(&self.model_path)?;

        log::info!(
            "Reverse geocoding via {} ({}, {}s timeout)",
            self.geocoder.name,
            self.geocoder.base_url,
            self.geocoder.timeout_secs
        );
        let geocoder = NominatimGeocoder::new(&self.geocoder)?;

        let resolver =
            LocationResolver::new(Arc::new(geocoder), Arc::new(table), self.match_policy);
        let invoker = PredictionInvoker::new(Arc::new(model), defaults);

        Ok(ClickPipeline::new(resolver, invoker))
    }
}
