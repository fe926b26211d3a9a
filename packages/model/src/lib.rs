#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Feature records and the pre-trained crime likelihood model.
//!
//! The model is treated as an opaque function from a ten-field
//! [`FeatureRecord`] to a score, behind the [`CrimeModel`] trait. The
//! bundled implementation is [`tree::TreeEnsemble`], which evaluates a
//! gradient-boosted tree dump exported from the training pipeline.

pub mod features;
pub mod tree;

use std::path::PathBuf;

use thiserror::Error;

pub use features::{FeatureDefaults, FeatureOverrides, FeatureRecord, TemporalMode, FEATURE_NAMES};

/// Errors from loading or evaluating a model.
#[derive(Debug, Error)]
pub enum ModelError {
    /// The model or defaults file could not be read.
    #[error("I/O error reading {}: {source}", path.display())]
    Io {
        /// File that failed to read.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The model file is not valid JSON for a tree ensemble.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The feature defaults file is not valid TOML.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A split references a feature the record does not have.
    #[error("Tree {tree} splits on unknown feature '{feature}'")]
    UnknownFeature {
        /// Index of the offending tree.
        tree: usize,
        /// The unknown feature name.
        feature: String,
    },

    /// A tree is structurally invalid (missing or repeated node ids,
    /// unreachable leaves, cycles).
    #[error("Malformed tree {tree}: {message}")]
    MalformedTree {
        /// Index of the offending tree.
        tree: usize,
        /// Description of the problem.
        message: String,
    },

    /// The configured base score cannot be used with the objective.
    #[error("Invalid base score {base_score} for objective {objective}")]
    InvalidBaseScore {
        /// The configured base score.
        base_score: f64,
        /// The model objective.
        objective: String,
    },

    /// Evaluation produced a NaN or infinite score.
    #[error("Model produced a non-finite score")]
    NonFiniteScore,
}

/// A pre-trained model scoring a single feature record.
///
/// Models are loaded once at startup and shared read-only between
/// requests.
pub trait CrimeModel: Send + Sync {
    /// Scores `record`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError`] if the model cannot evaluate the record.
    fn predict(&self, record: &FeatureRecord) -> Result<f64, ModelError>;
}
