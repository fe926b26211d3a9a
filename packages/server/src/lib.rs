#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for map-click crime predictions.
//!
//! The map frontend posts each click to `/api/predict`; the server runs
//! it through the [`ClickPipeline`] (reverse geocode, location code
//! lookup, model) and returns the outcome along with display lines.
//! The pipeline is built once at startup and shared read-only by all
//! workers.

mod handlers;
pub mod interactive;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use crime_predict_pipeline::ClickPipeline;
use crime_predict_pipeline::config::{AppConfig, ConfigError};

/// Shared application state.
pub struct AppState {
    /// Click handler with its loaded table, model, and geocoder.
    pub pipeline: ClickPipeline,
}

/// Where the server listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerOptions {
    /// Bind address.
    pub bind_addr: String,
    /// TCP port.
    pub port: u16,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl ServerOptions {
    /// Reads `BIND_ADDR` and `PORT`, falling back to `127.0.0.1:8080`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if `PORT` is not a valid
    /// port number.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the options through `lookup`, treating empty values as unset.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if `PORT` is not a valid
    /// port number.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let port = match get("PORT") {
            Some(value) => value
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidValue { name: "PORT", value })?,
            None => defaults.port,
        };

        Ok(Self {
            bind_addr: get("BIND_ADDR").map_or(defaults.bind_addr, |v| v.trim().to_string()),
            port,
        })
    }
}

/// Registers the `/api` routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health))
            .route("/location-codes", web::get().to(handlers::location_codes))
            .route("/predict", web::post().to(handlers::predict)),
    );
}

/// Starts the crime prediction API server.
///
/// Reads the pipeline configuration from the environment, loads the
/// location code table and model, and starts the Actix-Web HTTP server.
/// The caller provides the async runtime (e.g. via `#[actix_web::main]`)
/// and initialises logging.
///
/// # Errors
///
/// Returns an `std::io::Result` error if the configuration is invalid,
/// the model or table fail to load, or the HTTP server fails to bind or
/// encounters a runtime error.
#[allow(clippy::future_not_send)]
pub async fn run_server(options: ServerOptions) -> std::io::Result<()> {
    log::info!("Loading prediction pipeline...");
    let pipeline = AppConfig::from_env()
        .and_then(|config| config.build_pipeline())
        .map_err(|e| {
            log::error!("Failed to build prediction pipeline: {e}");
            std::io::Error::other(e)
        })?;

    let state = web::Data::new(AppState { pipeline });

    let ServerOptions { bind_addr, port } = options;
    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((bind_addr, port))?
    .run()
    .await
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: BTreeMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn options_default_when_unset_or_empty() {
        assert_eq!(
            ServerOptions::from_lookup(lookup(&[])).unwrap(),
            ServerOptions::default()
        );
        assert_eq!(
            ServerOptions::from_lookup(lookup(&[("BIND_ADDR", ""), ("PORT", "  ")])).unwrap(),
            ServerOptions::default()
        );
    }

    #[test]
    fn options_read_bind_addr_and_port() {
        let options =
            ServerOptions::from_lookup(lookup(&[("BIND_ADDR", "0.0.0.0"), ("PORT", "9000")]))
                .unwrap();
        assert_eq!(options.bind_addr, "0.0.0.0");
        assert_eq!(options.port, 9000);
    }

    #[test]
    fn options_reject_invalid_port() {
        let err = ServerOptions::from_lookup(lookup(&[("PORT", "80800")])).unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidValue { name: "PORT", ref value } if value == "80800"),
            "got {err}"
        );
    }
}
