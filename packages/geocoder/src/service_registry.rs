//! Compile-time registry of reverse geocoding service configurations.
//!
//! Each service is defined in a TOML file under `services/`. The registry
//! embeds these at compile time and exposes them via [`all_services`] and
//! [`service`]. Deployments override individual fields at startup with
//! [`GeocodingService::with_overrides`].

use std::time::Duration;

use serde::Deserialize;

/// A reverse geocoding service configuration loaded from TOML.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GeocodingService {
    /// Unique identifier (e.g., `"nominatim"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Reverse endpoint URL
    /// (e.g., `"https://nominatim.openstreetmap.org/reverse"`).
    pub base_url: String,
    /// `User-Agent` sent with every request. The public Nominatim
    /// instance rejects requests without an identifying agent.
    pub user_agent: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Address detail level (Nominatim `zoom`; 18 is building level).
    #[serde(default = "default_zoom")]
    pub zoom: u8,
}

const fn default_timeout_secs() -> u64 {
    10
}

const fn default_zoom() -> u8 {
    18
}

/// Field overrides applied on top of an embedded service definition.
#[derive(Debug, Clone, Default)]
pub struct ServiceOverrides {
    /// Replacement endpoint URL.
    pub base_url: Option<String>,
    /// Replacement `User-Agent`.
    pub user_agent: Option<String>,
    /// Replacement timeout in seconds.
    pub timeout_secs: Option<u64>,
}

impl GeocodingService {
    /// The per-request timeout as a [`Duration`].
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Returns a copy with any provided overrides applied.
    #[must_use]
    pub fn with_overrides(mut self, overrides: ServiceOverrides) -> Self {
        if let Some(base_url) = overrides.base_url {
            self.base_url = base_url;
        }
        if let Some(user_agent) = overrides.user_agent {
            self.user_agent = user_agent;
        }
        if let Some(timeout_secs) = overrides.timeout_secs {
            self.timeout_secs = timeout_secs;
        }
        self
    }
}

// ── Compile-time embedded TOML files ────────────────────────────────

const SERVICE_TOMLS: &[(&str, &str)] = &[("nominatim", include_str!("../services/nominatim.toml"))];

/// Identifier of the service used when none is configured.
pub const DEFAULT_SERVICE_ID: &str = "nominatim";

/// Returns all reverse geocoding service configurations.
///
/// # Panics
///
/// Panics if any TOML config is malformed (this is a compile-time guarantee
/// since the configs are embedded).
#[must_use]
pub fn all_services() -> Vec<GeocodingService> {
    SERVICE_TOMLS
        .iter()
        .map(|(name, toml_str)| {
            toml::de::from_str(toml_str)
                .unwrap_or_else(|e| panic!("Failed to parse geocoding service '{name}': {e}"))
        })
        .collect()
}

/// Returns the service with the given identifier.
#[must_use]
pub fn service(id: &str) -> Option<GeocodingService> {
    all_services().into_iter().find(|s| s.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn loads_all_services() {
        assert_eq!(all_services().len(), SERVICE_TOMLS.len());
    }

    #[test]
    fn service_ids_are_unique() {
        let services = all_services();
        let mut seen = BTreeSet::new();
        for svc in &services {
            assert!(seen.insert(&svc.id), "Duplicate service ID: {}", svc.id);
        }
    }

    #[test]
    fn default_service_uses_ten_second_timeout() {
        let svc = service(DEFAULT_SERVICE_ID).unwrap();
        assert_eq!(svc.timeout(), Duration::from_secs(10));
        assert!(!svc.base_url.is_empty());
        assert!(!svc.user_agent.is_empty());
    }

    #[test]
    fn overrides_replace_only_provided_fields() {
        let svc = service(DEFAULT_SERVICE_ID)
            .unwrap()
            .with_overrides(ServiceOverrides {
                base_url: Some("http://localhost:8088/reverse".to_string()),
                user_agent: None,
                timeout_secs: Some(2),
            });
        assert_eq!(svc.base_url, "http://localhost:8088/reverse");
        assert_eq!(svc.user_agent, "crime_predict");
        assert_eq!(svc.timeout_secs, 2);
    }
}
