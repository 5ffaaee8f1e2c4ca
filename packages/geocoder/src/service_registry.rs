//! Compile-time registry of reverse geocoding service configurations.
//!
//! Each provider is defined in a TOML file under `services/`. Secrets are
//! never stored in the TOML; a provider names the environment variable
//! holding its token instead.

use serde::Deserialize;

use crate::GeocodeError;

/// A reverse geocoding service configuration loaded from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct GeocodingService {
    /// Unique identifier (e.g., `"mapbox"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Whether this service may be queried.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Preference order, lower values first.
    pub priority: u32,
    /// Provider-specific configuration.
    pub provider: ProviderConfig,
}

/// Provider-specific configuration, tagged by `type` in TOML.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Mapbox Geocoding v5 places endpoint.
    Mapbox {
        /// Endpoint prefix; `/{lng},{lat}.json` is appended.
        base_url: String,
        /// Environment variable holding the access token.
        token_env: String,
        /// Feature types to request (e.g., `"address,poi"`).
        types: String,
        /// Per-request timeout in seconds.
        timeout_secs: u64,
    },
}

const fn default_true() -> bool {
    true
}

impl GeocodingService {
    /// Returns the provider's base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        match &self.provider {
            ProviderConfig::Mapbox { base_url, .. } => base_url,
        }
    }
}

const SERVICE_TOMLS: &[(&str, &str)] = &[("mapbox", include_str!("../services/mapbox.toml"))];

/// Returns all reverse geocoding service configurations.
///
/// # Errors
///
/// Returns [`GeocodeError::Config`] if an embedded TOML file is malformed.
pub fn all_services() -> Result<Vec<GeocodingService>, GeocodeError> {
    SERVICE_TOMLS
        .iter()
        .map(|(name, toml_str)| {
            toml::de::from_str(toml_str).map_err(|e| GeocodeError::Config {
                message: format!("Failed to parse geocoding service '{name}': {e}"),
            })
        })
        .collect()
}

/// Returns only enabled services, sorted by priority (ascending).
///
/// # Errors
///
/// Returns [`GeocodeError::Config`] if an embedded TOML file is malformed.
pub fn enabled_services() -> Result<Vec<GeocodingService>, GeocodeError> {
    let mut services: Vec<GeocodingService> =
        all_services()?.into_iter().filter(|s| s.enabled).collect();
    services.sort_by_key(|s| s.priority);
    Ok(services)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_all_services() {
        assert_eq!(all_services().unwrap().len(), SERVICE_TOMLS.len());
    }

    #[test]
    fn all_services_have_required_fields() {
        for svc in &all_services().unwrap() {
            assert!(!svc.id.is_empty(), "Service has empty id");
            assert!(!svc.name.is_empty(), "Service {} has empty name", svc.id);
            assert!(
                !svc.base_url().is_empty(),
                "Service {} has empty base_url",
                svc.id
            );
        }
    }

    #[test]
    fn mapbox_reads_token_from_environment() {
        let services = enabled_services().unwrap();
        let ProviderConfig::Mapbox {
            token_env,
            types,
            timeout_secs,
            ..
        } = &services[0].provider;
        assert_eq!(token_env, "MAPBOX_TOKEN");
        assert_eq!(types, "address,poi");
        assert!(*timeout_secs > 0);
    }
}
