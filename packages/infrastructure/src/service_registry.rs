//! Compile-time registry of road-graph service configurations.
//!
//! Each road-graph provider is defined in a TOML file under `services/`.
//! The registry embeds these at compile time and exposes them via
//! [`all_services`] and [`primary_service`].

use serde::Deserialize;

use crate::InfrastructureError;

/// A road-graph service configuration loaded from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct RoadGraphService {
    /// Unique identifier (e.g., `"overpass"`).
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
    /// Overpass QL interpreter.
    Overpass {
        /// Interpreter endpoint (e.g., `"https://overpass-api.de/api/interpreter"`).
        base_url: String,
        /// Search radius around the pinned coordinate in metres.
        #[serde(default = "default_radius_m")]
        radius_m: u32,
        /// Request timeout in seconds.
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },
}

const fn default_true() -> bool {
    true
}

const fn default_radius_m() -> u32 {
    crate::SEARCH_RADIUS_M
}

const fn default_timeout_secs() -> u64 {
    15
}

impl RoadGraphService {
    /// Returns the provider's base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        match &self.provider {
            ProviderConfig::Overpass { base_url, .. } => base_url,
        }
    }
}

const SERVICE_TOMLS: &[(&str, &str)] = &[("overpass", include_str!("../services/overpass.toml"))];

/// Returns all road-graph service configurations (enabled and disabled).
///
/// # Errors
///
/// Returns [`InfrastructureError::Config`] if an embedded TOML file is
/// malformed.
pub fn all_services() -> Result<Vec<RoadGraphService>, InfrastructureError> {
    SERVICE_TOMLS
        .iter()
        .map(|(name, toml_str)| {
            toml::de::from_str(toml_str).map_err(|e| InfrastructureError::Config {
                message: format!("Failed to parse road-graph service '{name}': {e}"),
            })
        })
        .collect()
}

/// Returns the enabled service with the lowest priority value.
///
/// # Errors
///
/// Returns [`InfrastructureError::Config`] if the configs are malformed
/// or every service is disabled.
pub fn primary_service() -> Result<RoadGraphService, InfrastructureError> {
    all_services()?
        .into_iter()
        .filter(|s| s.enabled)
        .min_by_key(|s| s.priority)
        .ok_or_else(|| InfrastructureError::Config {
            message: "No enabled road-graph service".to_string(),
        })
}
