#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Reverse geocoding for report locations.
//!
//! Turns a pinned coordinate into a human-readable road name. Providers
//! are configured via TOML files in `services/` (see
//! [`service_registry`]); the access token comes from the environment.
//!
//! Reverse geocoding is enrichment only. [`reverse_geocode_or_coordinate`]
//! always produces a string, falling back to the formatted coordinate.

pub mod mapbox;
pub mod service_registry;

use async_trait::async_trait;
use nearmiss_map_report_models::LngLat;
use thiserror::Error;

pub use mapbox::MapboxGeocoder;

/// Errors from reverse geocoding operations.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("Geocoding service returned HTTP {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },

    /// Response parsing failed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },

    /// Rate limit exceeded.
    #[error("Rate limit exceeded")]
    RateLimited,

    /// The access token environment variable is unset.
    #[error("Environment variable {variable} is not set")]
    MissingToken {
        /// Name of the variable.
        variable: String,
    },

    /// Service configuration is invalid.
    #[error("Config error: {message}")]
    Config {
        /// Description of the configuration problem.
        message: String,
    },
}

/// Resolves a coordinate to a place name.
#[async_trait]
pub trait ReverseGeocoder: Send + Sync {
    /// Returns the best place name for `point`, or `None` if the service
    /// has no result.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] on transport or parse failure.
    async fn reverse(&self, point: LngLat) -> Result<Option<String>, GeocodeError>;
}

/// Formats a coordinate as `"{lat}, {lng}"` to five decimal places.
#[must_use]
pub fn format_coordinate(point: LngLat) -> String {
    format!("{:.5}, {:.5}", point.lat, point.lng)
}

/// Reverse geocodes `point`, falling back to [`format_coordinate`] when
/// the service has no result or fails. Failures are logged at warn level.
pub async fn reverse_geocode_or_coordinate(geocoder: &dyn ReverseGeocoder, point: LngLat) -> String {
    match geocoder.reverse(point).await {
        Ok(Some(name)) => name,
        Ok(None) => {
            log::debug!("No reverse geocode result at {}", format_coordinate(point));
            format_coordinate(point)
        }
        Err(e) => {
            log::warn!(
                "Reverse geocode failed at {}: {e}",
                format_coordinate(point)
            );
            format_coordinate(point)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedGeocoder(Result<Option<String>, ()>);

    #[async_trait]
    impl ReverseGeocoder for FixedGeocoder {
        async fn reverse(&self, _point: LngLat) -> Result<Option<String>, GeocodeError> {
            self.0.clone().map_err(|()| GeocodeError::RateLimited)
        }
    }

    #[test]
    fn formats_latitude_first_to_five_places() {
        assert_eq!(
            format_coordinate(LngLat::new(144.963_123_9, -37.813_6)),
            "-37.81360, 144.96312"
        );
    }

    #[tokio::test]
    async fn uses_place_name_when_found() {
        let g = FixedGeocoder(Ok(Some("Swanston St, Melbourne".to_string())));
        assert_eq!(
            reverse_geocode_or_coordinate(&g, LngLat::new(144.96, -37.81)).await,
            "Swanston St, Melbourne"
        );
    }

    #[tokio::test]
    async fn falls_back_to_coordinate() {
        let point = LngLat::new(144.96, -37.81);
        let none = FixedGeocoder(Ok(None));
        let failed = FixedGeocoder(Err(()));
        assert_eq!(
            reverse_geocode_or_coordinate(&none, point).await,
            "-37.81000, 144.96000"
        );
        assert_eq!(
            reverse_geocode_or_coordinate(&failed, point).await,
            "-37.81000, 144.96000"
        );
    }
}
