//! Mapbox reverse geocoder client.
//!
//! See <https://docs.mapbox.com/api/search/geocoding-v5/#reverse-geocoding>

use std::time::Duration;

use async_trait::async_trait;
use nearmiss_map_report_models::LngLat;

use crate::service_registry::{GeocodingService, ProviderConfig};
use crate::{GeocodeError, ReverseGeocoder};

/// Reverse geocoder backed by the Mapbox places endpoint.
#[derive(Debug, Clone)]
pub struct MapboxGeocoder {
    client: reqwest::Client,
    base_url: String,
    access_token: String,
    types: String,
}

impl MapboxGeocoder {
    /// Creates a client with an explicit token. Requests that take longer
    /// than `timeout` fail with [`GeocodeError::Http`].
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Http`] if the HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        access_token: impl Into<String>,
        types: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GeocodeError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            access_token: access_token.into(),
            types: types.into(),
        })
    }

    /// Creates a client from a registry entry, reading the token from the
    /// environment variable the entry names.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::MissingToken`] if the variable is unset or
    /// empty.
    pub fn from_service(service: &GeocodingService) -> Result<Self, GeocodeError> {
        let ProviderConfig::Mapbox {
            base_url,
            token_env,
            types,
            timeout_secs,
        } = &service.provider;

        let token = std::env::var(token_env)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| GeocodeError::MissingToken {
                variable: token_env.clone(),
            })?;

        Self::new(
            base_url.clone(),
            token,
            types.clone(),
            Duration::from_secs(*timeout_secs),
        )
    }

    fn url(&self, point: LngLat) -> String {
        format!(
            "{}/{},{}.json",
            self.base_url.trim_end_matches('/'),
            point.lng,
            point.lat
        )
    }
}

#[async_trait]
impl ReverseGeocoder for MapboxGeocoder {
    async fn reverse(&self, point: LngLat) -> Result<Option<String>, GeocodeError> {
        let resp = self
            .client
            .get(self.url(point))
            .query(&[
                ("access_token", self.access_token.as_str()),
                ("types", self.types.as_str()),
            ])
            .send()
            .await?;

        let status = resp.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(GeocodeError::RateLimited);
        }
        if !status.is_success() {
            return Err(GeocodeError::Status {
                status: status.as_u16(),
            });
        }

        let body: serde_json::Value = resp.json().await?;
        parse_response(&body)
    }
}

/// Extracts the first feature's `place_name`.
///
/// # Errors
///
/// Returns [`GeocodeError::Parse`] if `features` is missing or not an
/// array.
pub fn parse_response(body: &serde_json::Value) -> Result<Option<String>, GeocodeError> {
    let features = body["features"]
        .as_array()
        .ok_or_else(|| GeocodeError::Parse {
            message: "Mapbox response has no features array".to_string(),
        })?;

    Ok(features
        .first()
        .and_then(|f| f["place_name"].as_str())
        .filter(|name| !name.is_empty())
        .map(String::from))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_places_longitude_first() {
        let geocoder = MapboxGeocoder::new(
            "https://api.mapbox.com/geocoding/v5/mapbox.places/",
            "tok",
            "address,poi",
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(
            geocoder.url(LngLat::new(144.9631, -37.8136)),
            "https://api.mapbox.com/geocoding/v5/mapbox.places/144.9631,-37.8136.json"
        );
    }

    #[tokio::test]
    async fn unresponsive_service_times_out_to_coordinate() {
        // Accepts connections into the backlog but never answers.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let geocoder = MapboxGeocoder::new(
            format!("http://{addr}"),
            "tok",
            "address,poi",
            Duration::from_millis(200),
        )
        .unwrap();
        let point = LngLat::new(144.96, -37.81);

        let err = geocoder.reverse(point).await.unwrap_err();
        assert!(matches!(&err, GeocodeError::Http(e) if e.is_timeout()), "{err}");

        let place = tokio::time::timeout(
            Duration::from_secs(5),
            crate::reverse_geocode_or_coordinate(&geocoder, point),
        )
        .await
        .expect("timeout must fall through to the coordinate");
        assert_eq!(place, "-37.81000, 144.96000");
        drop(listener);
    }

    #[test]
    fn parses_first_place_name() {
        let body = serde_json::json!({
            "type": "FeatureCollection",
            "features": [
                { "place_name": "12 Smith Street, Fitzroy Victoria 3065, Australia" },
                { "place_name": "Fitzroy, Victoria, Australia" }
            ]
        });
        assert_eq!(
            parse_response(&body).unwrap().as_deref(),
            Some("12 Smith Street, Fitzroy Victoria 3065, Australia")
        );
    }

    #[test]
    fn empty_features_is_none() {
        let body = serde_json::json!({ "features": [] });
        assert!(parse_response(&body).unwrap().is_none());
    }

    #[test]
    fn missing_features_is_parse_error() {
        let body = serde_json::json!({ "message": "Not Authorized - Invalid Token" });
        assert!(matches!(
            parse_response(&body),
            Err(GeocodeError::Parse { .. })
        ));
    }
}
