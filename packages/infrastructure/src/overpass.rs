//! Overpass API road-graph client.
//!
//! Sends one Overpass QL query per lookup asking for every `highway`-tagged
//! way within the configured radius, with full geometry inlined so no
//! follow-up node lookups are needed.
//!
//! See <https://wiki.openstreetmap.org/wiki/Overpass_API/Overpass_QL>

use std::time::Duration;

use async_trait::async_trait;
use nearmiss_map_infrastructure_models::Way;
use nearmiss_map_report_models::LngLat;
use serde::Deserialize;

use crate::service_registry::{ProviderConfig, RoadGraphService};
use crate::{InfrastructureError, RoadGraph};

/// Road-graph client backed by an Overpass QL interpreter.
#[derive(Debug, Clone)]
pub struct OverpassClient {
    client: reqwest::Client,
    base_url: String,
    radius_m: u32,
}

impl OverpassClient {
    /// Creates a client for the interpreter at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`InfrastructureError::Http`] if the HTTP client cannot be
    /// built.
    pub fn new(
        base_url: impl Into<String>,
        radius_m: u32,
        timeout: Duration,
    ) -> Result<Self, InfrastructureError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            radius_m,
        })
    }

    /// Creates a client from a registry entry.
    ///
    /// # Errors
    ///
    /// Returns [`InfrastructureError::Http`] if the HTTP client cannot be
    /// built.
    pub fn from_service(service: &RoadGraphService) -> Result<Self, InfrastructureError> {
        match &service.provider {
            ProviderConfig::Overpass {
                base_url,
                radius_m,
                timeout_secs,
            } => Self::new(
                base_url.clone(),
                *radius_m,
                Duration::from_secs(*timeout_secs),
            ),
        }
    }

    /// Search radius in metres.
    #[must_use]
    pub const fn radius_m(&self) -> u32 {
        self.radius_m
    }
}

#[async_trait]
impl RoadGraph for OverpassClient {
    async fn ways_near(&self, point: LngLat) -> Result<Vec<Way>, InfrastructureError> {
        let query = build_query(point, self.radius_m);
        log::debug!("Overpass query: {query}");

        let resp = self
            .client
            .post(&self.base_url)
            .form(&[("data", query.as_str())])
            .send()
            .await?;

        let status = resp.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(InfrastructureError::RateLimited);
        }
        if !status.is_success() {
            return Err(InfrastructureError::Status {
                status: status.as_u16(),
            });
        }

        let body: serde_json::Value = resp.json().await?;
        parse_response(body)
    }
}

/// Builds the Overpass QL query for `highway` ways around `point`.
#[must_use]
pub fn build_query(point: LngLat, radius_m: u32) -> String {
    format!(
        "[out:json];way(around:{radius_m},{},{})[\"highway\"];out geom;",
        point.lat, point.lng
    )
}

#[derive(Deserialize)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<serde_json::Value>,
}

/// Extracts the ways from an Overpass JSON response.
///
/// Non-way elements are ignored.
///
/// # Errors
///
/// Returns [`InfrastructureError::Parse`] if the body or a way element
/// has the wrong shape.
pub fn parse_response(body: serde_json::Value) -> Result<Vec<Way>, InfrastructureError> {
    let response: OverpassResponse =
        serde_json::from_value(body).map_err(|e| InfrastructureError::Parse {
            message: format!("Overpass response: {e}"),
        })?;

    response
        .elements
        .into_iter()
        .filter(|el| el.get("type").and_then(serde_json::Value::as_str) == Some("way"))
        .map(|el| {
            serde_json::from_value(el).map_err(|e| InfrastructureError::Parse {
                message: format!("Overpass way: {e}"),
            })
        })
        .collect()
}
