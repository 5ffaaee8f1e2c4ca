#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Road and bike infrastructure lookup for a pinned coordinate.
//!
//! Asks a [`RoadGraph`] for the `highway`-tagged ways near the pin, picks
//! the way whose closest segment is nearest, and normalizes its tags into
//! an [`InfrastructureDescriptor`]. Lookup is best-effort enrichment:
//! [`resolve_infrastructure`] never fails, it returns `None` and logs.
//!
//! The road-graph endpoint is configured by TOML files in `services/`
//! (see [`service_registry`]).

pub mod overpass;
pub mod service_registry;
pub mod tags;

use async_trait::async_trait;
use geo::Coord;
use nearmiss_map_geometry::nearest_way_distance;
use nearmiss_map_infrastructure_models::{InfrastructureDescriptor, Way};
use nearmiss_map_report_models::LngLat;
use thiserror::Error;

pub use overpass::OverpassClient;
pub use tags::{classify_bike_infrastructure, describe_way};

/// Default search radius around a pin in metres.
pub const SEARCH_RADIUS_M: u32 = 25;

/// Errors from road-graph queries.
#[derive(Debug, Error)]
pub enum InfrastructureError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("Road-graph service returned HTTP {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },

    /// Rate limit exceeded.
    #[error("Rate limit exceeded")]
    RateLimited,

    /// Response parsing failed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },

    /// Service configuration is invalid.
    #[error("Config error: {message}")]
    Config {
        /// Description of the configuration problem.
        message: String,
    },
}

/// Source of tagged ways near a coordinate.
#[async_trait]
pub trait RoadGraph: Send + Sync {
    /// Returns every `highway`-tagged way within the graph's search radius
    /// of `point`, with full geometry.
    ///
    /// # Errors
    ///
    /// Returns [`InfrastructureError`] on transport or parse failure.
    async fn ways_near(&self, point: LngLat) -> Result<Vec<Way>, InfrastructureError>;
}

fn way_vertices(way: &Way) -> Vec<Coord<f64>> {
    way.geometry
        .iter()
        .map(|n| Coord { x: n.lon, y: n.lat })
        .collect()
}

/// Picks the way whose closest segment is nearest to `point`.
///
/// Ties keep the service's order. Ways with fewer than two vertices rank
/// last.
#[must_use]
pub fn select_nearest_way(point: LngLat, ways: &[Way]) -> Option<&Way> {
    let origin = Coord::from(point);
    let mut ranked: Vec<(f64, &Way)> = ways
        .iter()
        .map(|w| (nearest_way_distance(origin, &way_vertices(w)), w))
        .collect();
    ranked.sort_by(|a, b| a.0.total_cmp(&b.0));
    ranked.first().map(|(_, w)| *w)
}

/// Describes the infrastructure nearest to `point`.
///
/// Returns `None` when no way is within range or the lookup fails. Failures
/// are logged at warn level and never propagated.
pub async fn resolve_infrastructure(
    graph: &dyn RoadGraph,
    point: LngLat,
) -> Option<InfrastructureDescriptor> {
    let ways = match graph.ways_near(point).await {
        Ok(ways) => ways,
        Err(e) => {
            log::warn!(
                "Infrastructure lookup failed at ({}, {}): {e}",
                point.lat,
                point.lng
            );
            return None;
        }
    };

    log::debug!(
        "{} candidate ways near ({}, {})",
        ways.len(),
        point.lat,
        point.lng
    );

    select_nearest_way(point, &ways).map(describe_way)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nearmiss_map_geometry::METRES_PER_DEGREE;
    use nearmiss_map_infrastructure_models::{BikeInfrastructure, Tags, WayNode};

    struct FakeGraph(Result<Vec<Way>, ()>);

    #[async_trait]
    impl RoadGraph for FakeGraph {
        async fn ways_near(&self, _point: LngLat) -> Result<Vec<Way>, InfrastructureError> {
            self.0.clone().map_err(|()| InfrastructureError::RateLimited)
        }
    }

    /// East-west way at `metres` north of the equator origin.
    fn way_at(id: i64, metres: f64, highway: &str) -> Way {
        let lat = metres / METRES_PER_DEGREE;
        let mut tags = Tags::new();
        tags.insert("highway".to_string(), highway.to_string());
        Way {
            id,
            tags,
            geometry: vec![
                WayNode { lat, lon: -0.001 },
                WayNode { lat, lon: 0.001 },
            ],
        }
    }

    #[test]
    fn nearest_way_wins_regardless_of_order() {
        let origin = LngLat::new(0.0, 0.0);
        let ways = vec![way_at(15, 15.0, "primary"), way_at(5, 5.0, "cycleway")];
        assert_eq!(select_nearest_way(origin, &ways).unwrap().id, 5);
    }

    #[test]
    fn degenerate_ways_rank_last() {
        let origin = LngLat::new(0.0, 0.0);
        let mut point_only = way_at(1, 0.0, "service");
        point_only.geometry.truncate(1);
        let ways = vec![point_only, way_at(2, 20.0, "residential")];
        assert_eq!(select_nearest_way(origin, &ways).unwrap().id, 2);
    }

    #[tokio::test]
    async fn resolves_descriptor_for_nearest_way() {
        let graph = FakeGraph(Ok(vec![
            way_at(15, 15.0, "primary"),
            way_at(5, 5.0, "cycleway"),
        ]));
        let d = resolve_infrastructure(&graph, LngLat::new(0.0, 0.0))
            .await
            .unwrap();
        assert_eq!(d.osm_way_id, 5);
        assert_eq!(d.road_type_label, "Bike Path");
        assert_eq!(
            d.bike_infrastructure,
            Some(BikeInfrastructure::DedicatedBikePath)
        );
    }

    #[tokio::test]
    async fn no_candidates_is_none() {
        let graph = FakeGraph(Ok(Vec::new()));
        assert!(
            resolve_infrastructure(&graph, LngLat::new(0.0, 0.0))
                .await
                .is_none()
        );
    }

    #[tokio::test]
    async fn service_failure_is_none() {
        let graph = FakeGraph(Err(()));
        assert!(
            resolve_infrastructure(&graph, LngLat::new(0.0, 0.0))
                .await
                .is_none()
        );
    }
}
