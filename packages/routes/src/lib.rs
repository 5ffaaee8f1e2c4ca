#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Cycling route reconstruction.
//!
//! Route documents store their geometry as one or more independently
//! encoded polylines. Each segment becomes its own line feature so that
//! disconnected sub-paths are never joined by a straight line. Documents
//! without segments fall back to a single legacy `polyline`.

pub mod source;

use geo::LineString;
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};
use nearmiss_map_geometry::{decode_polyline, split_at_gaps};
use serde::{Deserialize, Serialize};

pub use source::{JsonFileRouteSource, RouteSource};

/// Errors that can occur while loading route documents.
#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    /// I/O error (file read).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One encoded sub-path of a route.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetySegment {
    /// Encoded polyline.
    #[serde(default)]
    pub p: Option<String>,
}

/// A stored route document. Every field is optional in storage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteDocument {
    /// Route name.
    #[serde(default)]
    pub name: Option<String>,
    /// Route type, e.g. `bicycle`.
    #[serde(default)]
    pub route_type: Option<String>,
    /// Network code, e.g. `lcn` or `rcn`.
    #[serde(default)]
    pub network: Option<String>,
    /// Free-form category.
    #[serde(default)]
    pub category: Option<String>,
    /// Total route length in metres.
    #[serde(default)]
    pub total_length_m: Option<f64>,
    /// Text shown on the route shield.
    #[serde(default)]
    pub shield_text: Option<String>,
    /// OSM `ref` tag.
    #[serde(default, rename = "ref")]
    pub reference: Option<String>,
    /// Per-way encoded segments. Takes precedence over [`Self::polyline`].
    #[serde(default)]
    pub safety_segments: Vec<SafetySegment>,
    /// Whole-route encoded polyline for documents without segments.
    #[serde(default)]
    pub polyline: Option<String>,
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|s| !s.is_empty())
}

/// Properties shared by every line feature of one route.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteProperties {
    /// Name, `"Unnamed"` when missing.
    pub name: String,
    /// Route type, empty when missing.
    pub route_type: String,
    /// Network, empty when missing.
    pub network: String,
    /// Category, empty when missing.
    pub category: String,
    /// Total length in metres, 0 when missing.
    #[serde(rename = "total_length_m")]
    pub total_length_m: f64,
    /// Shield text, else ref, else empty.
    pub short_code: String,
}

impl From<&RouteDocument> for RouteProperties {
    fn from(doc: &RouteDocument) -> Self {
        let text = |value: Option<&String>| non_empty(value).unwrap_or_default().to_string();
        Self {
            name: non_empty(doc.name.as_ref())
                .unwrap_or("Unnamed")
                .to_string(),
            route_type: text(doc.route_type.as_ref()),
            network: text(doc.network.as_ref()),
            category: text(doc.category.as_ref()),
            total_length_m: doc.total_length_m.unwrap_or(0.0),
            short_code: non_empty(doc.shield_text.as_ref())
                .or_else(|| non_empty(doc.reference.as_ref()))
                .unwrap_or_default()
                .to_string(),
        }
    }
}

/// A single line on the route layer.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteFeature {
    /// Parent route metadata.
    pub properties: RouteProperties,
    /// Line geometry, `x` = longitude.
    pub line: LineString<f64>,
}

impl RouteFeature {
    /// Converts to a GeoJSON line string feature.
    ///
    /// # Errors
    ///
    /// Returns [`serde_json::Error`] if the properties fail to serialize.
    pub fn to_geojson(&self) -> Result<Feature, serde_json::Error> {
        let properties: JsonObject = match serde_json::to_value(&self.properties)? {
            serde_json::Value::Object(map) => map,
            _ => JsonObject::new(),
        };
        let coordinates = self.line.coords().map(|c| vec![c.x, c.y]).collect();

        Ok(Feature {
            bbox: None,
            geometry: Some(Geometry::new(Value::LineString(coordinates))),
            id: None,
            properties: Some(properties),
            foreign_members: None,
        })
    }
}

/// Options for [`build_route_features`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RouteBuildOptions {
    /// When set, legacy polylines are split wherever consecutive points
    /// are further apart than this many kilometres.
    pub split_gaps_km: Option<f64>,
}

fn decode_line(encoded: &str, route: &str) -> Option<LineString<f64>> {
    match decode_polyline(encoded) {
        Ok(coords) => Some(LineString::new(coords)),
        Err(e) => {
            log::warn!("Skipping undecodable segment of route {route}: {e}");
            None
        }
    }
}

/// Rebuilds line features from route documents.
///
/// A document with segments yields one feature per non-empty segment that
/// decodes to at least two points; its legacy polyline is then ignored.
/// Otherwise the legacy polyline yields one feature (or one per gap-split
/// run) if it has at least two points.
#[must_use]
pub fn build_route_features(
    documents: &[RouteDocument],
    options: &RouteBuildOptions,
) -> Vec<RouteFeature> {
    let mut features = Vec::new();

    for doc in documents {
        let properties = RouteProperties::from(doc);
        let mut push = |line: LineString<f64>| {
            if line.0.len() >= 2 {
                features.push(RouteFeature {
                    properties: properties.clone(),
                    line,
                });
            }
        };

        if doc.safety_segments.is_empty() {
            let Some(encoded) = non_empty(doc.polyline.as_ref()) else {
                continue;
            };
            let Some(line) = decode_line(encoded, &properties.name) else {
                continue;
            };
            match options.split_gaps_km {
                Some(max_gap_km) => split_at_gaps(&line.0, max_gap_km)
                    .into_iter()
                    .for_each(&mut push),
                None => push(line),
            }
        } else {
            doc.safety_segments
                .iter()
                .filter_map(|segment| non_empty(segment.p.as_ref()))
                .filter_map(|encoded| decode_line(encoded, &properties.name))
                .for_each(&mut push);
        }
    }

    features
}

/// Wraps route features in a collection for the line layer.
///
/// # Errors
///
/// Returns [`serde_json::Error`] if any feature's properties fail to
/// serialize.
pub fn to_feature_collection(features: &[RouteFeature]) -> Result<FeatureCollection, serde_json::Error> {
    Ok(FeatureCollection {
        bbox: None,
        features: features
            .iter()
            .map(RouteFeature::to_geojson)
            .collect::<Result<_, _>>()?,
        foreign_members: None,
    })
}

/// Loads every document from `source` and rebuilds its features.
///
/// # Errors
///
/// Returns [`RouteError`] if the source fails to load.
pub async fn load_route_features(
    source: &dyn RouteSource,
    options: &RouteBuildOptions,
) -> Result<Vec<RouteFeature>, RouteError> {
    let documents = source.load_routes().await?;
    let features = build_route_features(&documents, options);
    log::info!(
        "Loaded {} cycling route segments from {} routes",
        features.len(),
        documents.len()
    );
    Ok(features)
}
