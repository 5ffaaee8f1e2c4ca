#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Road-graph way and infrastructure descriptor types.
//!
//! A [`Way`] is the raw shape returned by the road-graph service (an
//! `OpenStreetMap` way with its tag dictionary and vertex list). An
//! [`InfrastructureDescriptor`] is the normalized summary derived from the
//! nearest way to a pinned coordinate. Descriptors are frozen once they
//! are attached to a report.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Raw `OpenStreetMap` tag dictionary (`highway`, `cycleway:left`, ...).
pub type Tags = BTreeMap<String, String>;

/// A single vertex of a way's geometry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WayNode {
    /// Latitude (WGS84).
    pub lat: f64,
    /// Longitude (WGS84).
    pub lon: f64,
}

/// A tagged path segment returned by the road-graph service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Way {
    /// `OpenStreetMap` way ID.
    pub id: i64,
    /// Tag dictionary. Missing in the payload means no tags.
    #[serde(default)]
    pub tags: Tags,
    /// Ordered vertex list. Ways with fewer than two vertices can never be
    /// the nearest way.
    #[serde(default)]
    pub geometry: Vec<WayNode>,
}

impl Way {
    /// Returns the value of `key`, treating empty strings as absent.
    #[must_use]
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }
}

/// Normalized bike infrastructure class for a way.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum BikeInfrastructure {
    /// `highway=cycleway`
    #[serde(rename = "Dedicated Bike Path")]
    #[strum(serialize = "Dedicated Bike Path")]
    DedicatedBikePath,
    /// Footway or path where bicycles are designated or allowed
    #[serde(rename = "Shared Use Path")]
    #[strum(serialize = "Shared Use Path")]
    SharedUsePath,
    /// `cycleway=track` or `cycleway=separate`
    #[serde(rename = "Protected Bike Lane")]
    #[strum(serialize = "Protected Bike Lane")]
    ProtectedBikeLane,
    /// `cycleway=lane`
    #[serde(rename = "Painted Bike Lane")]
    #[strum(serialize = "Painted Bike Lane")]
    PaintedBikeLane,
    /// `cycleway=shared_lane`
    #[serde(rename = "Sharrow")]
    #[strum(serialize = "Sharrow")]
    Sharrow,
    /// `cycleway=share_busway`
    #[serde(rename = "Shared Bus Lane")]
    #[strum(serialize = "Shared Bus Lane")]
    SharedBusLane,
    /// A drivable road with no cycle tagging
    #[serde(rename = "No Bike Lane")]
    #[strum(serialize = "No Bike Lane")]
    NoBikeLane,
}

/// How cyclist-friendly a [`BikeInfrastructure`] class is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum InfrastructureRating {
    /// Physically separated or dedicated space.
    Good,
    /// Some provision, shared with or adjacent to traffic.
    Caution,
    /// No provision at all.
    Poor,
}

impl BikeInfrastructure {
    /// Returns the display label (same as [`Display`](std::fmt::Display)).
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::DedicatedBikePath => "Dedicated Bike Path",
            Self::SharedUsePath => "Shared Use Path",
            Self::ProtectedBikeLane => "Protected Bike Lane",
            Self::PaintedBikeLane => "Painted Bike Lane",
            Self::Sharrow => "Sharrow",
            Self::SharedBusLane => "Shared Bus Lane",
            Self::NoBikeLane => "No Bike Lane",
        }
    }

    /// Returns the quality rating used to color popup pills.
    #[must_use]
    pub const fn rating(self) -> InfrastructureRating {
        match self {
            Self::DedicatedBikePath | Self::ProtectedBikeLane | Self::SharedUsePath => {
                InfrastructureRating::Good
            }
            Self::NoBikeLane => InfrastructureRating::Poor,
            Self::PaintedBikeLane | Self::Sharrow | Self::SharedBusLane => {
                InfrastructureRating::Caution
            }
        }
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::DedicatedBikePath,
            Self::SharedUsePath,
            Self::ProtectedBikeLane,
            Self::PaintedBikeLane,
            Self::Sharrow,
            Self::SharedBusLane,
            Self::NoBikeLane,
        ]
    }
}

/// A numeric tag value that may not actually be numeric.
///
/// `maxspeed=50` becomes `Number(50)`; `maxspeed=signals` stays
/// `Raw("signals")` rather than being discarded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TagValue {
    /// Leading integer digits parsed from the tag.
    Number(u32),
    /// The raw tag value when no leading digits were found.
    Raw(String),
}

impl std::fmt::Display for TagValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Raw(s) => f.write_str(s),
        }
    }
}

/// Tri-state street lighting from the `lit` tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LitState {
    /// `lit=yes`
    Yes,
    /// `lit=no`
    No,
    /// Any other value (`24/7`, `automatic`, `sunset-sunrise`, ...).
    Other(String),
}

impl LitState {
    /// Returns the popup label (`"Street Lit"`, `"Unlit"`, or the raw value).
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Yes => "Street Lit",
            Self::No => "Unlit",
            Self::Other(raw) => raw,
        }
    }
}

impl From<String> for LitState {
    fn from(value: String) -> Self {
        match value.as_str() {
            "yes" => Self::Yes,
            "no" => Self::No,
            _ => Self::Other(value),
        }
    }
}

impl From<LitState> for String {
    fn from(value: LitState) -> Self {
        match value {
            LitState::Yes => "yes".to_string(),
            LitState::No => "no".to_string(),
            LitState::Other(raw) => raw,
        }
    }
}

/// Road and bike infrastructure attributes of the way nearest to a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfrastructureDescriptor {
    /// ID of the nearest way at query time.
    pub osm_way_id: i64,
    /// Street name (`name` tag).
    pub name: Option<String>,
    /// Raw `highway` tag value.
    pub road_type: Option<String>,
    /// Human-readable road type.
    pub road_type_label: String,
    /// Speed limit in km/h, or the raw `maxspeed` value.
    pub speed_limit: Option<TagValue>,
    /// Bike infrastructure class, `None` when unknown.
    pub bike_infrastructure: Option<BikeInfrastructure>,
    /// Lane count, or the raw `lanes` value.
    pub lanes: Option<TagValue>,
    /// Street lighting.
    pub lit: Option<LitState>,
    /// Human-readable surface label.
    pub surface: Option<String>,
    /// Whether traffic flows one way.
    pub one_way: Option<bool>,
    /// Raw `sidewalk` tag value.
    pub sidewalk: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bike_infrastructure_serializes_as_label() {
        for infra in BikeInfrastructure::all() {
            let json = serde_json::to_value(infra).unwrap();
            assert_eq!(json, serde_json::json!(infra.label()));
            assert_eq!(infra.to_string(), infra.label());
        }
    }

    #[test]
    fn tag_value_untagged_json() {
        assert_eq!(
            serde_json::to_value(TagValue::Number(50)).unwrap(),
            serde_json::json!(50)
        );
        assert_eq!(
            serde_json::from_value::<TagValue>(serde_json::json!("signals")).unwrap(),
            TagValue::Raw("signals".to_string())
        );
    }

    #[test]
    fn lit_state_labels() {
        assert_eq!(LitState::from("yes".to_string()).label(), "Street Lit");
        assert_eq!(LitState::from("no".to_string()).label(), "Unlit");
        assert_eq!(LitState::from("24/7".to_string()).label(), "24/7");
    }

    #[test]
    fn way_tag_ignores_empty_values() {
        let mut tags = Tags::new();
        tags.insert("cycleway".to_string(), String::new());
        tags.insert("highway".to_string(), "residential".to_string());
        let way = Way {
            id: 1,
            tags,
            geometry: Vec::new(),
        };
        assert_eq!(way.tag("cycleway"), None);
        assert_eq!(way.tag("highway"), Some("residential"));
    }

    #[test]
    fn way_deserializes_without_tags() {
        let way: Way = serde_json::from_value(serde_json::json!({
            "type": "way",
            "id": 42,
            "geometry": [{ "lat": -37.81, "lon": 144.96 }]
        }))
        .unwrap();
        assert_eq!(way.id, 42);
        assert!(way.tags.is_empty());
        assert_eq!(way.geometry.len(), 1);
    }
}
