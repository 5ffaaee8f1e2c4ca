//! Typed render features and their GeoJSON form.
//!
//! Features stay typed until they are handed to a render surface, where
//! [`ReportFeature::to_geojson`] flattens them into a property bag. Nested
//! values (category lists, infrastructure) are written as JSON values, not
//! embedded strings.

use chrono::{DateTime, Utc};
use geojson::{Feature, Geometry, JsonObject, Value, feature::Id};
use nearmiss_map_icons::{annoyance_icon_key, incident_icon_key};
use nearmiss_map_infrastructure_models::InfrastructureDescriptor;
use nearmiss_map_report_models::{
    Annoyance, AnnoyanceType, Incident, IncidentType, LngLat, ReportKind, Scariness,
};
use serde::Serialize;

/// One point on the report layer.
#[derive(Debug, Clone, PartialEq)]
pub enum ReportFeature {
    /// An incident marker.
    Incident(Incident),
    /// An annoyance marker.
    Annoyance(Annoyance),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IncidentProperties<'a> {
    id: &'a str,
    kind: ReportKind,
    icon: String,
    incident_type: IncidentType,
    incident_types: &'a [IncidentType],
    scariness: Scariness,
    contact_made: bool,
    injury_occurred: bool,
    other_party: Option<String>,
    description: &'a str,
    occurred_at: Option<DateTime<Utc>>,
    reported_at: DateTime<Utc>,
    road_name: &'a str,
    flagged: bool,
    flag_count: u32,
    upvote_count: u32,
    photo_refs: &'a [String],
    infrastructure: Option<&'a InfrastructureDescriptor>,
    reporter_name: &'a str,
}

impl<'a> From<&'a Incident> for IncidentProperties<'a> {
    fn from(r: &'a Incident) -> Self {
        Self {
            id: &r.id,
            kind: ReportKind::Incident,
            icon: incident_icon_key(r.incident_type, r.scariness),
            incident_type: r.incident_type,
            incident_types: r.categories(),
            scariness: r.scariness,
            contact_made: r.contact_made,
            injury_occurred: r.injury_occurred,
            other_party: r.other_party_label(),
            description: &r.description,
            occurred_at: r.occurred_at,
            reported_at: r.reported_at,
            road_name: &r.road_name,
            flagged: r.flagged,
            flag_count: r.flag_count,
            upvote_count: r.upvote_count,
            photo_refs: &r.photo_refs,
            infrastructure: r.infrastructure.as_ref(),
            reporter_name: &r.reporter.reporter_name,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AnnoyanceProperties<'a> {
    id: &'a str,
    kind: ReportKind,
    icon: String,
    annoyance_type: AnnoyanceType,
    annoyance_types: &'a [AnnoyanceType],
    is_ongoing: bool,
    description: &'a str,
    occurred_at: Option<DateTime<Utc>>,
    reported_at: DateTime<Utc>,
    road_name: &'a str,
    flagged: bool,
    flag_count: u32,
    upvote_count: u32,
    photo_refs: &'a [String],
    infrastructure: Option<&'a InfrastructureDescriptor>,
    reporter_name: &'a str,
}

impl<'a> From<&'a Annoyance> for AnnoyanceProperties<'a> {
    fn from(r: &'a Annoyance) -> Self {
        Self {
            id: &r.id,
            kind: ReportKind::Annoyance,
            icon: annoyance_icon_key(r.annoyance_type),
            annoyance_type: r.annoyance_type,
            annoyance_types: r.categories(),
            is_ongoing: r.is_ongoing,
            description: &r.description,
            occurred_at: r.occurred_at,
            reported_at: r.reported_at,
            road_name: &r.road_name,
            flagged: r.flagged,
            flag_count: r.flag_count,
            upvote_count: r.upvote_count,
            photo_refs: &r.photo_refs,
            infrastructure: r.infrastructure.as_ref(),
            reporter_name: &r.reporter.reporter_name,
        }
    }
}

fn to_object<T: Serialize>(props: &T) -> Result<JsonObject, serde_json::Error> {
    match serde_json::to_value(props)? {
        serde_json::Value::Object(map) => Ok(map),
        other => Err(serde::ser::Error::custom(format!(
            "feature properties serialized to {other}, expected an object"
        ))),
    }
}

impl ReportFeature {
    /// Report ID.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Incident(r) => &r.id,
            Self::Annoyance(r) => &r.id,
        }
    }

    /// Which layer the feature belongs to.
    #[must_use]
    pub const fn kind(&self) -> ReportKind {
        match self {
            Self::Incident(_) => ReportKind::Incident,
            Self::Annoyance(_) => ReportKind::Annoyance,
        }
    }

    /// Marker position.
    #[must_use]
    pub const fn location(&self) -> LngLat {
        match self {
            Self::Incident(r) => r.location,
            Self::Annoyance(r) => r.location,
        }
    }

    /// Converts to a GeoJSON point feature.
    ///
    /// # Errors
    ///
    /// Returns [`serde_json::Error`] if the properties fail to serialize.
    pub fn to_geojson(&self) -> Result<Feature, serde_json::Error> {
        let properties = match self {
            Self::Incident(r) => to_object(&IncidentProperties::from(r))?,
            Self::Annoyance(r) => to_object(&AnnoyanceProperties::from(r))?,
        };
        let location = self.location();

        Ok(Feature {
            bbox: None,
            geometry: Some(Geometry::new(Value::Point(vec![location.lng, location.lat]))),
            id: Some(Id::String(self.id().to_string())),
            properties: Some(properties),
            foreign_members: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nearmiss_map_infrastructure_models::{BikeInfrastructure, LitState, TagValue};

    #[test]
    fn incident_properties_keep_typed_values() {
        let mut r = Incident::new(
            LngLat::new(144.96, -37.81),
            IncidentType::Overtaking,
            Scariness::FairlyScary,
            "Passed within half a metre at speed",
        );
        r.id = "i1".to_string();
        r.incident_types = vec![IncidentType::Overtaking, IncidentType::RoadRage];
        r.other_party = Some("delivery_van".to_string());
        r.infrastructure = Some(InfrastructureDescriptor {
            osm_way_id: 99,
            name: Some("Nicholson St".to_string()),
            road_type: Some("primary".to_string()),
            road_type_label: "Primary Road".to_string(),
            speed_limit: Some(TagValue::Number(60)),
            bike_infrastructure: Some(BikeInfrastructure::PaintedBikeLane),
            lanes: None,
            lit: Some(LitState::Yes),
            surface: None,
            one_way: None,
            sidewalk: None,
        });

        let feature = ReportFeature::Incident(r).to_geojson().unwrap();
        let props = feature.properties.unwrap();

        assert_eq!(props["kind"], "incident");
        assert_eq!(props["icon"], "marker-overtaking-fairly_scary");
        assert_eq!(
            props["incidentTypes"],
            serde_json::json!(["overtaking", "road_rage"])
        );
        assert_eq!(props["otherParty"], "Delivery Van");
        assert_eq!(props["infrastructure"]["speedLimit"], 60);
        assert_eq!(
            props["infrastructure"]["bikeInfrastructure"],
            "Painted Bike Lane"
        );
        assert_eq!(feature.id, Some(Id::String("i1".to_string())));
        assert_eq!(
            feature.geometry.unwrap().value,
            Value::Point(vec![144.96, -37.81])
        );
    }

    #[test]
    fn legacy_annoyance_exposes_single_category_list() {
        let mut r = Annoyance::new(
            LngLat::new(144.97, -37.80),
            AnnoyanceType::PinchPoint,
            "Lane narrows to nothing at the bridge",
        );
        r.annoyance_types.clear();
        let props = ReportFeature::Annoyance(r)
            .to_geojson()
            .unwrap()
            .properties
            .unwrap();
        assert_eq!(props["annoyanceTypes"], serde_json::json!(["pinch_point"]));
        assert_eq!(props["icon"], "annoyance-pinch_point");
        assert!(props["infrastructure"].is_null());
    }
}
