//! Tag normalization: way tags to an [`InfrastructureDescriptor`].

use nearmiss_map_infrastructure_models::{
    BikeInfrastructure, InfrastructureDescriptor, LitState, TagValue, Way,
};

/// Cycleway tags checked in order; the first recognized value decides.
const CYCLEWAY_KEYS: &[&str] = &["cycleway", "cycleway:left", "cycleway:right", "cycleway:both"];

/// Highway classes that carry motor traffic.
const DRIVABLE_HIGHWAYS: &[&str] = &[
    "motorway",
    "trunk",
    "primary",
    "secondary",
    "tertiary",
    "residential",
    "unclassified",
    "service",
];

/// Builds the descriptor for a way from its tags.
#[must_use]
pub fn describe_way(way: &Way) -> InfrastructureDescriptor {
    let road_type = way.tag("highway");

    InfrastructureDescriptor {
        osm_way_id: way.id,
        name: way.tag("name").map(str::to_string),
        road_type: road_type.map(str::to_string),
        road_type_label: road_type.map_or_else(
            || "Unknown".to_string(),
            |raw| road_type_label(raw).map_or_else(|| raw.to_string(), str::to_string),
        ),
        speed_limit: way.tag("maxspeed").map(parse_leading_integer),
        bike_infrastructure: classify_bike_infrastructure(way),
        lanes: way.tag("lanes").map(parse_leading_integer),
        lit: way.tag("lit").map(|v| LitState::from(v.to_string())),
        surface: way.tag("surface").map(surface_label),
        one_way: way.tag("oneway").and_then(parse_one_way),
        sidewalk: way.tag("sidewalk").map(str::to_string),
    }
}

/// Classifies a way's bike infrastructure. The first matching rule wins.
#[must_use]
pub fn classify_bike_infrastructure(way: &Way) -> Option<BikeInfrastructure> {
    let highway = way.tag("highway");

    if highway == Some("cycleway") {
        return Some(BikeInfrastructure::DedicatedBikePath);
    }

    if matches!(highway, Some("footway" | "path"))
        && matches!(way.tag("bicycle"), Some("designated" | "yes"))
    {
        return Some(BikeInfrastructure::SharedUsePath);
    }

    let from_cycleway = CYCLEWAY_KEYS
        .iter()
        .filter_map(|key| way.tag(key))
        .find_map(|value| match value {
            "track" | "separate" => Some(BikeInfrastructure::ProtectedBikeLane),
            "lane" => Some(BikeInfrastructure::PaintedBikeLane),
            "shared_lane" => Some(BikeInfrastructure::Sharrow),
            "share_busway" => Some(BikeInfrastructure::SharedBusLane),
            _ => None,
        });
    if from_cycleway.is_some() {
        return from_cycleway;
    }

    highway
        .filter(|h| DRIVABLE_HIGHWAYS.contains(h))
        .map(|_| BikeInfrastructure::NoBikeLane)
}

/// Parses leading integer digits (`"50 mph"` → 50), after optional
/// whitespace and an optional `+`. Values with no leading digits, a leading
/// `-`, or too large for a `u32` pass through unchanged.
///
/// `"0"` parses to `Number(0)`; zero is a valid tag value, not a missing
/// one.
#[must_use]
pub fn parse_leading_integer(raw: &str) -> TagValue {
    let trimmed = raw.trim_start();
    let trimmed = trimmed.strip_prefix('+').unwrap_or(trimmed);
    let digits_end = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());

    trimmed[..digits_end]
        .parse()
        .map_or_else(|_| TagValue::Raw(raw.to_string()), TagValue::Number)
}

/// Parses the `oneway` tag. `-1` means one-way against the drawing
/// direction, which is still one-way.
#[must_use]
pub fn parse_one_way(raw: &str) -> Option<bool> {
    match raw {
        "yes" | "true" | "1" | "-1" => Some(true),
        "no" | "false" | "0" => Some(false),
        _ => None,
    }
}

/// Human-readable label for a `highway` value, if it is a known class.
#[must_use]
pub fn road_type_label(highway: &str) -> Option<&'static str> {
    Some(match highway {
        "motorway" => "Motorway",
        "trunk" => "Trunk Road",
        "primary" => "Primary Road",
        "secondary" => "Secondary Road",
        "tertiary" => "Tertiary Road",
        "residential" => "Residential Street",
        "service" => "Service Road",
        "unclassified" => "Minor Road",
        "living_street" => "Shared Zone",
        "cycleway" => "Bike Path",
        "footway" => "Footpath",
        "path" => "Path",
        "track" => "Track",
        "pedestrian" => "Pedestrian Zone",
        _ => return None,
    })
}

/// Human-readable label for a `surface` value. Unknown values are
/// capitalized.
#[must_use]
pub fn surface_label(surface: &str) -> String {
    let known = match surface {
        "asphalt" => "Asphalt",
        "concrete" | "concrete:plates" | "concrete:lanes" => "Concrete",
        "paved" => "Paved",
        "sett" | "cobblestone" => "Cobblestone",
        "paving_stones" => "Paving Stones",
        "gravel" => "Gravel",
        "fine_gravel" => "Fine Gravel",
        "compacted" => "Compacted Gravel",
        "dirt" | "earth" => "Dirt",
        "mud" => "Mud",
        "sand" => "Sand",
        "grass" => "Grass",
        "wood" => "Timber",
        "metal" => "Metal Grating",
        "unpaved" => "Unpaved",
        "ground" => "Unsealed",
        _ => return capitalize(surface),
    };
    known.to_string()
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use nearmiss_map_infrastructure_models::Tags;

    fn way(tags: &[(&str, &str)]) -> Way {
        Way {
            id: 7,
            tags: tags
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect::<Tags>(),
            geometry: Vec::new(),
        }
    }

    #[test]
    fn painted_lane_on_residential() {
        let w = way(&[("highway", "residential"), ("cycleway:left", "lane")]);
        assert_eq!(
            classify_bike_infrastructure(&w),
            Some(BikeInfrastructure::PaintedBikeLane)
        );
    }

    #[test]
    fn residential_with_cycleway_lane_is_painted() {
        let w = way(&[("highway", "residential"), ("cycleway", "lane")]);
        assert_eq!(
            classify_bike_infrastructure(&w),
            Some(BikeInfrastructure::PaintedBikeLane)
        );
    }

    #[test]
    fn bare_cycleway_is_dedicated() {
        assert_eq!(
            classify_bike_infrastructure(&way(&[("highway", "cycleway")])),
            Some(BikeInfrastructure::DedicatedBikePath)
        );
    }

    #[test]
    fn plain_residential_has_no_bike_lane() {
        assert_eq!(
            classify_bike_infrastructure(&way(&[("highway", "residential")])),
            Some(BikeInfrastructure::NoBikeLane)
        );
    }

    #[test]
    fn cycleway_highway_is_dedicated() {
        let w = way(&[("highway", "cycleway"), ("cycleway", "lane")]);
        assert_eq!(
            classify_bike_infrastructure(&w),
            Some(BikeInfrastructure::DedicatedBikePath)
        );
    }

    #[test]
    fn plain_primary_has_no_bike_lane() {
        let w = way(&[("highway", "primary")]);
        assert_eq!(
            classify_bike_infrastructure(&w),
            Some(BikeInfrastructure::NoBikeLane)
        );
    }

    #[test]
    fn footway_without_bicycle_access_is_unknown() {
        assert_eq!(classify_bike_infrastructure(&way(&[("highway", "footway")])), None);
        assert_eq!(
            classify_bike_infrastructure(&way(&[("highway", "path"), ("bicycle", "yes")])),
            Some(BikeInfrastructure::SharedUsePath)
        );
    }

    #[test]
    fn first_recognized_cycleway_value_decides() {
        let w = way(&[
            ("highway", "secondary"),
            ("cycleway", ""),
            ("cycleway:right", "track"),
            ("cycleway:both", "lane"),
        ]);
        assert_eq!(
            classify_bike_infrastructure(&w),
            Some(BikeInfrastructure::ProtectedBikeLane)
        );

        // Unrecognized values are skipped.
        let w = way(&[
            ("highway", "tertiary"),
            ("cycleway", "no"),
            ("cycleway:right", "lane"),
        ]);
        assert_eq!(
            classify_bike_infrastructure(&w),
            Some(BikeInfrastructure::PaintedBikeLane)
        );

        let w = way(&[("highway", "tertiary"), ("cycleway:both", "no")]);
        assert_eq!(
            classify_bike_infrastructure(&w),
            Some(BikeInfrastructure::NoBikeLane)
        );
    }

    #[test]
    fn leading_integer_parsing() {
        assert_eq!(parse_leading_integer("50"), TagValue::Number(50));
        assert_eq!(parse_leading_integer("30 mph"), TagValue::Number(30));
        assert_eq!(
            parse_leading_integer("signals"),
            TagValue::Raw("signals".to_string())
        );
        assert_eq!(
            parse_leading_integer("AU:urban"),
            TagValue::Raw("AU:urban".to_string())
        );
    }

    #[test]
    fn leading_integer_signs_and_zero() {
        assert_eq!(parse_leading_integer(" +40"), TagValue::Number(40));
        assert_eq!(parse_leading_integer("0"), TagValue::Number(0));
        assert_eq!(parse_leading_integer("-1"), TagValue::Raw("-1".to_string()));
        assert_eq!(parse_leading_integer("+"), TagValue::Raw("+".to_string()));
    }

    #[test]
    fn labels_fall_back_sensibly() {
        assert_eq!(road_type_label("living_street"), Some("Shared Zone"));
        assert_eq!(road_type_label("bridleway"), None);
        assert_eq!(surface_label("sett"), "Cobblestone");
        assert_eq!(surface_label("woodchips"), "Woodchips");
    }

    #[test]
    fn describes_full_way() {
        let w = way(&[
            ("highway", "residential"),
            ("name", "Brunswick St"),
            ("maxspeed", "40"),
            ("lanes", "2"),
            ("lit", "yes"),
            ("surface", "asphalt"),
            ("oneway", "yes"),
            ("sidewalk", "both"),
            ("cycleway", "lane"),
        ]);
        let d = describe_way(&w);
        assert_eq!(d.osm_way_id, 7);
        assert_eq!(d.name.as_deref(), Some("Brunswick St"));
        assert_eq!(d.road_type.as_deref(), Some("residential"));
        assert_eq!(d.road_type_label, "Residential Street");
        assert_eq!(d.speed_limit, Some(TagValue::Number(40)));
        assert_eq!(d.lanes, Some(TagValue::Number(2)));
        assert_eq!(d.lit, Some(LitState::Yes));
        assert_eq!(d.surface.as_deref(), Some("Asphalt"));
        assert_eq!(d.one_way, Some(true));
        assert_eq!(d.sidewalk.as_deref(), Some("both"));
        assert_eq!(
            d.bike_infrastructure,
            Some(BikeInfrastructure::PaintedBikeLane)
        );
    }

    #[test]
    fn describes_untagged_way() {
        let d = describe_way(&way(&[]));
        assert_eq!(d.road_type, None);
        assert_eq!(d.road_type_label, "Unknown");
        assert_eq!(d.bike_infrastructure, None);
        assert_eq!(d.one_way, None);

        let d = describe_way(&way(&[("highway", "bridleway")]));
        assert_eq!(d.road_type_label, "bridleway");
    }
}
