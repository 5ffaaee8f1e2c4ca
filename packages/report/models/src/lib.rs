#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Report taxonomy types and report documents.
//!
//! This crate defines the canonical incident and annoyance categories,
//! the four-level scariness scale, and the [`Report`] documents that the
//! persistence layer stores and the aggregator renders. Category tags are
//! the `snake_case` strings used on the wire and in marker icon keys.

pub mod user;

use chrono::{DateTime, Utc};
use nearmiss_map_infrastructure_models::InfrastructureDescriptor;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

pub use user::{AdminCapability, User, UserRole};

/// Minimum trimmed description length accepted at submission.
pub const MIN_DESCRIPTION_LEN: usize = 20;

/// Maximum description length accepted at submission.
pub const MAX_DESCRIPTION_LEN: usize = 1000;

/// A WGS84 coordinate, serialized as `[lng, lat]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct LngLat {
    /// Longitude.
    pub lng: f64,
    /// Latitude.
    pub lat: f64,
}

impl LngLat {
    /// Creates a coordinate from longitude and latitude.
    #[must_use]
    pub const fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }
}

impl From<[f64; 2]> for LngLat {
    fn from([lng, lat]: [f64; 2]) -> Self {
        Self { lng, lat }
    }
}

impl From<LngLat> for [f64; 2] {
    fn from(value: LngLat) -> Self {
        [value.lng, value.lat]
    }
}

impl From<LngLat> for geo::Coord<f64> {
    fn from(value: LngLat) -> Self {
        Self {
            x: value.lng,
            y: value.lat,
        }
    }
}

impl From<geo::Coord<f64>> for LngLat {
    fn from(value: geo::Coord<f64>) -> Self {
        Self {
            lng: value.x,
            lat: value.y,
        }
    }
}

/// Which kind of report a document is.
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
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReportKind {
    /// A near miss or collision.
    Incident,
    /// A persistent infrastructure nuisance.
    Annoyance,
}

impl ReportKind {
    /// Returns the document collection name for this kind.
    #[must_use]
    pub const fn collection(self) -> &'static str {
        match self {
            Self::Incident => "incidents",
            Self::Annoyance => "annoyances",
        }
    }
}

/// Moderation status of a report.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReportStatus {
    /// Awaiting review; never displayed.
    #[default]
    PendingVerification,
    /// Visible on the map.
    Approved,
}

/// How frightening an incident was, from least to most.
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
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Scariness {
    /// Mildly unsettling.
    NotScary = 1,
    /// Felt unsafe but had room to react.
    #[serde(rename = "a_bit_scary")]
    #[strum(serialize = "a_bit_scary")]
    ABitScary = 2,
    /// Had to brake hard or swerve.
    FairlyScary = 3,
    /// Aggression, collision, or narrowly avoided serious injury.
    VeryScary = 4,
}

impl Scariness {
    /// Returns the numeric level (1-4).
    #[must_use]
    pub const fn value(self) -> u8 {
        self as u8
    }

    /// Creates a scariness level from a numeric value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not in the range 1-4.
    pub const fn from_value(value: u8) -> Result<Self, InvalidScarinessError> {
        match value {
            1 => Ok(Self::NotScary),
            2 => Ok(Self::ABitScary),
            3 => Ok(Self::FairlyScary),
            4 => Ok(Self::VeryScary),
            _ => Err(InvalidScarinessError { value }),
        }
    }

    /// Returns the display label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::NotScary => "Not Scary",
            Self::ABitScary => "A Bit Scary",
            Self::FairlyScary => "Fairly Scary",
            Self::VeryScary => "Very Scary",
        }
    }

    /// Returns the marker fill color as a `#rrggbb` hex string.
    #[must_use]
    pub const fn color(self) -> &'static str {
        match self {
            Self::NotScary => "#22c55e",
            Self::ABitScary => "#f59e0b",
            Self::FairlyScary => "#f97316",
            Self::VeryScary => "#ef4444",
        }
    }

    /// Returns the guidance text shown when picking this level.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::NotScary => "Mildly unsettling, e.g. unnecessary honking or a minor obstruction.",
            Self::ABitScary => {
                "Felt unsafe but had room to react, e.g. a close pass with space to move."
            }
            Self::FairlyScary => {
                "Genuinely frightening, e.g. had to brake hard or swerve to avoid a collision."
            }
            Self::VeryScary => {
                "Terrifying, e.g. deliberate aggression, an actual collision, or narrowly \
                 avoided serious injury."
            }
        }
    }

    /// Returns all variants of this enum, least scary first.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::NotScary,
            Self::ABitScary,
            Self::FairlyScary,
            Self::VeryScary,
        ]
    }
}

/// Error returned when attempting to create a [`Scariness`] from an invalid
/// numeric value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidScarinessError {
    /// The invalid value that was provided.
    pub value: u8,
}

impl std::fmt::Display for InvalidScarinessError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid scariness value {}: expected 1-4", self.value)
    }
}

impl std::error::Error for InvalidScarinessError {}

/// Near-miss incident categories, based on DCA crash codes.
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
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum IncidentType {
    /// Right hook, left hook, cross traffic, turning conflict
    Intersection,
    /// Rear end or sideswipe from a vehicle travelling the same way
    SameDirection,
    /// Vehicle pulling out of a driveway or making a U-turn
    DrivewayUturn,
    /// Parked car door opened into the rider's path
    Dooring,
    /// Single-bike crash
    LossOfControl,
    /// Collided with or swerved around a parked vehicle
    HitParked,
    /// Vehicle entering or leaving a parking space
    Parking,
    /// Oncoming vehicle
    HeadOn,
    /// Conflict with a pedestrian
    Pedestrian,
    /// Close pass
    Overtaking,
    /// Debris, bollard, or animal
    StruckObject,
    /// Deliberate intimidation or abuse
    RoadRage,
    /// Anything else
    Other,
}

impl IncidentType {
    /// Returns the display label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Intersection => "Intersection",
            Self::SameDirection => "Sideswipe / Rear End",
            Self::DrivewayUturn => "Driveway / U-Turn",
            Self::Dooring => "Dooring",
            Self::LossOfControl => "Loss of Control",
            Self::HitParked => "Hit Parked Car",
            Self::Parking => "Parking Manoeuvre",
            Self::HeadOn => "Head-On",
            Self::Pedestrian => "Pedestrian",
            Self::Overtaking => "Close Pass",
            Self::StruckObject => "Struck Object / Animal",
            Self::RoadRage => "Road Rage",
            Self::Other => "Other",
        }
    }

    /// Returns the guidance text shown when picking this type.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Intersection => {
                "Collision or near miss at an intersection, e.g. right hook, left hook, cross \
                 traffic, or turning conflict."
            }
            Self::SameDirection => {
                "Hit from behind or side by a vehicle travelling the same direction, e.g. rear \
                 end, lane sideswipe, or left turn cut-off."
            }
            Self::DrivewayUturn => {
                "Vehicle pulling out of a driveway, side street, or making a U-turn across your \
                 path."
            }
            Self::Dooring => {
                "A parked car door opened into your path, whether you hit it or swerved to \
                 avoid it."
            }
            Self::LossOfControl => {
                "Single-bike crash, e.g. slipped on a wet surface, hit a pothole, or lost \
                 control on a bend."
            }
            Self::HitParked => {
                "Collided with or swerved to avoid a vehicle parked in or near the bike lane."
            }
            Self::Parking => "Vehicle entering or leaving a parking space crossed your path.",
            Self::HeadOn => {
                "Vehicle coming towards you in the opposite direction, e.g. on the wrong side \
                 of the road or shared path."
            }
            Self::Pedestrian => {
                "Conflict with a pedestrian, e.g. stepped out onto the path, crossing the road, \
                 or walking in the bike lane."
            }
            Self::Overtaking => "Vehicle passed too close while overtaking.",
            Self::StruckObject => {
                "Hit an object on the road (debris, branch, bollard) or an animal ran into your \
                 path."
            }
            Self::RoadRage => {
                "Deliberate intimidation, verbal abuse, or aggressive driving directed at you."
            }
            Self::Other => "Anything not covered above; describe what happened in the details.",
        }
    }

    /// Returns the Font Awesome 6 solid code point drawn on the marker.
    #[must_use]
    pub const fn glyph(self) -> char {
        match self {
            Self::Intersection => '\u{f074}',
            Self::SameDirection => '\u{f5de}',
            Self::DrivewayUturn => '\u{f0e2}',
            Self::Dooring => '\u{f52b}',
            Self::LossOfControl => '\u{e546}',
            Self::HitParked => '\u{f540}',
            Self::Parking => '\u{f5e4}',
            Self::HeadOn => '\u{f5e1}',
            Self::Pedestrian => '\u{f554}',
            Self::Overtaking => '\u{f101}',
            Self::StruckObject => '\u{f071}',
            Self::RoadRage => '\u{f556}',
            Self::Other => '\u{f059}',
        }
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Intersection,
            Self::SameDirection,
            Self::DrivewayUturn,
            Self::Dooring,
            Self::LossOfControl,
            Self::HitParked,
            Self::Parking,
            Self::HeadOn,
            Self::Pedestrian,
            Self::Overtaking,
            Self::StruckObject,
            Self::RoadRage,
            Self::Other,
        ]
    }
}

/// Infrastructure annoyance categories.
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
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AnnoyanceType {
    /// Bike lane blocked by cars, bins, or works
    BlockedLane,
    /// Potholes and cracks
    PoorSurface,
    /// Glass, branches, rubbish
    GlassDebris,
    /// Vegetation encroaching on the lane
    Overgrown,
    /// Worn lane markings
    FadedMarkings,
    /// Somewhere that needs a bike lane
    NoInfrastructure,
    /// Missing or misleading signs
    PoorSignage,
    /// Signals that ignore bikes
    TrafficLights,
    /// Road narrows dangerously
    PinchPoint,
    /// Dark section
    PoorLighting,
    /// Lane ends with no transition
    PathEnds,
    /// Unleashed dogs on shared paths
    DogOffLeash,
    /// Unsafe intersection design
    BadIntersection,
    /// Regular flooding or poor drainage
    Flooding,
    /// Anything else
    Other,
}

impl AnnoyanceType {
    /// Returns the display label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::BlockedLane => "Blocked Bike Lane",
            Self::PoorSurface => "Poor Surface",
            Self::GlassDebris => "Glass / Debris",
            Self::Overgrown => "Overgrown",
            Self::FadedMarkings => "Faded Markings",
            Self::NoInfrastructure => "No Bike Infra",
            Self::PoorSignage => "Poor Signage",
            Self::TrafficLights => "Traffic Lights",
            Self::PinchPoint => "Pinch Point",
            Self::PoorLighting => "Poor Lighting",
            Self::PathEnds => "Path Ends",
            Self::DogOffLeash => "Dog Off Leash",
            Self::BadIntersection => "Bad Intersection",
            Self::Flooding => "Flooding",
            Self::Other => "Other",
        }
    }

    /// Returns the guidance text shown when picking this type.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::BlockedLane => {
                "Bike lane blocked by parked cars, bins, construction, or other obstructions."
            }
            Self::PoorSurface => {
                "Potholes, cracks, uneven pavement, or badly maintained road surface."
            }
            Self::GlassDebris => {
                "Broken glass, branches, rubbish, or other debris on the road or path."
            }
            Self::Overgrown => {
                "Trees, shrubs, or grass encroaching on the bike lane or shared path."
            }
            Self::FadedMarkings => {
                "Worn out bike lane markings, missing lane dividers, or unclear road paint."
            }
            Self::NoInfrastructure => {
                "A road or area that really needs a bike lane or shared path but doesn't have one."
            }
            Self::PoorSignage => "Missing, confusing, or misleading signs for cyclists.",
            Self::TrafficLights => {
                "Lights that don't detect bikes, excessively long waits, or poorly timed signals."
            }
            Self::PinchPoint => {
                "Road narrows dangerously, forcing bikes and cars into close proximity."
            }
            Self::PoorLighting => "Dark section of road or path that needs better lighting.",
            Self::PathEnds => {
                "Bike lane or path abruptly ends, forcing you to merge into traffic with no \
                 transition."
            }
            Self::DogOffLeash => "Unleashed dogs on shared paths creating hazards for cyclists.",
            Self::BadIntersection => {
                "Intersection design is unsafe or confusing for cyclists: poor sight lines, no \
                 bike box."
            }
            Self::Flooding => {
                "Path or road regularly floods or has poor drainage, making it impassable after \
                 rain."
            }
            Self::Other => "Anything else that makes cycling annoying; describe it below.",
        }
    }

    /// Returns the Font Awesome 6 code point drawn on the marker.
    #[must_use]
    pub const fn glyph(self) -> char {
        match self {
            Self::BlockedLane => '\u{e562}',
            Self::PoorSurface => '\u{e565}',
            Self::GlassDebris => '\u{e4dc}',
            Self::Overgrown => '\u{f06c}',
            Self::FadedMarkings => '\u{f850}',
            Self::NoInfrastructure => '\u{f05e}',
            Self::PoorSignage => '\u{f277}',
            Self::TrafficLights => '\u{f637}',
            Self::PinchPoint => '\u{f362}',
            Self::PoorLighting => '\u{f0eb}',
            Self::PathEnds => '\u{e566}',
            Self::DogOffLeash => '\u{f6d3}',
            Self::BadIntersection => '\u{f5eb}',
            Self::Flooding => '\u{f773}',
            Self::Other => '\u{f059}',
        }
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::BlockedLane,
            Self::PoorSurface,
            Self::GlassDebris,
            Self::Overgrown,
            Self::FadedMarkings,
            Self::NoInfrastructure,
            Self::PoorSignage,
            Self::TrafficLights,
            Self::PinchPoint,
            Self::PoorLighting,
            Self::PathEnds,
            Self::DogOffLeash,
            Self::BadIntersection,
            Self::Flooding,
            Self::Other,
        ]
    }
}

/// Who created a report, for authorship display only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reporter {
    /// Creator's user ID, or `"anonymous"`.
    #[serde(default = "anonymous_uid")]
    pub reported_by: String,
    /// Creator's display name, or `"Anonymous"`.
    #[serde(default = "anonymous_name")]
    pub reporter_name: String,
}

fn anonymous_uid() -> String {
    "anonymous".to_string()
}

fn anonymous_name() -> String {
    "Anonymous".to_string()
}

impl Default for Reporter {
    fn default() -> Self {
        Self {
            reported_by: anonymous_uid(),
            reporter_name: anonymous_name(),
        }
    }
}

impl Reporter {
    /// Builds the reporter for the signed-in user, or anonymous.
    ///
    /// The display name falls back to the user's email, then
    /// `"Anonymous"`.
    #[must_use]
    pub fn for_user(user: Option<&User>) -> Self {
        user.map_or_else(Self::default, |user| Self {
            reported_by: user.uid.clone(),
            reporter_name: user
                .display_name
                .clone()
                .or_else(|| user.email.clone())
                .unwrap_or_else(anonymous_name),
        })
    }
}

/// Riding conditions at the time of an incident. Values are raw form tags
/// (e.g. `"dusk"`, `"rain"`, `"gravel"`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conditions {
    /// Light level.
    #[serde(default)]
    pub lighting: Option<String>,
    /// Weather.
    #[serde(default)]
    pub weather: Option<String>,
    /// Road surface.
    #[serde(default)]
    pub surface: Option<String>,
}

impl Conditions {
    /// Drops blank values.
    #[must_use]
    pub fn normalized(&self) -> Self {
        Self {
            lighting: non_blank(self.lighting.as_deref()),
            weather: non_blank(self.weather.as_deref()),
            surface: non_blank(self.surface.as_deref()),
        }
    }
}

/// Optional demographic and ride details. Stored as top-level document
/// fields, each omitted when unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiderDetails {
    /// Whether the report is for the reporter or someone else
    /// (e.g. `"myself"`, `"my_child"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reporting_for: Option<String>,
    /// Age band.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rider_age: Option<String>,
    /// Gender.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rider_gender: Option<String>,
    /// Purpose of the ride (e.g. `"commute"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ride_type: Option<String>,
    /// Kind of bike (e.g. `"e_bike"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bike_type: Option<String>,
}

impl RiderDetails {
    /// Drops blank values.
    #[must_use]
    pub fn normalized(&self) -> Self {
        Self {
            reporting_for: non_blank(self.reporting_for.as_deref()),
            rider_age: non_blank(self.rider_age.as_deref()),
            rider_gender: non_blank(self.rider_gender.as_deref()),
            ride_type: non_blank(self.ride_type.as_deref()),
            bike_type: non_blank(self.bike_type.as_deref()),
        }
    }
}

/// How to reach the reporter for follow-up. Stored as top-level document
/// fields, each omitted when unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactDetails {
    /// Name to address the reporter by.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_name: Option<String>,
    /// Email address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
    /// Whether the reporter agreed to be contacted.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub contact_consent: bool,
}

impl ContactDetails {
    /// Trims the name and email, dropping them when blank.
    #[must_use]
    pub fn normalized(&self) -> Self {
        Self {
            contact_name: non_blank(self.contact_name.as_deref()),
            contact_email: non_blank(self.contact_email.as_deref()),
            contact_consent: self.contact_consent,
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(String::from)
}

/// A reported near miss or collision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Incident {
    /// Document ID assigned by the persistence layer.
    #[serde(default)]
    pub id: String,
    /// Where it happened.
    pub location: LngLat,
    /// Legacy single category; always the first of `incident_types`.
    pub incident_type: IncidentType,
    /// All categories. Empty on historical single-category documents.
    #[serde(default)]
    pub incident_types: Vec<IncidentType>,
    /// How scary it was.
    #[serde(alias = "severity")]
    pub scariness: Scariness,
    /// Free-text account.
    pub description: String,
    /// Server-assigned creation time.
    pub reported_at: DateTime<Utc>,
    /// User-supplied event time.
    #[serde(default, alias = "dateTime")]
    pub occurred_at: Option<DateTime<Utc>>,
    /// Moderation status.
    #[serde(default)]
    pub status: ReportStatus,
    /// Road details at submission time.
    #[serde(default)]
    pub infrastructure: Option<InfrastructureDescriptor>,
    /// Reverse-geocoded place name at submission time.
    #[serde(default)]
    pub road_name: String,
    /// Whether the rider made physical contact.
    #[serde(default)]
    pub contact_made: bool,
    /// Whether anyone was injured.
    #[serde(default)]
    pub injury_occurred: bool,
    /// Raw other-party tag (e.g. `"car"`, `"delivery_van"`).
    #[serde(default)]
    pub other_party: Option<String>,
    /// Riding conditions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Conditions>,
    /// Rider details.
    #[serde(flatten)]
    pub rider: RiderDetails,
    /// Follow-up contact.
    #[serde(flatten)]
    pub contact: ContactDetails,
    /// Whether anyone has flagged this report.
    #[serde(default)]
    pub flagged: bool,
    /// Number of flags.
    #[serde(default, alias = "reportCount")]
    pub flag_count: u32,
    /// Number of upvotes.
    #[serde(default)]
    pub upvote_count: u32,
    /// Photo URLs in upload order.
    #[serde(default, alias = "photoURLs")]
    pub photo_refs: Vec<String>,
    /// First photo URL, written alongside `photo_refs`.
    #[serde(default, rename = "photoURL", skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    /// Author.
    #[serde(flatten)]
    pub reporter: Reporter,
}

impl Incident {
    /// Creates an unsaved incident with a single category. The ID and
    /// report time are placeholders until the store assigns them.
    #[must_use]
    pub fn new(
        location: LngLat,
        incident_type: IncidentType,
        scariness: Scariness,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: String::new(),
            location,
            incident_type,
            incident_types: vec![incident_type],
            scariness,
            description: description.into(),
            reported_at: DateTime::<Utc>::default(),
            occurred_at: None,
            status: ReportStatus::default(),
            infrastructure: None,
            road_name: String::new(),
            contact_made: false,
            injury_occurred: false,
            other_party: None,
            conditions: None,
            rider: RiderDetails::default(),
            contact: ContactDetails::default(),
            flagged: false,
            flag_count: 0,
            upvote_count: 0,
            photo_refs: Vec::new(),
            photo_url: None,
            reporter: Reporter::default(),
        }
    }

    /// Returns the category set: the multi-category list if present,
    /// otherwise the legacy single category.
    #[must_use]
    pub fn categories(&self) -> &[IncidentType] {
        if self.incident_types.is_empty() {
            std::slice::from_ref(&self.incident_type)
        } else {
            &self.incident_types
        }
    }

    /// Returns the other party formatted for display (`"delivery_van"` →
    /// `"Delivery Van"`), or `None` when absent or `"none"`.
    #[must_use]
    pub fn other_party_label(&self) -> Option<String> {
        self.other_party
            .as_deref()
            .filter(|p| !p.is_empty() && *p != "none")
            .map(title_case)
    }
}

/// A reported persistent infrastructure nuisance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annoyance {
    /// Document ID assigned by the persistence layer.
    #[serde(default)]
    pub id: String,
    /// Where it is.
    pub location: LngLat,
    /// Legacy single category; always the first of `annoyance_types`.
    pub annoyance_type: AnnoyanceType,
    /// All categories. Empty on historical single-category documents.
    #[serde(default)]
    pub annoyance_types: Vec<AnnoyanceType>,
    /// Free-text account.
    pub description: String,
    /// Server-assigned creation time.
    pub reported_at: DateTime<Utc>,
    /// User-supplied observation time.
    #[serde(default, alias = "dateTime")]
    pub occurred_at: Option<DateTime<Utc>>,
    /// Moderation status.
    #[serde(default)]
    pub status: ReportStatus,
    /// Road details at submission time.
    #[serde(default)]
    pub infrastructure: Option<InfrastructureDescriptor>,
    /// Reverse-geocoded place name at submission time.
    #[serde(default)]
    pub road_name: String,
    /// Ongoing problem rather than a one-off.
    #[serde(default)]
    pub is_ongoing: bool,
    /// Rider details.
    #[serde(flatten)]
    pub rider: RiderDetails,
    /// Follow-up contact.
    #[serde(flatten)]
    pub contact: ContactDetails,
    /// Whether anyone has flagged this report.
    #[serde(default)]
    pub flagged: bool,
    /// Number of flags.
    #[serde(default, alias = "reportCount")]
    pub flag_count: u32,
    /// Number of upvotes.
    #[serde(default)]
    pub upvote_count: u32,
    /// Photo URLs in upload order.
    #[serde(default, alias = "photoURLs")]
    pub photo_refs: Vec<String>,
    /// First photo URL, written alongside `photo_refs`.
    #[serde(default, rename = "photoURL", skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    /// Author.
    #[serde(flatten)]
    pub reporter: Reporter,
}

impl Annoyance {
    /// Creates an unsaved annoyance with a single category. The ID and
    /// report time are placeholders until the store assigns them.
    #[must_use]
    pub fn new(
        location: LngLat,
        annoyance_type: AnnoyanceType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: String::new(),
            location,
            annoyance_type,
            annoyance_types: vec![annoyance_type],
            description: description.into(),
            reported_at: DateTime::<Utc>::default(),
            occurred_at: None,
            status: ReportStatus::default(),
            infrastructure: None,
            road_name: String::new(),
            is_ongoing: false,
            rider: RiderDetails::default(),
            contact: ContactDetails::default(),
            flagged: false,
            flag_count: 0,
            upvote_count: 0,
            photo_refs: Vec::new(),
            photo_url: None,
            reporter: Reporter::default(),
        }
    }

    /// Returns the category set: the multi-category list if present,
    /// otherwise the legacy single category.
    #[must_use]
    pub fn categories(&self) -> &[AnnoyanceType] {
        if self.annoyance_types.is_empty() {
            std::slice::from_ref(&self.annoyance_type)
        } else {
            &self.annoyance_types
        }
    }
}

/// Fields shared by both report documents, for code that handles either
/// collection generically.
pub trait ReportDocument: Clone + Send + Sync + 'static {
    /// Collection this document type lives in.
    const KIND: ReportKind;

    /// Document ID.
    fn id(&self) -> &str;

    /// Assigns the document ID.
    fn set_id(&mut self, id: String);

    /// Server-assigned report time.
    fn reported_at(&self) -> DateTime<Utc>;

    /// Sets the server-assigned report time.
    fn set_reported_at(&mut self, at: DateTime<Utc>);

    /// Moderation status.
    fn status(&self) -> ReportStatus;

    /// Mutable access to the counters and attachments touched after
    /// creation.
    fn engagement_mut(&mut self) -> Engagement<'_>;

    /// Wraps the document in a [`Report`].
    fn into_report(self) -> Report;
}

/// Mutable view of the post-creation fields of a report.
#[derive(Debug)]
pub struct Engagement<'a> {
    /// Whether anyone has flagged the report.
    pub flagged: &'a mut bool,
    /// Number of flags.
    pub flag_count: &'a mut u32,
    /// Number of upvotes.
    pub upvote_count: &'a mut u32,
    /// Photo URLs.
    pub photo_refs: &'a mut Vec<String>,
    /// First photo URL, kept for readers of the single-photo field.
    pub photo_url: &'a mut Option<String>,
}

macro_rules! impl_report_document {
    ($ty:ident, $kind:ident) => {
        impl ReportDocument for $ty {
            const KIND: ReportKind = ReportKind::$kind;

            fn id(&self) -> &str {
                &self.id
            }

            fn set_id(&mut self, id: String) {
                self.id = id;
            }

            fn reported_at(&self) -> DateTime<Utc> {
                self.reported_at
            }

            fn set_reported_at(&mut self, at: DateTime<Utc>) {
                self.reported_at = at;
            }

            fn status(&self) -> ReportStatus {
                self.status
            }

            fn engagement_mut(&mut self) -> Engagement<'_> {
                Engagement {
                    flagged: &mut self.flagged,
                    flag_count: &mut self.flag_count,
                    upvote_count: &mut self.upvote_count,
                    photo_refs: &mut self.photo_refs,
                    photo_url: &mut self.photo_url,
                }
            }

            fn into_report(self) -> Report {
                Report::$kind(self)
            }
        }
    };
}

impl_report_document!(Incident, Incident);
impl_report_document!(Annoyance, Annoyance);

/// Either kind of report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Report {
    /// A near miss or collision.
    Incident(Incident),
    /// An infrastructure nuisance.
    Annoyance(Annoyance),
}

impl Report {
    /// Returns the report kind.
    #[must_use]
    pub const fn kind(&self) -> ReportKind {
        match self {
            Self::Incident(_) => ReportKind::Incident,
            Self::Annoyance(_) => ReportKind::Annoyance,
        }
    }

    /// Returns the document ID.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Incident(r) => &r.id,
            Self::Annoyance(r) => &r.id,
        }
    }

    /// Returns the report location.
    #[must_use]
    pub const fn location(&self) -> LngLat {
        match self {
            Self::Incident(r) => r.location,
            Self::Annoyance(r) => r.location,
        }
    }

    /// Returns the server-assigned report time.
    #[must_use]
    pub const fn reported_at(&self) -> DateTime<Utc> {
        match self {
            Self::Incident(r) => r.reported_at,
            Self::Annoyance(r) => r.reported_at,
        }
    }

    /// Returns the moderation status.
    #[must_use]
    pub const fn status(&self) -> ReportStatus {
        match self {
            Self::Incident(r) => r.status,
            Self::Annoyance(r) => r.status,
        }
    }
}

/// Upper-cases the first letter of each `_`-separated word and joins
/// them with spaces.
fn title_case(raw: &str) -> String {
    raw.split('_')
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars).collect::<String>()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}
