#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Merges the incident and annoyance streams into one render layer.
//!
//! [`ReportAggregator`] holds the latest snapshot of each collection and
//! the active [`ReportFilters`]. Any change to either snapshot or to the
//! filters recomputes the output from scratch with [`recompute`], so the
//! result never depends on which stream updated last.
//!
//! [`driver::run_aggregator`] wires the aggregator to live store
//! subscriptions and a [`driver::ReportSink`].

pub mod driver;
pub mod feature;
pub mod style;

use geojson::FeatureCollection;
use nearmiss_map_report_models::{Annoyance, Incident, ReportKind, Scariness};
use nearmiss_map_store::latest_approved;

pub use driver::{ReportSink, run_aggregator};
pub use feature::ReportFeature;
pub use nearmiss_map_store::SNAPSHOT_LIMIT as MAX_REPORTS_PER_KIND;
pub use style::ClusterStyle;

/// Active map filters. `None` means "any".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportFilters {
    /// Show only one kind of report.
    pub kind: Option<ReportKind>,
    /// Show only reports carrying this raw category tag.
    pub category: Option<String>,
    /// Show only incidents at this scariness. Annoyances are unaffected.
    pub scariness: Option<Scariness>,
}

/// Output of one recompute.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedReports {
    /// Surviving features, incidents first.
    pub features: Vec<ReportFeature>,
    /// Number of incident features.
    pub incident_count: usize,
    /// Number of annoyance features.
    pub annoyance_count: usize,
    /// Human-readable summary, e.g. `"3 incidents, 1 annoyance"`.
    pub count_text: String,
}

impl RenderedReports {
    /// Converts the features to a GeoJSON collection for a clustered
    /// render source.
    ///
    /// # Errors
    ///
    /// Returns [`serde_json::Error`] if feature properties fail to
    /// serialize.
    pub fn to_feature_collection(&self) -> Result<FeatureCollection, serde_json::Error> {
        Ok(FeatureCollection {
            bbox: None,
            features: self
                .features
                .iter()
                .map(ReportFeature::to_geojson)
                .collect::<Result<_, _>>()?,
            foreign_members: None,
        })
    }
}

fn pluralize(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

/// Builds the count summary shown next to the filters.
///
/// With a kind filter only that kind is counted (including zero).
/// Otherwise non-zero kinds are joined with `", "`, or `"0 reports"` if
/// both are empty.
#[must_use]
pub fn count_text(kind: Option<ReportKind>, incident_count: usize, annoyance_count: usize) -> String {
    match kind {
        Some(ReportKind::Incident) => pluralize(incident_count, "incident"),
        Some(ReportKind::Annoyance) => pluralize(annoyance_count, "annoyance"),
        None => {
            let mut parts = Vec::with_capacity(2);
            if incident_count > 0 {
                parts.push(pluralize(incident_count, "incident"));
            }
            if annoyance_count > 0 {
                parts.push(pluralize(annoyance_count, "annoyance"));
            }
            if parts.is_empty() {
                "0 reports".to_string()
            } else {
                parts.join(", ")
            }
        }
    }
}

fn has_category<T: AsRef<str>>(categories: &[T], filters: &ReportFilters) -> bool {
    filters
        .category
        .as_deref()
        .is_none_or(|wanted| categories.iter().any(|c| c.as_ref() == wanted))
}

fn incident_matches(incident: &Incident, filters: &ReportFilters) -> bool {
    has_category(incident.categories(), filters)
        && filters.scariness.is_none_or(|s| incident.scariness == s)
}

fn annoyance_matches(annoyance: &Annoyance, filters: &ReportFilters) -> bool {
    has_category(annoyance.categories(), filters)
}

/// Applies `filters` to both collections and merges the survivors.
///
/// Pure and idempotent: the same inputs always give the same output.
#[must_use]
pub fn recompute(
    incidents: &[Incident],
    annoyances: &[Annoyance],
    filters: &ReportFilters,
) -> RenderedReports {
    let show_incidents = filters.kind != Some(ReportKind::Annoyance);
    let show_annoyances = filters.kind != Some(ReportKind::Incident);

    let mut features = Vec::new();

    if show_incidents {
        features.extend(
            incidents
                .iter()
                .filter(|r| incident_matches(r, filters))
                .cloned()
                .map(ReportFeature::Incident),
        );
    }
    let incident_count = features.len();

    if show_annoyances {
        features.extend(
            annoyances
                .iter()
                .filter(|r| annoyance_matches(r, filters))
                .cloned()
                .map(ReportFeature::Annoyance),
        );
    }
    let annoyance_count = features.len() - incident_count;

    RenderedReports {
        count_text: count_text(filters.kind, incident_count, annoyance_count),
        features,
        incident_count,
        annoyance_count,
    }
}

/// Latest snapshots plus filters.
#[derive(Debug, Clone, Default)]
pub struct ReportAggregator {
    incidents: Vec<Incident>,
    annoyances: Vec<Annoyance>,
    filters: ReportFilters,
}

impl ReportAggregator {
    /// Creates an aggregator with empty collections and no filters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the incident collection. Unapproved documents are dropped
    /// and at most the [`MAX_REPORTS_PER_KIND`] newest are kept.
    pub fn set_incidents(&mut self, snapshot: Vec<Incident>) {
        self.incidents = latest_approved(snapshot);
    }

    /// Replaces the annoyance collection. Unapproved documents are dropped
    /// and at most the [`MAX_REPORTS_PER_KIND`] newest are kept.
    pub fn set_annoyances(&mut self, snapshot: Vec<Annoyance>) {
        self.annoyances = latest_approved(snapshot);
    }

    /// Replaces the active filters.
    pub fn set_filters(&mut self, filters: ReportFilters) {
        self.filters = filters;
    }

    /// Active filters.
    #[must_use]
    pub const fn filters(&self) -> &ReportFilters {
        &self.filters
    }

    /// Current incident collection.
    #[must_use]
    pub fn incidents(&self) -> &[Incident] {
        &self.incidents
    }

    /// Current annoyance collection.
    #[must_use]
    pub fn annoyances(&self) -> &[Annoyance] {
        &self.annoyances
    }

    /// Recomputes the rendered output from the current state.
    #[must_use]
    pub fn render(&self) -> RenderedReports {
        recompute(&self.incidents, &self.annoyances, &self.filters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, Utc};
    use nearmiss_map_report_models::{AnnoyanceType, IncidentType, LngLat, ReportStatus};

    fn at(minutes: i64) -> DateTime<Utc> {
        DateTime::<Utc>::default() + Duration::minutes(minutes)
    }

    fn incident(id: &str, t: IncidentType, s: Scariness, minutes: i64) -> Incident {
        let mut r = Incident::new(
            LngLat::new(144.96, -37.81),
            t,
            s,
            "Something happened on the way to work",
        );
        r.id = id.to_string();
        r.status = ReportStatus::Approved;
        r.reported_at = at(minutes);
        r
    }

    fn annoyance(id: &str, t: AnnoyanceType, minutes: i64) -> Annoyance {
        let mut r = Annoyance::new(
            LngLat::new(144.97, -37.80),
            t,
            "Something is in the bike lane again",
        );
        r.id = id.to_string();
        r.status = ReportStatus::Approved;
        r.reported_at = at(minutes);
        r
    }

    fn sample() -> (Vec<Incident>, Vec<Annoyance>) {
        let mut multi = incident("i3", IncidentType::Dooring, Scariness::ABitScary, 3);
        multi.incident_types = vec![IncidentType::Dooring, IncidentType::Overtaking];
        (
            vec![
                incident("i1", IncidentType::Overtaking, Scariness::VeryScary, 1),
                incident("i2", IncidentType::Intersection, Scariness::VeryScary, 2),
                multi,
            ],
            vec![
                annoyance("a1", AnnoyanceType::GlassDebris, 1),
                annoyance("a2", AnnoyanceType::Other, 2),
            ],
        )
    }

    fn ids(rendered: &RenderedReports) -> Vec<&str> {
        rendered.features.iter().map(ReportFeature::id).collect()
    }

    #[test]
    fn count_text_examples() {
        assert_eq!(count_text(None, 3, 1), "3 incidents, 1 annoyance");
        assert_eq!(count_text(None, 0, 0), "0 reports");
        assert_eq!(count_text(None, 0, 2), "2 annoyances");
        assert_eq!(count_text(Some(ReportKind::Incident), 1, 9), "1 incident");
        assert_eq!(count_text(Some(ReportKind::Incident), 0, 9), "0 incidents");
        assert_eq!(count_text(Some(ReportKind::Annoyance), 4, 0), "0 annoyances");
    }

    #[test]
    fn no_filters_concatenates_incidents_first() {
        let (incidents, annoyances) = sample();
        let out = recompute(&incidents, &annoyances, &ReportFilters::default());
        assert_eq!(ids(&out), ["i1", "i2", "i3", "a1", "a2"]);
        assert_eq!(out.count_text, "3 incidents, 2 annoyances");
    }

    #[test]
    fn kind_filter_excludes_other_kind_from_data() {
        let (incidents, annoyances) = sample();
        let filters = ReportFilters {
            kind: Some(ReportKind::Annoyance),
            ..ReportFilters::default()
        };
        let out = recompute(&incidents, &annoyances, &filters);
        assert_eq!(ids(&out), ["a1", "a2"]);
        assert_eq!(out.incident_count, 0);
        assert_eq!(out.count_text, "2 annoyances");
    }

    #[test]
    fn category_filter_uses_multi_category_list() {
        let (incidents, annoyances) = sample();
        let filters = ReportFilters {
            category: Some("overtaking".to_string()),
            ..ReportFilters::default()
        };
        let out = recompute(&incidents, &annoyances, &filters);
        assert_eq!(ids(&out), ["i1", "i3"]);
        assert_eq!(out.count_text, "2 incidents");

        // `other` is a tag in both taxonomies.
        let filters = ReportFilters {
            category: Some("other".to_string()),
            ..ReportFilters::default()
        };
        assert_eq!(ids(&recompute(&incidents, &annoyances, &filters)), ["a2"]);
    }

    #[test]
    fn scariness_filter_leaves_annoyances_alone() {
        let (incidents, annoyances) = sample();
        let filters = ReportFilters {
            scariness: Some(Scariness::VeryScary),
            ..ReportFilters::default()
        };
        let out = recompute(&incidents, &annoyances, &filters);
        assert_eq!(ids(&out), ["i1", "i2", "a1", "a2"]);
    }

    #[test]
    fn recompute_is_idempotent() {
        let (incidents, annoyances) = sample();
        let filters = ReportFilters {
            category: Some("dooring".to_string()),
            ..ReportFilters::default()
        };
        let first = recompute(&incidents, &annoyances, &filters);
        let second = recompute(&incidents, &annoyances, &filters);
        assert_eq!(first, second);

        let mut agg = ReportAggregator::new();
        agg.set_incidents(incidents.clone());
        agg.set_annoyances(annoyances.clone());
        agg.set_filters(filters);
        let before = agg.render();
        // Re-delivering the same snapshot changes nothing.
        agg.set_annoyances(annoyances);
        assert_eq!(agg.render(), before);
    }

    #[test]
    fn aggregator_caps_each_kind_to_most_recent() {
        let incidents: Vec<Incident> = (0..2500)
            .map(|i| {
                incident(
                    &format!("i{i}"),
                    IncidentType::Other,
                    Scariness::NotScary,
                    i,
                )
            })
            .collect();
        let mut agg = ReportAggregator::new();
        agg.set_incidents(incidents);

        assert_eq!(agg.incidents().len(), MAX_REPORTS_PER_KIND);
        assert_eq!(agg.incidents()[0].id, "i2499");
        assert!(agg.incidents().iter().all(|r| r.reported_at >= at(500)));
        assert_eq!(agg.render().count_text, "2000 incidents");
    }

    #[test]
    fn feature_collection_has_one_feature_per_report() {
        let (incidents, annoyances) = sample();
        let out = recompute(&incidents, &annoyances, &ReportFilters::default());
        let fc = out.to_feature_collection().unwrap();
        assert_eq!(fc.features.len(), 5);
        assert_eq!(
            fc.features[3].properties.as_ref().unwrap()["kind"],
            "annoyance"
        );
    }
}
