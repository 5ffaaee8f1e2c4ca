#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geometry helpers for matching pins to roads and rebuilding routes.
//!
//! Distances use an equirectangular approximation (degrees scaled by
//! 111,320 m, longitude additionally by the cosine of latitude). It is
//! accurate to well under a metre at the 25 m search radius used for road
//! matching and is only ever used to rank candidates or detect gaps, never
//! to report a distance to a user.
//!
//! Coordinates are [`geo::Coord`] with `x` = longitude and `y` = latitude.

pub mod polyline;

use geo::{Coord, LineString};

pub use polyline::{PolylineError, decode_polyline, encode_polyline};

/// Metres per degree of latitude (and of longitude at the equator).
pub const METRES_PER_DEGREE: f64 = 111_320.0;

/// Kilometres per degree, used for gap detection.
const KM_PER_DEGREE: f64 = 111.32;

/// Approximate ground distance in metres from `point` to the closest point
/// on the segment `a`–`b`.
///
/// The projection parameter is clamped to `[0, 1]` so the closest point
/// never lies beyond either endpoint. A zero-length segment measures the
/// distance to `a`. Longitude is scaled by the cosine of the point's
/// latitude.
#[must_use]
pub fn point_to_segment_distance(point: Coord<f64>, a: Coord<f64>, b: Coord<f64>) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len_sq = dx.mul_add(dx, dy * dy);

    let t = if len_sq == 0.0 {
        0.0
    } else {
        ((point.x - a.x).mul_add(dx, (point.y - a.y) * dy) / len_sq).clamp(0.0, 1.0)
    };

    let closest_x = t.mul_add(dx, a.x);
    let closest_y = t.mul_add(dy, a.y);

    let dlat = (point.y - closest_y) * METRES_PER_DEGREE;
    let dlng = (point.x - closest_x) * METRES_PER_DEGREE * point.y.to_radians().cos();

    dlat.hypot(dlng)
}

/// Minimum distance in metres from `point` to any segment of a way.
///
/// Returns [`f64::INFINITY`] for ways with fewer than two vertices, so
/// degenerate ways always sort last.
#[must_use]
pub fn nearest_way_distance(point: Coord<f64>, vertices: &[Coord<f64>]) -> f64 {
    vertices
        .windows(2)
        .map(|pair| point_to_segment_distance(point, pair[0], pair[1]))
        .fold(f64::INFINITY, f64::min)
}

/// Approximate distance in kilometres between two consecutive route
/// points, scaling longitude by the cosine of their mean latitude.
fn step_distance_km(a: Coord<f64>, b: Coord<f64>) -> f64 {
    let mean_lat = f64::midpoint(a.y, b.y);
    let dlat = (b.y - a.y) * KM_PER_DEGREE;
    let dlng = (b.x - a.x) * KM_PER_DEGREE * mean_lat.to_radians().cos();
    dlat.hypot(dlng)
}

/// Splits a coordinate sequence wherever two consecutive points are more
/// than `max_gap_km` apart.
///
/// Runs with fewer than two points (including a lone point stranded
/// between two gaps) are dropped, so every returned line is drawable.
#[must_use]
pub fn split_at_gaps(coords: &[Coord<f64>], max_gap_km: f64) -> Vec<LineString<f64>> {
    let Some((&first, rest)) = coords.split_first() else {
        return Vec::new();
    };

    let mut runs = Vec::new();
    let mut current = vec![first];
    let mut prev = first;

    for &coord in rest {
        if step_distance_km(prev, coord) > max_gap_km {
            if current.len() >= 2 {
                runs.push(LineString::new(std::mem::take(&mut current)));
            } else {
                current.clear();
            }
            log::trace!(
                "Gap after ({}, {}) exceeds {max_gap_km} km; starting new run",
                prev.x,
                prev.y
            );
        }
        current.push(coord);
        prev = coord;
    }

    if current.len() >= 2 {
        runs.push(LineString::new(current));
    }

    runs
}
