//! Clustering parameters for the report source.
//!
//! The render surface clusters the merged collection itself; these are the
//! settings it should be configured with.

/// Pixel radius within which points merge into a cluster.
pub const CLUSTER_RADIUS_PX: u32 = 50;

/// Highest zoom level at which points are clustered.
pub const CLUSTER_MAX_ZOOM: u8 = 14;

/// Point counts at which cluster styling steps up.
pub const CLUSTER_STEPS: [u32; 2] = [10, 25];

/// Step-wise cluster styling: a value for counts below the first step,
/// one for counts from the first step, and one from the second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Steps<T> {
    /// Below [`CLUSTER_STEPS`]`[0]`.
    pub small: T,
    /// From [`CLUSTER_STEPS`]`[0]`.
    pub medium: T,
    /// From [`CLUSTER_STEPS`]`[1]`.
    pub large: T,
}

impl<T: Copy> Steps<T> {
    /// Picks the value for a cluster of `count` points.
    #[must_use]
    pub const fn for_count(&self, count: u32) -> T {
        if count >= CLUSTER_STEPS[1] {
            self.large
        } else if count >= CLUSTER_STEPS[0] {
            self.medium
        } else {
            self.small
        }
    }
}

/// Cluster circle appearance for one layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClusterStyle {
    /// Fill colour by count.
    pub color: Steps<&'static str>,
    /// Circle radius in pixels by count.
    pub radius: Steps<u32>,
}

impl ClusterStyle {
    /// Incident clusters: amber, orange, red.
    pub const INCIDENTS: Self = Self {
        color: Steps {
            small: "#f59e0b",
            medium: "#f97316",
            large: "#ef4444",
        },
        radius: Steps {
            small: 18,
            medium: 24,
            large: 30,
        },
    };

    /// Annoyance clusters: always amber, smaller circles.
    pub const ANNOYANCES: Self = Self {
        color: Steps {
            small: "#f59e0b",
            medium: "#f59e0b",
            large: "#f59e0b",
        },
        radius: Steps {
            small: 14,
            medium: 18,
            large: 22,
        },
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_at_ten_and_twenty_five() {
        let style = ClusterStyle::INCIDENTS;
        assert_eq!(style.color.for_count(9), "#f59e0b");
        assert_eq!(style.color.for_count(10), "#f97316");
        assert_eq!(style.radius.for_count(24), 24);
        assert_eq!(style.radius.for_count(25), 30);
        assert_eq!(ClusterStyle::ANNOYANCES.radius.for_count(100), 22);
    }
}
