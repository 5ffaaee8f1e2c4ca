#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Persistence contracts for reports and report photos.
//!
//! The document database and the object store live outside this
//! workspace. [`ReportStore`] and [`PhotoStore`] are the narrow seams the
//! rest of the system talks to; [`memory`] provides in-process
//! implementations used by the CLI and tests.
//!
//! Live subscriptions are [`tokio::sync::watch`] channels that always hold
//! the latest full snapshot of approved documents, newest first, capped at
//! [`SNAPSHOT_LIMIT`].

pub mod memory;

use async_trait::async_trait;
use nearmiss_map_report_models::{
    AdminCapability, Annoyance, Incident, Report, ReportDocument, ReportKind, ReportStatus,
};
use thiserror::Error;
use tokio::sync::watch;

pub use memory::{MemoryPhotoStore, MemoryReportStore};

/// Maximum number of documents in a live snapshot, per kind.
pub const SNAPSHOT_LIMIT: usize = 2000;

/// Errors from persistence operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The document does not exist.
    #[error("No {kind} with id {id}")]
    NotFound {
        /// Collection searched.
        kind: ReportKind,
        /// Requested document ID.
        id: String,
    },

    /// Uploading a photo failed.
    #[error("Failed to upload {key}: {message}")]
    Upload {
        /// Object key.
        key: String,
        /// Description of the failure.
        message: String,
    },

    /// The backing service failed or is unreachable.
    #[error("Store unavailable: {message}")]
    Unavailable {
        /// Description of the failure.
        message: String,
    },
}

/// Counters that can be atomically incremented on a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    /// Flag for moderation. Also sets `flagged`.
    Flag,
    /// Upvote.
    Upvote,
}

/// Report document store.
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Persists a new report, assigning its ID and report time.
    ///
    /// Returns the new document ID.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the write fails.
    async fn add(&self, report: Report) -> Result<String, StoreError>;

    /// Replaces the photo URLs on an existing report and sets the
    /// single-photo field to the first of them.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the report does not exist.
    async fn set_photos(
        &self,
        kind: ReportKind,
        id: &str,
        photo_refs: Vec<String>,
    ) -> Result<(), StoreError>;

    /// Atomically increments a counter on a report.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the report does not exist.
    async fn increment(&self, kind: ReportKind, id: &str, counter: Counter)
    -> Result<(), StoreError>;

    /// Deletes a report. Requires an admin capability.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the report does not exist.
    async fn delete(
        &self,
        kind: ReportKind,
        id: &str,
        capability: &AdminCapability,
    ) -> Result<(), StoreError>;

    /// Subscribes to the live incident snapshot.
    fn subscribe_incidents(&self) -> watch::Receiver<Vec<Incident>>;

    /// Subscribes to the live annoyance snapshot.
    fn subscribe_annoyances(&self) -> watch::Receiver<Vec<Annoyance>>;
}

/// Binary object store for report photos.
#[async_trait]
pub trait PhotoStore: Send + Sync {
    /// Uploads `bytes` under `key` and returns a URL for the object.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Upload`] if the upload fails.
    async fn upload(
        &self,
        key: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, StoreError>;
}

/// Object key for the `index`th photo of a report:
/// `{collection}/{documentId}_{index}.{ext}`.
#[must_use]
pub fn photo_key(kind: ReportKind, document_id: &str, index: usize, ext: &str) -> String {
    format!("{}/{document_id}_{index}.{ext}", kind.collection())
}

/// Keeps only approved documents, newest first, at most
/// [`SNAPSHOT_LIMIT`] of them.
///
/// The sort is stable, so documents with equal report times keep their
/// input order.
#[must_use]
pub fn latest_approved<T: ReportDocument>(docs: impl IntoIterator<Item = T>) -> Vec<T> {
    let mut approved: Vec<T> = docs
        .into_iter()
        .filter(|d| d.status() == ReportStatus::Approved)
        .collect();
    approved.sort_by(|a, b| b.reported_at().cmp(&a.reported_at()));
    approved.truncate(SNAPSHOT_LIMIT);
    approved
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use nearmiss_map_report_models::{AnnoyanceType, LngLat};

    fn annoyance(id: &str, minutes: i64, status: ReportStatus) -> Annoyance {
        let mut a = Annoyance::new(
            LngLat::new(144.96, -37.81),
            AnnoyanceType::GlassDebris,
            "Broken glass across the whole lane",
        );
        a.id = id.to_string();
        a.status = status;
        a.reported_at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
            + Duration::minutes(minutes);
        a
    }

    #[test]
    fn photo_keys_use_collection_prefix() {
        assert_eq!(
            photo_key(ReportKind::Incident, "abc", 0, "jpg"),
            "incidents/abc_0.jpg"
        );
        assert_eq!(
            photo_key(ReportKind::Annoyance, "xyz", 2, "png"),
            "annoyances/xyz_2.png"
        );
    }

    #[test]
    fn snapshot_drops_unapproved_and_orders_newest_first() {
        let docs = vec![
            annoyance("old", 1, ReportStatus::Approved),
            annoyance("pending", 5, ReportStatus::PendingVerification),
            annoyance("new", 3, ReportStatus::Approved),
        ];
        let ids: Vec<String> = latest_approved(docs).into_iter().map(|a| a.id).collect();
        assert_eq!(ids, ["new", "old"]);
    }

    #[test]
    fn snapshot_caps_at_limit_keeping_most_recent() {
        let docs: Vec<Annoyance> = (0..2500)
            .map(|i| annoyance(&i.to_string(), i, ReportStatus::Approved))
            .collect();
        let snapshot = latest_approved(docs);
        assert_eq!(snapshot.len(), SNAPSHOT_LIMIT);
        assert_eq!(snapshot[0].id, "2499");
        assert_eq!(snapshot[SNAPSHOT_LIMIT - 1].id, "500");
    }

    #[test]
    fn snapshot_sort_is_stable_for_equal_times() {
        let docs = vec![
            annoyance("a", 0, ReportStatus::Approved),
            annoyance("b", 0, ReportStatus::Approved),
        ];
        let ids: Vec<String> = latest_approved(docs).into_iter().map(|a| a.id).collect();
        assert_eq!(ids, ["a", "b"]);
    }
}
