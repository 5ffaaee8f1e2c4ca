//! In-process [`ReportStore`] and [`PhotoStore`] implementations.
//!
//! Every mutation republishes the affected collection's snapshot, so
//! subscribers see the same full-snapshot stream a realtime database
//! listener would deliver.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use nearmiss_map_report_models::{
    AdminCapability, Annoyance, Engagement, Incident, Report, ReportDocument, ReportKind,
};
use tokio::sync::{Mutex, watch};

use crate::{Counter, PhotoStore, ReportStore, StoreError, latest_approved};

/// One collection of documents plus its live snapshot channel.
struct Collection<T: ReportDocument> {
    docs: Mutex<Vec<T>>,
    snapshot: watch::Sender<Vec<T>>,
}

impl<T: ReportDocument> Collection<T> {
    fn new() -> Self {
        let (snapshot, _) = watch::channel(Vec::new());
        Self {
            docs: Mutex::new(Vec::new()),
            snapshot,
        }
    }

    fn publish(&self, docs: &[T]) {
        self.snapshot.send_replace(latest_approved(docs.iter().cloned()));
    }

    async fn insert(&self, doc: T) {
        let mut docs = self.docs.lock().await;
        docs.push(doc);
        self.publish(&docs);
    }

    async fn update(
        &self,
        id: &str,
        apply: impl FnOnce(Engagement<'_>) + Send,
    ) -> Result<(), StoreError> {
        let mut docs = self.docs.lock().await;
        let doc = docs
            .iter_mut()
            .find(|d| d.id() == id)
            .ok_or_else(|| StoreError::NotFound {
                kind: T::KIND,
                id: id.to_string(),
            })?;
        apply(doc.engagement_mut());
        self.publish(&docs);
        Ok(())
    }

    async fn remove(&self, id: &str) -> Result<(), StoreError> {
        let mut docs = self.docs.lock().await;
        let before = docs.len();
        docs.retain(|d| d.id() != id);
        if docs.len() == before {
            return Err(StoreError::NotFound {
                kind: T::KIND,
                id: id.to_string(),
            });
        }
        self.publish(&docs);
        Ok(())
    }
}

/// Report store held entirely in memory.
pub struct MemoryReportStore {
    incidents: Collection<Incident>,
    annoyances: Collection<Annoyance>,
}

impl Default for MemoryReportStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryReportStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            incidents: Collection::new(),
            annoyances: Collection::new(),
        }
    }

    /// Inserts an existing document as-is, keeping its report time and
    /// status. A missing ID is generated.
    ///
    /// Used to seed the store from exported documents.
    pub async fn import(&self, report: Report) -> String {
        match report {
            Report::Incident(mut doc) => {
                let id = ensure_id(&mut doc);
                self.incidents.insert(doc).await;
                id
            }
            Report::Annoyance(mut doc) => {
                let id = ensure_id(&mut doc);
                self.annoyances.insert(doc).await;
                id
            }
        }
    }

    async fn update(
        &self,
        kind: ReportKind,
        id: &str,
        apply: impl FnOnce(Engagement<'_>) + Send,
    ) -> Result<(), StoreError> {
        match kind {
            ReportKind::Incident => self.incidents.update(id, apply).await,
            ReportKind::Annoyance => self.annoyances.update(id, apply).await,
        }
    }
}

fn ensure_id<T: ReportDocument>(doc: &mut T) -> String {
    if doc.id().is_empty() {
        doc.set_id(uuid::Uuid::new_v4().simple().to_string());
    }
    doc.id().to_string()
}

fn prepare_new<T: ReportDocument>(mut doc: T) -> (String, T) {
    let id = uuid::Uuid::new_v4().simple().to_string();
    doc.set_id(id.clone());
    doc.set_reported_at(Utc::now());
    (id, doc)
}

#[async_trait]
impl ReportStore for MemoryReportStore {
    async fn add(&self, report: Report) -> Result<String, StoreError> {
        let id = match report {
            Report::Incident(doc) => {
                let (id, doc) = prepare_new(doc);
                self.incidents.insert(doc).await;
                id
            }
            Report::Annoyance(doc) => {
                let (id, doc) = prepare_new(doc);
                self.annoyances.insert(doc).await;
                id
            }
        };
        log::debug!("Added report {id}");
        Ok(id)
    }

    async fn set_photos(
        &self,
        kind: ReportKind,
        id: &str,
        photo_refs: Vec<String>,
    ) -> Result<(), StoreError> {
        self.update(kind, id, move |e| {
            *e.photo_url = photo_refs.first().cloned();
            *e.photo_refs = photo_refs;
        })
        .await
    }

    async fn increment(
        &self,
        kind: ReportKind,
        id: &str,
        counter: Counter,
    ) -> Result<(), StoreError> {
        self.update(kind, id, move |e| match counter {
            Counter::Flag => {
                *e.flagged = true;
                *e.flag_count = e.flag_count.saturating_add(1);
            }
            Counter::Upvote => {
                *e.upvote_count = e.upvote_count.saturating_add(1);
            }
        })
        .await
    }

    async fn delete(
        &self,
        kind: ReportKind,
        id: &str,
        capability: &AdminCapability,
    ) -> Result<(), StoreError> {
        match kind {
            ReportKind::Incident => self.incidents.remove(id).await?,
            ReportKind::Annoyance => self.annoyances.remove(id).await?,
        }
        log::info!("{} deleted {kind} {id}", capability.uid());
        Ok(())
    }

    fn subscribe_incidents(&self) -> watch::Receiver<Vec<Incident>> {
        self.incidents.snapshot.subscribe()
    }

    fn subscribe_annoyances(&self) -> watch::Receiver<Vec<Annoyance>> {
        self.annoyances.snapshot.subscribe()
    }
}

/// A stored photo object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// MIME type given at upload.
    pub content_type: String,
    /// Object bytes.
    pub bytes: Vec<u8>,
}

/// Photo store held entirely in memory. URLs are `{base_url}/{key}`.
pub struct MemoryPhotoStore {
    base_url: String,
    objects: Mutex<BTreeMap<String, StoredObject>>,
}

impl MemoryPhotoStore {
    /// Creates an empty store serving URLs under `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            objects: Mutex::new(BTreeMap::new()),
        }
    }

    /// Returns the object stored under `key`.
    pub async fn get(&self, key: &str) -> Option<StoredObject> {
        self.objects.lock().await.get(key).cloned()
    }
}

#[async_trait]
impl PhotoStore for MemoryPhotoStore {
    async fn upload(
        &self,
        key: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, StoreError> {
        log::debug!("Storing {} bytes at {key}", bytes.len());
        self.objects.lock().await.insert(
            key.to_string(),
            StoredObject {
                content_type: content_type.to_string(),
                bytes,
            },
        );
        Ok(format!("{}/{key}", self.base_url.trim_end_matches('/')))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nearmiss_map_report_models::{
        AnnoyanceType, IncidentType, LngLat, ReportStatus, Scariness, User, UserRole,
    };

    fn incident(status: ReportStatus) -> Report {
        let mut doc = Incident::new(
            LngLat::new(144.96, -37.81),
            IncidentType::Dooring,
            Scariness::VeryScary,
            "Car door opened right in front of me",
        );
        doc.status = status;
        Report::Incident(doc)
    }

    fn admin() -> AdminCapability {
        User {
            uid: "mod-1".to_string(),
            display_name: None,
            email: None,
            role: UserRole::Moderator,
        }
        .admin_capability()
        .unwrap()
    }

    #[tokio::test]
    async fn add_assigns_id_and_publishes_approved_only() {
        let store = MemoryReportStore::new();
        let mut rx = store.subscribe_incidents();

        let id = store.add(incident(ReportStatus::Approved)).await.unwrap();
        store
            .add(incident(ReportStatus::PendingVerification))
            .await
            .unwrap();

        assert!(!id.is_empty());
        let snapshot = rx.borrow_and_update().clone();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id, id);
        assert!(snapshot[0].reported_at.timestamp() > 0);
    }

    #[tokio::test]
    async fn flag_sets_flagged_and_counts() {
        let store = MemoryReportStore::new();
        let id = store.add(incident(ReportStatus::Approved)).await.unwrap();

        store
            .increment(ReportKind::Incident, &id, Counter::Flag)
            .await
            .unwrap();
        store
            .increment(ReportKind::Incident, &id, Counter::Flag)
            .await
            .unwrap();
        store
            .increment(ReportKind::Incident, &id, Counter::Upvote)
            .await
            .unwrap();

        let doc = store.subscribe_incidents().borrow()[0].clone();
        assert!(doc.flagged);
        assert_eq!(doc.flag_count, 2);
        assert_eq!(doc.upvote_count, 1);
    }

    #[tokio::test]
    async fn increment_on_wrong_collection_is_not_found() {
        let store = MemoryReportStore::new();
        let id = store.add(incident(ReportStatus::Approved)).await.unwrap();
        let err = store
            .increment(ReportKind::Annoyance, &id, Counter::Upvote)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::NotFound {
                kind: ReportKind::Annoyance,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn delete_removes_from_snapshot() {
        let store = MemoryReportStore::new();
        let id = store
            .add(Report::Annoyance({
                let mut a = Annoyance::new(
                    LngLat::new(144.96, -37.81),
                    AnnoyanceType::Overgrown,
                    "Bushes block half the shared path",
                );
                a.status = ReportStatus::Approved;
                a
            }))
            .await
            .unwrap();
        assert_eq!(store.subscribe_annoyances().borrow().len(), 1);

        store
            .delete(ReportKind::Annoyance, &id, &admin())
            .await
            .unwrap();
        assert!(store.subscribe_annoyances().borrow().is_empty());
        assert!(
            store
                .delete(ReportKind::Annoyance, &id, &admin())
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn set_photos_replaces_refs() {
        let store = MemoryReportStore::new();
        let id = store.add(incident(ReportStatus::Approved)).await.unwrap();
        store
            .set_photos(ReportKind::Incident, &id, vec!["u1".into(), "u2".into()])
            .await
            .unwrap();
        let saved = store.subscribe_incidents().borrow()[0].clone();
        assert_eq!(saved.photo_refs, vec!["u1".to_string(), "u2".to_string()]);
        assert_eq!(saved.photo_url.as_deref(), Some("u1"));
    }

    #[tokio::test]
    async fn import_keeps_existing_fields() {
        let store = MemoryReportStore::new();
        let Report::Incident(mut doc) = incident(ReportStatus::Approved) else {
            unreachable!()
        };
        doc.id = "legacy".to_string();
        let id = store.import(Report::Incident(doc)).await;
        assert_eq!(id, "legacy");
        assert_eq!(
            store.subscribe_incidents().borrow()[0].reported_at.timestamp(),
            0
        );
    }

    #[tokio::test]
    async fn photo_store_returns_url_per_key() {
        let photos = MemoryPhotoStore::new("https://photos.example/");
        let url = photos
            .upload("incidents/abc_0.jpg", "image/jpeg", vec![1, 2, 3])
            .await
            .unwrap();
        assert_eq!(url, "https://photos.example/incidents/abc_0.jpg");
        assert_eq!(
            photos.get("incidents/abc_0.jpg").await.unwrap().bytes,
            vec![1, 2, 3]
        );
    }
}
