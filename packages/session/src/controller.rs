//! Application state for creating and moderating reports.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use nearmiss_map_geocoder::{ReverseGeocoder, reverse_geocode_or_coordinate};
use nearmiss_map_infrastructure::{RoadGraph, resolve_infrastructure};
use nearmiss_map_infrastructure_models::InfrastructureDescriptor;
use nearmiss_map_report_models::{
    Annoyance, Incident, LngLat, Report, ReportKind, ReportStatus, Reporter, User,
};
use nearmiss_map_store::{Counter, PhotoStore, ReportStore, photo_key};

use crate::{
    AnnoyanceForm, IncidentForm, PhotoUpload, PlacementState, ReportSession, ResolutionTicket,
    SessionError, SessionId, StalePolicy,
};

/// Owns the placement session, the signed-in user, and every external
/// collaborator needed to create and moderate reports.
///
/// Clones share the same session. The session lock is never held across
/// an await.
#[derive(Clone)]
pub struct ReportController {
    user: Option<User>,
    store: Arc<dyn ReportStore>,
    photos: Arc<dyn PhotoStore>,
    road_graph: Arc<dyn RoadGraph>,
    geocoder: Arc<dyn ReverseGeocoder>,
    session: Arc<Mutex<ReportSession>>,
}

impl ReportController {
    /// Creates a controller with no signed-in user and the default stale
    /// policy.
    #[must_use]
    pub fn new(
        store: Arc<dyn ReportStore>,
        photos: Arc<dyn PhotoStore>,
        road_graph: Arc<dyn RoadGraph>,
        geocoder: Arc<dyn ReverseGeocoder>,
    ) -> Self {
        Self {
            user: None,
            store,
            photos,
            road_graph,
            geocoder,
            session: Arc::new(Mutex::new(ReportSession::default())),
        }
    }

    /// Replaces the session with a fresh one using `policy`.
    #[must_use]
    pub fn with_stale_policy(mut self, policy: StalePolicy) -> Self {
        self.session = Arc::new(Mutex::new(ReportSession::new(policy)));
        self
    }

    /// Sets or clears the signed-in user.
    pub fn set_user(&mut self, user: Option<User>) {
        self.user = user;
    }

    /// The signed-in user, if any.
    #[must_use]
    pub const fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    fn session(&self) -> MutexGuard<'_, ReportSession> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current placement state.
    #[must_use]
    pub fn state(&self) -> PlacementState {
        self.session().state()
    }

    /// Infrastructure resolved for the open form.
    #[must_use]
    pub fn infrastructure(&self) -> Option<InfrastructureDescriptor> {
        self.session().infrastructure().cloned()
    }

    /// Display address resolved for the open form.
    #[must_use]
    pub fn location_label(&self) -> Option<String> {
        self.session().location_label().map(str::to_string)
    }

    /// Begins placing a report.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::PlacementInProgress`] unless idle.
    pub fn start_placing(&self, kind: ReportKind) -> Result<(), SessionError> {
        self.session().start_placing(kind)
    }

    /// Closes the form or cancels placing. In-flight lookups for the
    /// closed session are discarded when they complete.
    pub fn close(&self) {
        self.session().close();
    }

    /// Drops the marker and opens the form without waiting for
    /// enrichment. Pass the ticket to [`Self::resolve`].
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotPlacing`] unless a placement was started.
    pub fn drop_marker(&self, coordinate: LngLat) -> Result<ResolutionTicket, SessionError> {
        self.session().drop_marker(coordinate)
    }

    /// Moves the marker within the open form. Pass the ticket to
    /// [`Self::resolve`].
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NoOpenForm`] unless the form is open.
    pub fn move_marker(&self, coordinate: LngLat) -> Result<ResolutionTicket, SessionError> {
        self.session().move_marker(coordinate)
    }

    /// Looks up infrastructure and the display address for a ticket's
    /// coordinate, applying both if the session still accepts the ticket.
    /// Returns whether the infrastructure result was applied.
    pub async fn resolve(&self, ticket: ResolutionTicket) -> bool {
        let point = ticket.coordinate();
        let (infrastructure, label) = tokio::join!(
            resolve_infrastructure(self.road_graph.as_ref(), point),
            reverse_geocode_or_coordinate(self.geocoder.as_ref(), point),
        );

        let mut session = self.session();
        session.apply_location_label(&ticket, label);
        session.apply_infrastructure(&ticket, infrastructure)
    }

    /// Drops the marker and waits for enrichment.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotPlacing`] unless a placement was started.
    pub async fn place_marker(&self, coordinate: LngLat) -> Result<(), SessionError> {
        let ticket = self.drop_marker(coordinate)?;
        self.resolve(ticket).await;
        Ok(())
    }

    /// Moves the marker and waits for enrichment.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NoOpenForm`] unless the form is open.
    pub async fn drag_marker(&self, coordinate: LngLat) -> Result<(), SessionError> {
        let ticket = self.move_marker(coordinate)?;
        self.resolve(ticket).await;
        Ok(())
    }

    fn open_form(
        &self,
        submitted: ReportKind,
    ) -> Result<(SessionId, LngLat, Option<InfrastructureDescriptor>), SessionError> {
        let session = self.session();
        match session.state() {
            PlacementState::FormOpen {
                kind,
                session: id,
                coordinate,
            } => {
                if kind != submitted {
                    return Err(SessionError::KindMismatch {
                        open: kind,
                        submitted,
                    });
                }
                Ok((id, coordinate, session.infrastructure().cloned()))
            }
            _ => Err(SessionError::NoOpenForm),
        }
    }

    /// Submits the open incident form.
    ///
    /// The report is saved as approved with the road name, resolved
    /// infrastructure, and reporter attached; photos are then uploaded
    /// and attached. On success the form closes. Returns the new report
    /// ID.
    ///
    /// # Errors
    ///
    /// * [`SessionError::Validation`] if the form is invalid
    /// * [`SessionError::NoOpenForm`] / [`SessionError::KindMismatch`] if
    ///   no incident form is open
    /// * [`SessionError::Store`] if saving fails; the form stays open
    pub async fn submit_incident(&self, form: &IncidentForm) -> Result<String, SessionError> {
        let (incident_type, description) = form.validate()?;
        let (session, coordinate, infrastructure) = self.open_form(ReportKind::Incident)?;
        let road_name = reverse_geocode_or_coordinate(self.geocoder.as_ref(), coordinate).await;

        let mut incident = Incident::new(coordinate, incident_type, form.scariness, description);
        incident.incident_types.clone_from(&form.incident_types);
        incident.occurred_at = form.occurred_at;
        incident.contact_made = form.contact_made;
        incident.injury_occurred = form.injury_occurred;
        incident.other_party.clone_from(&form.other_party);
        incident.conditions = Some(form.conditions.normalized());
        incident.rider = form.rider.normalized();
        incident.contact = form.contact.normalized();
        incident.road_name = road_name;
        incident.infrastructure = infrastructure;
        incident.status = ReportStatus::Approved;
        incident.reporter = Reporter::for_user(self.user.as_ref());

        self.persist(session, Report::Incident(incident), &form.photos)
            .await
    }

    /// Submits the open annoyance form. Same flow as
    /// [`Self::submit_incident`].
    ///
    /// # Errors
    ///
    /// Same as [`Self::submit_incident`].
    pub async fn submit_annoyance(&self, form: &AnnoyanceForm) -> Result<String, SessionError> {
        let (annoyance_type, description) = form.validate()?;
        let (session, coordinate, infrastructure) = self.open_form(ReportKind::Annoyance)?;
        let road_name = reverse_geocode_or_coordinate(self.geocoder.as_ref(), coordinate).await;

        let mut annoyance = Annoyance::new(coordinate, annoyance_type, description);
        annoyance.annoyance_types.clone_from(&form.annoyance_types);
        annoyance.occurred_at = form.occurred_at;
        annoyance.is_ongoing = form.is_ongoing;
        annoyance.rider = form.rider.normalized();
        annoyance.contact = form.contact.normalized();
        annoyance.road_name = road_name;
        annoyance.infrastructure = infrastructure;
        annoyance.status = ReportStatus::Approved;
        annoyance.reporter = Reporter::for_user(self.user.as_ref());

        self.persist(session, Report::Annoyance(annoyance), &form.photos)
            .await
    }

    async fn persist(
        &self,
        session: SessionId,
        report: Report,
        photos: &[PhotoUpload],
    ) -> Result<String, SessionError> {
        let kind = report.kind();
        let id = self
            .store
            .add(report)
            .await
            .inspect_err(|e| log::error!("Error submitting {kind}: {e}"))?;
        log::info!("Submitted {kind} {id}");

        let urls = self.upload_photos(kind, &id, photos).await;
        if !urls.is_empty() {
            if let Err(e) = self.store.set_photos(kind, &id, urls).await {
                log::warn!("Failed to attach photos to {kind} {id}: {e}");
            }
        }

        self.session().finish(session);
        Ok(id)
    }

    async fn upload_photos(&self, kind: ReportKind, id: &str, photos: &[PhotoUpload]) -> Vec<String> {
        let mut urls = Vec::with_capacity(photos.len());
        for (index, photo) in photos.iter().enumerate() {
            let key = photo_key(kind, id, index, photo.extension());
            match self
                .photos
                .upload(&key, &photo.content_type, photo.bytes.clone())
                .await
            {
                Ok(url) => urls.push(url),
                Err(e) => log::warn!("Photo upload failed for {key}: {e}"),
            }
        }
        urls
    }

    async fn bump(&self, kind: ReportKind, id: &str, counter: Counter) -> bool {
        match self.store.increment(kind, id, counter).await {
            Ok(()) => true,
            Err(e) => {
                log::error!("{counter:?} error on {kind} {id}: {e}");
                false
            }
        }
    }

    /// Flags a report for review. Failures are logged; returns whether
    /// the flag was recorded.
    pub async fn flag(&self, kind: ReportKind, id: &str) -> bool {
        self.bump(kind, id, Counter::Flag).await
    }

    /// Upvotes a report. Failures are logged; returns whether the vote
    /// was recorded.
    pub async fn upvote(&self, kind: ReportKind, id: &str) -> bool {
        self.bump(kind, id, Counter::Upvote).await
    }

    /// Deletes a report. Only admins and moderators may delete.
    ///
    /// # Errors
    ///
    /// * [`SessionError::Unauthorized`] without an admin capability; the
    ///   store is not called
    /// * [`SessionError::Store`] if the delete fails
    pub async fn delete(&self, kind: ReportKind, id: &str) -> Result<(), SessionError> {
        let Some(capability) = self.user.as_ref().and_then(User::admin_capability) else {
            log::warn!("Refusing to delete {kind} {id} without admin capability");
            return Err(SessionError::Unauthorized);
        };
        self.store.delete(kind, id, &capability).await?;
        Ok(())
    }
}
