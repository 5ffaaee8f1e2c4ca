//! Marker placement state machine.
//!
//! A placement moves `Idle → Placing → FormOpen`, stays in `FormOpen`
//! while the marker is dragged, and returns to `Idle` when the form is
//! submitted or closed. Each drop opens a new session; every drop or drag
//! issues a [`ResolutionTicket`] that enrichment results must present to
//! be applied.

use nearmiss_map_infrastructure_models::InfrastructureDescriptor;
use nearmiss_map_report_models::{LngLat, ReportKind};

use crate::SessionError;

/// Identifies one open form, from marker drop to submit or close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u64);

/// Where the placement flow currently is.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlacementState {
    /// No placement in progress.
    Idle,
    /// Waiting for the user to pick a location.
    Placing {
        /// Report type being placed.
        kind: ReportKind,
    },
    /// Marker dropped and the report form is open.
    FormOpen {
        /// Report type being written.
        kind: ReportKind,
        /// The open session.
        session: SessionId,
        /// Current marker position.
        coordinate: LngLat,
    },
}

/// Which enrichment results are applied when several are in flight for
/// the same session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StalePolicy {
    /// Every result for the open session is applied as it arrives, so a
    /// slow lookup for an earlier marker position can overwrite a newer
    /// one.
    #[default]
    LastResolvedWins,
    /// Only results for the most recent drop or drag are applied.
    LatestRequestWins,
}

/// Proof of which session and request an enrichment result belongs to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolutionTicket {
    session: SessionId,
    sequence: u64,
    coordinate: LngLat,
}

impl ResolutionTicket {
    /// Session the lookup was issued for.
    #[must_use]
    pub const fn session(&self) -> SessionId {
        self.session
    }

    /// Marker position to look up.
    #[must_use]
    pub const fn coordinate(&self) -> LngLat {
        self.coordinate
    }
}

/// State of the single in-flight placement.
#[derive(Debug, Clone)]
pub struct ReportSession {
    state: PlacementState,
    policy: StalePolicy,
    sessions_opened: u64,
    requests_issued: u64,
    infrastructure: Option<InfrastructureDescriptor>,
    location_label: Option<String>,
}

impl Default for ReportSession {
    fn default() -> Self {
        Self::new(StalePolicy::default())
    }
}

impl ReportSession {
    /// Creates an idle session.
    #[must_use]
    pub const fn new(policy: StalePolicy) -> Self {
        Self {
            state: PlacementState::Idle,
            policy,
            sessions_opened: 0,
            requests_issued: 0,
            infrastructure: None,
            location_label: None,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> PlacementState {
        self.state
    }

    /// Stale-result policy in effect.
    #[must_use]
    pub const fn policy(&self) -> StalePolicy {
        self.policy
    }

    /// Infrastructure resolved for the open form, if any.
    #[must_use]
    pub const fn infrastructure(&self) -> Option<&InfrastructureDescriptor> {
        self.infrastructure.as_ref()
    }

    /// Display address resolved for the open form, if any.
    #[must_use]
    pub fn location_label(&self) -> Option<&str> {
        self.location_label.as_deref()
    }

    /// Begins placing a report of `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::PlacementInProgress`] unless idle.
    pub fn start_placing(&mut self, kind: ReportKind) -> Result<(), SessionError> {
        if self.state != PlacementState::Idle {
            return Err(SessionError::PlacementInProgress);
        }
        self.state = PlacementState::Placing { kind };
        Ok(())
    }

    /// Drops the marker, opening the form in a new session.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotPlacing`] unless a placement was started.
    pub fn drop_marker(&mut self, coordinate: LngLat) -> Result<ResolutionTicket, SessionError> {
        let PlacementState::Placing { kind } = self.state else {
            return Err(SessionError::NotPlacing);
        };
        self.sessions_opened += 1;
        let session = SessionId(self.sessions_opened);
        self.state = PlacementState::FormOpen {
            kind,
            session,
            coordinate,
        };
        self.infrastructure = None;
        self.location_label = None;
        Ok(self.issue(session, coordinate))
    }

    /// Moves the dropped marker within the open session.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NoOpenForm`] unless the form is open.
    pub fn move_marker(&mut self, coordinate: LngLat) -> Result<ResolutionTicket, SessionError> {
        let PlacementState::FormOpen {
            kind, session, ..
        } = self.state
        else {
            return Err(SessionError::NoOpenForm);
        };
        self.state = PlacementState::FormOpen {
            kind,
            session,
            coordinate,
        };
        Ok(self.issue(session, coordinate))
    }

    const fn issue(&mut self, session: SessionId, coordinate: LngLat) -> ResolutionTicket {
        self.requests_issued += 1;
        ResolutionTicket {
            session,
            sequence: self.requests_issued,
            coordinate,
        }
    }

    fn accepts(&self, ticket: &ResolutionTicket) -> bool {
        let PlacementState::FormOpen { session, .. } = self.state else {
            return false;
        };
        if session != ticket.session {
            return false;
        }
        match self.policy {
            StalePolicy::LastResolvedWins => true,
            StalePolicy::LatestRequestWins => ticket.sequence == self.requests_issued,
        }
    }

    /// Applies an infrastructure lookup result. Returns whether it was
    /// applied; results for a closed or superseded session are discarded.
    pub fn apply_infrastructure(
        &mut self,
        ticket: &ResolutionTicket,
        infrastructure: Option<InfrastructureDescriptor>,
    ) -> bool {
        if !self.accepts(ticket) {
            log::debug!("Discarding stale infrastructure for {:?}", ticket.session);
            return false;
        }
        self.infrastructure = infrastructure;
        true
    }

    /// Applies a reverse-geocoded display address. Same rules as
    /// [`Self::apply_infrastructure`].
    pub fn apply_location_label(&mut self, ticket: &ResolutionTicket, label: String) -> bool {
        if !self.accepts(ticket) {
            log::debug!("Discarding stale address for {:?}", ticket.session);
            return false;
        }
        self.location_label = Some(label);
        true
    }

    /// Closes the form (or cancels placing) and returns to idle.
    pub fn close(&mut self) {
        self.state = PlacementState::Idle;
        self.infrastructure = None;
        self.location_label = None;
    }

    /// Closes the form only if `session` is still the open one.
    pub fn finish(&mut self, session: SessionId) -> bool {
        match self.state {
            PlacementState::FormOpen { session: open, .. } if open == session => {
                self.close();
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(id: i64) -> InfrastructureDescriptor {
        InfrastructureDescriptor {
            osm_way_id: id,
            name: None,
            road_type: None,
            road_type_label: "Unknown".to_string(),
            speed_limit: None,
            bike_infrastructure: None,
            lanes: None,
            lit: None,
            surface: None,
            one_way: None,
            sidewalk: None,
        }
    }

    fn open(policy: StalePolicy) -> (ReportSession, ResolutionTicket) {
        let mut session = ReportSession::new(policy);
        session.start_placing(ReportKind::Incident).unwrap();
        let ticket = session.drop_marker(LngLat::new(144.96, -37.81)).unwrap();
        (session, ticket)
    }

    #[test]
    fn walks_through_states() {
        let mut session = ReportSession::default();
        assert_eq!(session.state(), PlacementState::Idle);

        session.start_placing(ReportKind::Annoyance).unwrap();
        assert_eq!(
            session.state(),
            PlacementState::Placing {
                kind: ReportKind::Annoyance
            }
        );

        let ticket = session.drop_marker(LngLat::new(1.0, 2.0)).unwrap();
        session.move_marker(LngLat::new(1.5, 2.5)).unwrap();
        let PlacementState::FormOpen {
            kind,
            session: id,
            coordinate,
        } = session.state()
        else {
            panic!("form should be open");
        };
        assert_eq!(kind, ReportKind::Annoyance);
        assert_eq!(coordinate, LngLat::new(1.5, 2.5));
        assert_eq!(id, ticket.session());

        session.close();
        assert_eq!(session.state(), PlacementState::Idle);
    }

    #[test]
    fn rejects_out_of_order_transitions() {
        let mut session = ReportSession::default();
        assert!(matches!(
            session.drop_marker(LngLat::new(0.0, 0.0)),
            Err(SessionError::NotPlacing)
        ));
        assert!(matches!(
            session.move_marker(LngLat::new(0.0, 0.0)),
            Err(SessionError::NoOpenForm)
        ));

        session.start_placing(ReportKind::Incident).unwrap();
        assert!(matches!(
            session.start_placing(ReportKind::Annoyance),
            Err(SessionError::PlacementInProgress)
        ));
    }

    #[test]
    fn results_after_close_are_discarded() {
        let (mut session, ticket) = open(StalePolicy::default());
        session.close();
        assert!(!session.apply_infrastructure(&ticket, Some(descriptor(1))));
        assert!(session.infrastructure().is_none());
    }

    #[test]
    fn results_for_a_previous_session_are_discarded() {
        let (mut session, first) = open(StalePolicy::default());
        session.close();
        session.start_placing(ReportKind::Incident).unwrap();
        let second = session.drop_marker(LngLat::new(0.0, 0.0)).unwrap();

        assert!(!session.apply_infrastructure(&first, Some(descriptor(1))));
        assert!(session.apply_infrastructure(&second, Some(descriptor(2))));
        assert_eq!(session.infrastructure().unwrap().osm_way_id, 2);
    }

    #[test]
    fn last_resolved_wins_by_default() {
        let (mut session, dropped) = open(StalePolicy::LastResolvedWins);
        let dragged = session.move_marker(LngLat::new(144.97, -37.82)).unwrap();

        assert!(session.apply_infrastructure(&dragged, Some(descriptor(2))));
        assert!(session.apply_infrastructure(&dropped, Some(descriptor(1))));
        assert_eq!(session.infrastructure().unwrap().osm_way_id, 1);
    }

    #[test]
    fn latest_request_guard_drops_superseded_results() {
        let (mut session, dropped) = open(StalePolicy::LatestRequestWins);
        let dragged = session.move_marker(LngLat::new(144.97, -37.82)).unwrap();

        assert!(session.apply_infrastructure(&dragged, Some(descriptor(2))));
        assert!(!session.apply_infrastructure(&dropped, Some(descriptor(1))));
        assert!(!session.apply_location_label(&dropped, "old".to_string()));
        assert_eq!(session.infrastructure().unwrap().osm_way_id, 2);
        assert_eq!(session.location_label(), None);
    }

    #[test]
    fn finish_only_closes_matching_session() {
        let (mut session, ticket) = open(StalePolicy::default());
        session.close();
        session.start_placing(ReportKind::Incident).unwrap();
        session.drop_marker(LngLat::new(0.0, 0.0)).unwrap();

        assert!(!session.finish(ticket.session()));
        assert!(matches!(session.state(), PlacementState::FormOpen { .. }));
    }
}
