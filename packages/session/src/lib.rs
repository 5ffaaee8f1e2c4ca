#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Report placement and submission.
//!
//! [`ReportController`] is the application state for creating and
//! moderating reports: it owns the signed-in user, the single
//! [`ReportSession`], and the store, photo, road-graph, and geocoding
//! collaborators.

pub mod controller;
pub mod form;
pub mod placement;

use nearmiss_map_report_models::ReportKind;
use nearmiss_map_store::StoreError;

pub use controller::ReportController;
pub use form::{AnnoyanceForm, IncidentForm, PhotoUpload, ValidationError};
pub use placement::{PlacementState, ReportSession, ResolutionTicket, SessionId, StalePolicy};

/// Errors from placement and submission.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// A placement is already in progress.
    #[error("A report is already being placed")]
    PlacementInProgress,

    /// Tried to drop a marker without starting a placement.
    #[error("Not placing a report")]
    NotPlacing,

    /// The operation needs an open report form.
    #[error("No report form is open")]
    NoOpenForm,

    /// The submitted form is for a different report type than the open
    /// placement.
    #[error("Open form is for {open}, not {submitted}")]
    KindMismatch {
        /// Kind of the open placement.
        open: ReportKind,
        /// Kind of the submitted form.
        submitted: ReportKind,
    },

    /// The form failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Persisting the report failed.
    #[error("Failed to save report: {0}")]
    Store(#[from] StoreError),

    /// The user lacks the capability for this operation.
    #[error("Not authorized")]
    Unauthorized,
}
