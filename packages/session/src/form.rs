//! Report forms and submission rules.

use chrono::{DateTime, Utc};
use nearmiss_map_report_models::{
    AnnoyanceType, Conditions, ContactDetails, IncidentType, RiderDetails, Scariness,
};

/// Minimum description length, in characters after trimming.
pub const MIN_DESCRIPTION_CHARS: usize = 20;

/// Maximum description length, in characters after trimming.
pub const MAX_DESCRIPTION_CHARS: usize = 1000;

/// Why a form cannot be submitted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Description shorter than [`MIN_DESCRIPTION_CHARS`].
    #[error("Description must be at least {MIN_DESCRIPTION_CHARS} characters (got {length})")]
    DescriptionTooShort {
        /// Trimmed length.
        length: usize,
    },

    /// Description longer than [`MAX_DESCRIPTION_CHARS`].
    #[error("Description must be at most {MAX_DESCRIPTION_CHARS} characters (got {length})")]
    DescriptionTooLong {
        /// Trimmed length.
        length: usize,
    },

    /// No category selected.
    #[error("Select at least one category")]
    NoCategory,
}

/// A photo attached to a form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoUpload {
    /// Original file name; the extension is taken from it.
    pub file_name: String,
    /// MIME type.
    pub content_type: String,
    /// File contents.
    pub bytes: Vec<u8>,
}

impl PhotoUpload {
    /// Text after the last `.` of the file name, or the whole name if it
    /// has none.
    #[must_use]
    pub fn extension(&self) -> &str {
        self.file_name.rsplit('.').next().unwrap_or_default()
    }
}

/// Returns the trimmed description if its length is within bounds.
///
/// # Errors
///
/// Returns [`ValidationError`] if the trimmed description is too short or
/// too long.
pub fn validate_description(description: &str) -> Result<&str, ValidationError> {
    let trimmed = description.trim();
    let length = trimmed.chars().count();
    if length < MIN_DESCRIPTION_CHARS {
        return Err(ValidationError::DescriptionTooShort { length });
    }
    if length > MAX_DESCRIPTION_CHARS {
        return Err(ValidationError::DescriptionTooLong { length });
    }
    Ok(trimmed)
}

/// Incident form contents.
#[derive(Debug, Clone, PartialEq)]
pub struct IncidentForm {
    /// Selected incident types, primary first.
    pub incident_types: Vec<IncidentType>,
    /// How scary it was.
    pub scariness: Scariness,
    /// What happened.
    pub description: String,
    /// When it happened.
    pub occurred_at: Option<DateTime<Utc>>,
    /// Whether there was physical contact.
    pub contact_made: bool,
    /// Whether anyone was hurt.
    pub injury_occurred: bool,
    /// Other party tag, e.g. `car` or `delivery_van`.
    pub other_party: Option<String>,
    /// Lighting, weather, and surface at the time.
    pub conditions: Conditions,
    /// Optional rider details.
    pub rider: RiderDetails,
    /// Optional follow-up contact.
    pub contact: ContactDetails,
    /// Photos to upload after the report is saved.
    pub photos: Vec<PhotoUpload>,
}

impl IncidentForm {
    /// Creates a form with a single category and no optional details.
    #[must_use]
    pub fn new(
        incident_type: IncidentType,
        scariness: Scariness,
        description: impl Into<String>,
    ) -> Self {
        Self {
            incident_types: vec![incident_type],
            scariness,
            description: description.into(),
            occurred_at: None,
            contact_made: false,
            injury_occurred: false,
            other_party: None,
            conditions: Conditions::default(),
            rider: RiderDetails::default(),
            contact: ContactDetails::default(),
            photos: Vec::new(),
        }
    }

    /// Checks the form, returning the primary category and trimmed
    /// description.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] if no category is selected or the
    /// description is out of bounds.
    pub fn validate(&self) -> Result<(IncidentType, &str), ValidationError> {
        let primary = *self
            .incident_types
            .first()
            .ok_or(ValidationError::NoCategory)?;
        Ok((primary, validate_description(&self.description)?))
    }
}

/// Annoyance form contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnoyanceForm {
    /// Selected annoyance types, primary first.
    pub annoyance_types: Vec<AnnoyanceType>,
    /// What the problem is.
    pub description: String,
    /// When it was seen.
    pub occurred_at: Option<DateTime<Utc>>,
    /// Ongoing problem rather than a one-off.
    pub is_ongoing: bool,
    /// Optional rider details; the annoyance form asks only for age and
    /// gender.
    pub rider: RiderDetails,
    /// Optional follow-up contact.
    pub contact: ContactDetails,
    /// Photos to upload after the report is saved.
    pub photos: Vec<PhotoUpload>,
}

impl AnnoyanceForm {
    /// Creates a form with a single category and no optional details.
    #[must_use]
    pub fn new(annoyance_type: AnnoyanceType, description: impl Into<String>) -> Self {
        Self {
            annoyance_types: vec![annoyance_type],
            description: description.into(),
            occurred_at: None,
            is_ongoing: false,
            rider: RiderDetails::default(),
            contact: ContactDetails::default(),
            photos: Vec::new(),
        }
    }

    /// Checks the form, returning the primary category and trimmed
    /// description.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] if no category is selected or the
    /// description is out of bounds.
    pub fn validate(&self) -> Result<(AnnoyanceType, &str), ValidationError> {
        let primary = *self
            .annoyance_types
            .first()
            .ok_or(ValidationError::NoCategory)?;
        Ok((primary, validate_description(&self.description)?))
    }
}
