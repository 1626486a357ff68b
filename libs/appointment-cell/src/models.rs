use std::ops::RangeInclusive;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use availability_cell::AvailabilityError;
use shared_database::DatabaseError;
use shared_models::auth::Role;
use shared_models::error::AppError;

pub use shared_models::AppointmentStatus;

pub const NOT_AVAILABLE: &str = "N/A";

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

/// A booked turno. Rows are never deleted; cancellation and rejection are
/// terminal statuses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: i64,
    pub patient_id: Uuid,
    pub specialist_id: Uuid,
    pub specialty_id: i64,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub duration_minutes: u32,
    pub status: AppointmentStatus,
    pub cancellation_reason: Option<String>,
    pub cancelled_by: Option<Uuid>,
    pub cancelled_by_role: Option<Role>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub specialist_note: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub rating: Option<u8>,
    pub rating_comment: Option<String>,
    #[serde(default)]
    pub survey_completed: bool,
    pub survey_answers: Option<SurveyAnswers>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row written when a patient requests a slot.
#[derive(Debug, Clone, Serialize)]
pub struct NewAppointment {
    pub patient_id: Uuid,
    pub specialist_id: Uuid,
    pub specialty_id: i64,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub duration_minutes: u32,
    pub status: AppointmentStatus,
    pub survey_completed: bool,
}

/// PATCH body produced by the lifecycle. Unset fields are left untouched.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AppointmentUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AppointmentStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancellation_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancelled_by: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancelled_by_role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejected_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specialist_note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating_comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub survey_completed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub survey_answers: Option<SurveyAnswers>,
    pub updated_at: DateTime<Utc>,
}

impl AppointmentUpdate {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            status: None,
            cancellation_reason: None,
            cancelled_by: None,
            cancelled_by_role: None,
            cancelled_at: None,
            rejection_reason: None,
            rejected_at: None,
            specialist_note: None,
            completed_at: None,
            rating: None,
            rating_comment: None,
            survey_completed: None,
            survey_answers: None,
            updated_at: now,
        }
    }
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct RequestAppointmentRequest {
    /// Defaults to the caller. Admins booking on a patient's behalf must set it.
    pub patient_id: Option<Uuid>,
    pub specialist_id: Uuid,
    pub specialty_id: i64,
    pub date: NaiveDate,
    #[serde(deserialize_with = "deserialize_slot_time")]
    pub time: NaiveTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RejectAppointmentRequest {
    pub reason: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CancelAppointmentRequest {
    pub reason: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompleteAppointmentRequest {
    pub note: String,
}

/// Scores arrive as plain JSON numbers so that out-of-range or fractional
/// values reach validation instead of failing deserialization.
#[derive(Debug, Clone, Deserialize)]
pub struct RateAppointmentRequest {
    pub rating: f64,
    pub comment: String,
}

/// Satisfaction survey as submitted by the patient.
#[derive(Debug, Clone, Deserialize)]
pub struct SurveyRequest {
    pub overall_experience: f64,
    pub professionalism: f64,
    pub would_recommend: f64,
    pub comments: Option<String>,
}

impl SurveyRequest {
    /// Each score must be a whole number from 1 to 10. Blank comments are dropped.
    pub fn into_answers(self) -> Result<SurveyAnswers, AppointmentError> {
        Ok(SurveyAnswers {
            overall_experience: whole_score(self.overall_experience, "overall_experience", 1..=10)?,
            professionalism: whole_score(self.professionalism, "professionalism", 1..=10)?,
            would_recommend: whole_score(self.would_recommend, "would_recommend", 1..=10)?,
            comments: self
                .comments
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty()),
        })
    }
}

/// Stored survey of a completed visit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SurveyAnswers {
    pub overall_experience: u8,
    pub professionalism: u8,
    pub would_recommend: u8,
    pub comments: Option<String>,
}

pub fn whole_score(value: f64, field: &str, range: RangeInclusive<u8>) -> Result<u8, AppointmentError> {
    let (min, max) = (*range.start(), *range.end());
    if value.fract() != 0.0 || value < f64::from(min) || value > f64::from(max) {
        return Err(AppointmentError::Validation(format!(
            "{} must be a whole number between {} and {}",
            field, min, max
        )));
    }
    Ok(value as u8)
}

/// Slot times travel as "HH:MM"; full "HH:MM:SS" is accepted as well.
fn deserialize_slot_time<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
    let raw = String::deserialize(deserializer)?;
    NaiveTime::parse_from_str(&raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(&raw, "%H:%M"))
        .map_err(|_| serde::de::Error::custom(format!("invalid time '{}', expected HH:MM", raw)))
}

// ==============================================================================
// QUERY MODELS
// ==============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppointmentFilters {
    pub status: Option<AppointmentStatus>,
    pub specialty_id: Option<i64>,
    /// Case-insensitive text matched against specialty, specialist and
    /// patient names.
    pub q: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatsQuery {
    pub specialist_id: Option<Uuid>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AttendedQuery {
    pub specialist_id: Option<Uuid>,
}

/// Store-level selection. Results are ordered by date then time, newest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppointmentQuery {
    pub patient_id: Option<Uuid>,
    pub specialist_id: Option<Uuid>,
    pub status: Option<AppointmentStatus>,
    pub specialty_id: Option<i64>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

// ==============================================================================
// READ MODEL
// ==============================================================================

/// Row of the `profiles` table as needed for listings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Profile {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub role: Option<String>,
    pub national_id: Option<String>,
    pub health_insurance: Option<String>,
    pub profile_image_url: Option<String>,
}

impl Profile {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
            .trim()
            .to_string()
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AppointmentDetails {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub patient: Option<Profile>,
    pub specialist: Option<Profile>,
    pub specialty_name: String,
    pub patient_name: String,
    pub specialist_name: String,
}

impl AppointmentDetails {
    pub fn matches_text(&self, needle: &str) -> bool {
        let needle = needle.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }

        [&self.specialty_name, &self.specialist_name, &self.patient_name]
            .iter()
            .any(|name| name.to_lowercase().contains(&needle))
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AppointmentStats {
    pub total: usize,
    pub completed: usize,
    pub cancelled: usize,
    pub pending: usize,
    pub accepted: usize,
    pub rejected: usize,
    /// Mean of the ratings given; `None` when nothing has been rated.
    pub average_rating: Option<f64>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Visit {
    pub appointment_id: i64,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub specialty_name: String,
}

/// A patient seen by a specialist with their most recent visits.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AttendedPatient {
    pub patient_id: Uuid,
    pub patient_name: String,
    pub patient: Option<Profile>,
    pub visits: Vec<Visit>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Specialty not found")]
    SpecialtyNotFound,

    #[error("{0}")]
    Validation(String),

    #[error("Cannot move appointment from {current} to {attempted}")]
    InvalidTransition {
        current: AppointmentStatus,
        attempted: AppointmentStatus,
    },

    #[error("The requested slot is already taken")]
    SlotTaken,

    #[error("Appointment has already been rated")]
    AlreadyRated,

    #[error("Survey has already been completed")]
    SurveyAlreadyCompleted,

    #[error("Appointment was modified by another request")]
    StaleState,

    #[error("Not authorized: {0}")]
    Forbidden(String),

    #[error(transparent)]
    Availability(#[from] AvailabilityError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::NotFound | AppointmentError::SpecialtyNotFound => {
                AppError::NotFound(err.to_string())
            }
            AppointmentError::Validation(msg) => AppError::ValidationError(msg),
            AppointmentError::InvalidTransition { .. } => AppError::ValidationError(err.to_string()),
            AppointmentError::SlotTaken
            | AppointmentError::AlreadyRated
            | AppointmentError::SurveyAlreadyCompleted
            | AppointmentError::StaleState => AppError::Conflict(err.to_string()),
            AppointmentError::Forbidden(msg) => AppError::Forbidden(msg),
            AppointmentError::Availability(e) => e.into(),
            AppointmentError::Database(e) => e.into(),
        }
    }
}
