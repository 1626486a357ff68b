use chrono::{Datelike, NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Serialize, Serializer};
use uuid::Uuid;

use shared_database::DatabaseError;
use shared_models::error::AppError;

// ==============================================================================
// AVAILABILITY RULES
// ==============================================================================

/// Weekly open interval of a specialist for one specialty
/// (disponibilidad horaria). `weekday` is 0 = Sunday .. 6 = Saturday.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AvailabilityRule {
    pub id: i64,
    pub specialist_id: Uuid,
    pub specialty_id: i64,
    pub weekday: u8,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub slot_duration_minutes: u32,
    pub active: bool,
}

impl AvailabilityRule {
    /// Number of whole slots that fit in the interval.
    pub fn slot_count(&self) -> u32 {
        if self.slot_duration_minutes == 0 || self.start_time >= self.end_time {
            return 0;
        }
        (minutes_of_day(self.end_time) - minutes_of_day(self.start_time)) / self.slot_duration_minutes
    }

    pub fn overlaps(&self, start: NaiveTime, end: NaiveTime) -> bool {
        start < self.end_time && end > self.start_time
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAvailabilityRuleRequest {
    pub specialist_id: Uuid,
    pub specialty_id: i64,
    pub weekday: u8,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub slot_duration_minutes: Option<u32>,
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAvailabilityRuleRequest {
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub slot_duration_minutes: Option<u32>,
    pub active: Option<bool>,
}

/// Row written on insert; the store assigns the id.
#[derive(Debug, Clone, Serialize)]
pub struct NewAvailabilityRule {
    pub specialist_id: Uuid,
    pub specialty_id: i64,
    pub weekday: u8,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub slot_duration_minutes: u32,
    pub active: bool,
}

/// PATCH body; unset fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct AvailabilityRuleChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<NaiveTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<NaiveTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot_duration_minutes: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

// ==============================================================================
// SLOTS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotQuery {
    pub specialist_id: Uuid,
    pub specialty_id: i64,
    pub date: NaiveDate,
}

/// Bookable times for one (specialist, specialty, date).
#[derive(Debug, Clone, Serialize)]
pub struct SlotAvailability {
    pub specialist_id: Uuid,
    pub specialty_id: i64,
    pub date: NaiveDate,
    #[serde(serialize_with = "serialize_hhmm")]
    pub slots: Vec<NaiveTime>,
    /// Informational note, set when the specialist has no rules that day.
    pub message: Option<String>,
}

fn serialize_hhmm<S: Serializer>(times: &[NaiveTime], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(times.iter().map(|t| t.format("%H:%M").to_string()))
}

// ==============================================================================
// SPECIALTIES
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Specialty {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSpecialtyRequest {
    pub name: String,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AvailabilityError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Availability rule not found")]
    NotFound,

    #[error("Specialty not found")]
    SpecialtyNotFound,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not authorized: {0}")]
    Forbidden(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<AvailabilityError> for AppError {
    fn from(err: AvailabilityError) -> Self {
        match err {
            AvailabilityError::Validation(msg) => AppError::ValidationError(msg),
            AvailabilityError::NotFound => AppError::NotFound("Availability rule not found".to_string()),
            AvailabilityError::SpecialtyNotFound => AppError::NotFound("Specialty not found".to_string()),
            AvailabilityError::Conflict(msg) => AppError::Conflict(msg),
            AvailabilityError::Forbidden(msg) => AppError::Forbidden(msg),
            AvailabilityError::Database(db) => db.into(),
        }
    }
}

// ==============================================================================
// HELPERS
// ==============================================================================

/// Day of week with Sunday = 0, the convention used by the rule table.
pub fn weekday_index(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

pub fn minutes_of_day(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}
