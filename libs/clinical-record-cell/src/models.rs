use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_database::DatabaseError;
use shared_models::error::AppError;

/// Free-form entries a specialist may attach to a record.
pub const MAX_ADDITIONAL_DATA: usize = 3;

// ==============================================================================
// CLINICAL RECORD MODELS
// ==============================================================================

/// One historia clínica entry, written by a specialist after a visit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClinicalRecord {
    pub id: i64,
    pub patient_id: Uuid,
    pub specialist_id: Uuid,
    pub appointment_id: Option<i64>,
    pub recorded_at: DateTime<Utc>,
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
    pub temperature_c: Option<f64>,
    /// "systolic/diastolic"
    pub blood_pressure: Option<String>,
    #[serde(default)]
    pub additional_data: Vec<AdditionalDatum>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdditionalDatum {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateClinicalRecordRequest {
    pub patient_id: Uuid,
    pub appointment_id: Option<i64>,
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
    pub temperature_c: Option<f64>,
    pub systolic: Option<f64>,
    pub diastolic: Option<f64>,
    #[serde(default)]
    pub additional_data: Vec<AdditionalDatum>,
}

/// Validated measurements, ready to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurements {
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
    pub temperature_c: Option<f64>,
    pub blood_pressure: Option<String>,
    pub additional_data: Vec<AdditionalDatum>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewClinicalRecord {
    pub patient_id: Uuid,
    pub specialist_id: Uuid,
    pub appointment_id: Option<i64>,
    pub recorded_at: DateTime<Utc>,
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
    pub temperature_c: Option<f64>,
    pub blood_pressure: Option<String>,
    pub additional_data: Vec<AdditionalDatum>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClinicalRecordQuery {
    /// Only records linked to the patient's completed appointments in this specialty.
    pub specialty_id: Option<i64>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ClinicalRecordError {
    #[error("{0}")]
    Validation(String),

    #[error("Linked appointment not found")]
    AppointmentNotFound,

    #[error("Not authorized: {0}")]
    Forbidden(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<ClinicalRecordError> for AppError {
    fn from(err: ClinicalRecordError) -> Self {
        match err {
            ClinicalRecordError::Validation(msg) => AppError::ValidationError(msg),
            ClinicalRecordError::AppointmentNotFound => AppError::NotFound(err.to_string()),
            ClinicalRecordError::Forbidden(msg) => AppError::Forbidden(msg),
            ClinicalRecordError::Database(e) => e.into(),
        }
    }
}
