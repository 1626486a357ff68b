use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use appointment_cell::{AppointmentQuery, AppointmentStatus, AppointmentStore, SupabaseAppointmentStore};
use shared_config::AppConfig;
use shared_database::{DatabaseError, PostgrestQuery, SupabaseClient};
use shared_models::auth::{Role, SessionContext};

use crate::models::{
    ClinicalRecord, ClinicalRecordError, ClinicalRecordQuery, CreateClinicalRecordRequest, NewClinicalRecord,
};
use crate::services::validation::validate_measurements;

pub const CLINICAL_RECORDS_TABLE: &str = "clinical_records";

#[async_trait]
pub trait ClinicalRecordStore: Send + Sync {
    async fn insert(&self, record: &NewClinicalRecord, auth_token: &str) -> Result<ClinicalRecord, DatabaseError>;

    /// Newest first. `appointment_ids` restricts to records linked to those appointments.
    async fn for_patient(
        &self,
        patient_id: Uuid,
        appointment_ids: Option<&[i64]>,
        auth_token: &str,
    ) -> Result<Vec<ClinicalRecord>, DatabaseError>;
}

pub struct SupabaseClinicalRecordStore {
    supabase: SupabaseClient,
}

impl SupabaseClinicalRecordStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }
}

#[async_trait]
impl ClinicalRecordStore for SupabaseClinicalRecordStore {
    async fn insert(&self, record: &NewClinicalRecord, auth_token: &str) -> Result<ClinicalRecord, DatabaseError> {
        self.supabase.insert(CLINICAL_RECORDS_TABLE, record, auth_token).await
    }

    async fn for_patient(
        &self,
        patient_id: Uuid,
        appointment_ids: Option<&[i64]>,
        auth_token: &str,
    ) -> Result<Vec<ClinicalRecord>, DatabaseError> {
        let mut query = PostgrestQuery::table(CLINICAL_RECORDS_TABLE).eq("patient_id", patient_id);
        if let Some(ids) = appointment_ids {
            query = query.in_list("appointment_id", ids.iter());
        }

        self.supabase.select(&query.order("recorded_at", false), auth_token).await
    }
}

pub struct ClinicalRecordService {
    records: Arc<dyn ClinicalRecordStore>,
    appointments: Arc<dyn AppointmentStore>,
}

impl ClinicalRecordService {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_stores(
            Arc::new(SupabaseClinicalRecordStore::new(config)),
            Arc::new(SupabaseAppointmentStore::new(config)),
        )
    }

    pub fn with_stores(records: Arc<dyn ClinicalRecordStore>, appointments: Arc<dyn AppointmentStore>) -> Self {
        Self { records, appointments }
    }

    /// Specialists write records. When an appointment is linked it must be
    /// one they completed with the same patient.
    pub async fn create_record(
        &self,
        request: CreateClinicalRecordRequest,
        session: &SessionContext,
    ) -> Result<ClinicalRecord, ClinicalRecordError> {
        if session.role != Role::Specialist {
            return Err(ClinicalRecordError::Forbidden(
                "Only specialists can write clinical records".to_string(),
            ));
        }

        let measurements = validate_measurements(&request)?;

        if let Some(appointment_id) = request.appointment_id {
            let appointment = self.appointments
                .find_by_id(appointment_id, &session.auth_token)
                .await?
                .ok_or(ClinicalRecordError::AppointmentNotFound)?;

            if !session.is(appointment.specialist_id) {
                return Err(ClinicalRecordError::Forbidden(
                    "The linked appointment belongs to another specialist".to_string(),
                ));
            }
            if appointment.status != AppointmentStatus::Completed {
                return Err(ClinicalRecordError::Validation(format!(
                    "The linked appointment must be completed (current status: {})",
                    appointment.status
                )));
            }
            if appointment.patient_id != request.patient_id {
                return Err(ClinicalRecordError::Validation(
                    "The linked appointment is for a different patient".to_string(),
                ));
            }
        }

        let record = NewClinicalRecord {
            patient_id: request.patient_id,
            specialist_id: session.user_id,
            appointment_id: request.appointment_id,
            recorded_at: Utc::now(),
            height_cm: measurements.height_cm,
            weight_kg: measurements.weight_kg,
            temperature_c: measurements.temperature_c,
            blood_pressure: measurements.blood_pressure,
            additional_data: measurements.additional_data,
        };

        let created = self.records.insert(&record, &session.auth_token).await?;
        info!("Clinical record {} created for patient {}", created.id, created.patient_id);
        Ok(created)
    }

    /// A patient's history, readable by the patient, any specialist or an admin.
    pub async fn records_for_patient(
        &self,
        patient_id: Uuid,
        query: &ClinicalRecordQuery,
        session: &SessionContext,
    ) -> Result<Vec<ClinicalRecord>, ClinicalRecordError> {
        let allowed = match session.role {
            Role::Patient => session.is(patient_id),
            Role::Specialist | Role::Admin => true,
        };
        if !allowed {
            return Err(ClinicalRecordError::Forbidden(
                "Patients can only read their own clinical history".to_string(),
            ));
        }

        let Some(specialty_id) = query.specialty_id else {
            return Ok(self.records.for_patient(patient_id, None, &session.auth_token).await?);
        };

        let visits = self.appointments.list(
            &AppointmentQuery {
                patient_id: Some(patient_id),
                status: Some(AppointmentStatus::Completed),
                specialty_id: Some(specialty_id),
                ..Default::default()
            },
            &session.auth_token,
        ).await?;

        let appointment_ids: Vec<i64> = visits.iter().map(|visit| visit.id).collect();
        debug!(
            "Patient {} has {} completed appointments in specialty {}",
            patient_id,
            appointment_ids.len(),
            specialty_id
        );

        if appointment_ids.is_empty() {
            return Ok(Vec::new());
        }

        Ok(self.records
            .for_patient(patient_id, Some(appointment_ids.as_slice()), &session.auth_token)
            .await?)
    }
}
