use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use tracing::debug;
use uuid::Uuid;

use availability_cell::services::specialty::SPECIALTIES_TABLE;
use availability_cell::Specialty;
use shared_config::AppConfig;
use shared_database::{DatabaseError, PostgrestQuery, SupabaseClient};

use crate::models::{Appointment, AppointmentQuery, AppointmentStatus, AppointmentUpdate, NewAppointment, Profile};

pub const APPOINTMENTS_TABLE: &str = "appointments";
pub const PROFILES_TABLE: &str = "profiles";

const PROFILE_COLUMNS: &str = "id,first_name,last_name,role,national_id,health_insurance,profile_image_url";

/// Conditions a write re-checks in storage, so that a concurrent change
/// makes the PATCH match no row instead of being overwritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateGuard {
    pub status: AppointmentStatus,
    pub unrated: bool,
    pub survey_pending: bool,
}

impl UpdateGuard {
    pub fn status(status: AppointmentStatus) -> Self {
        Self {
            status,
            unrated: false,
            survey_pending: false,
        }
    }

    pub fn unrated(mut self) -> Self {
        self.unrated = true;
        self
    }

    pub fn survey_pending(mut self) -> Self {
        self.survey_pending = true;
        self
    }
}

/// Persistence collaborator for appointments.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn find_by_id(&self, appointment_id: i64, auth_token: &str) -> Result<Option<Appointment>, DatabaseError>;

    /// The appointment holding (specialist, date, time) in a blocking status, if any.
    async fn find_blocking(
        &self,
        specialist_id: Uuid,
        date: NaiveDate,
        time: NaiveTime,
        auth_token: &str,
    ) -> Result<Option<Appointment>, DatabaseError>;

    /// Fails with [`DatabaseError::Conflict`] when the storage-level slot
    /// uniqueness constraint rejects the row.
    async fn insert(&self, appointment: &NewAppointment, auth_token: &str) -> Result<Appointment, DatabaseError>;

    /// Applies `changes` only while the row still satisfies `guard`.
    /// Returns `None` when no row matched.
    async fn update_guarded(
        &self,
        appointment_id: i64,
        guard: UpdateGuard,
        changes: &AppointmentUpdate,
        auth_token: &str,
    ) -> Result<Option<Appointment>, DatabaseError>;

    async fn list(&self, query: &AppointmentQuery, auth_token: &str) -> Result<Vec<Appointment>, DatabaseError>;
}

/// Lookup of the people and specialties referenced by appointments.
#[async_trait]
pub trait DirectoryStore: Send + Sync {
    async fn profiles_by_ids(&self, ids: &[Uuid], auth_token: &str) -> Result<Vec<Profile>, DatabaseError>;

    async fn specialties_by_ids(&self, ids: &[i64], auth_token: &str) -> Result<Vec<Specialty>, DatabaseError>;
}

pub struct SupabaseAppointmentStore {
    supabase: SupabaseClient,
}

impl SupabaseAppointmentStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }
}

fn selection(query: &AppointmentQuery) -> PostgrestQuery {
    let mut postgrest = PostgrestQuery::table(APPOINTMENTS_TABLE);

    if let Some(patient_id) = query.patient_id {
        postgrest = postgrest.eq("patient_id", patient_id);
    }
    if let Some(specialist_id) = query.specialist_id {
        postgrest = postgrest.eq("specialist_id", specialist_id);
    }
    if let Some(status) = query.status {
        postgrest = postgrest.eq("status", status);
    }
    if let Some(specialty_id) = query.specialty_id {
        postgrest = postgrest.eq("specialty_id", specialty_id);
    }
    if let Some(from) = query.date_from {
        postgrest = postgrest.gte("date", from);
    }
    if let Some(to) = query.date_to {
        postgrest = postgrest.lte("date", to);
    }

    postgrest.order("date", false).order("time", false)
}

fn guarded(appointment_id: i64, guard: UpdateGuard) -> PostgrestQuery {
    let mut postgrest = PostgrestQuery::table(APPOINTMENTS_TABLE)
        .eq("id", appointment_id)
        .eq("status", guard.status);

    if guard.unrated {
        postgrest = postgrest.is("rating", "null");
    }
    if guard.survey_pending {
        postgrest = postgrest.eq("survey_completed", false);
    }
    postgrest
}

#[async_trait]
impl AppointmentStore for SupabaseAppointmentStore {
    async fn find_by_id(&self, appointment_id: i64, auth_token: &str) -> Result<Option<Appointment>, DatabaseError> {
        let query = PostgrestQuery::table(APPOINTMENTS_TABLE).eq("id", appointment_id);
        let rows: Vec<Appointment> = self.supabase.select(&query, auth_token).await?;
        Ok(rows.into_iter().next())
    }

    async fn find_blocking(
        &self,
        specialist_id: Uuid,
        date: NaiveDate,
        time: NaiveTime,
        auth_token: &str,
    ) -> Result<Option<Appointment>, DatabaseError> {
        let query = PostgrestQuery::table(APPOINTMENTS_TABLE)
            .eq("specialist_id", specialist_id)
            .eq("date", date)
            .eq("time", time.format("%H:%M:%S"))
            .in_list("status", AppointmentStatus::BLOCKING)
            .limit(1);

        let rows: Vec<Appointment> = self.supabase.select(&query, auth_token).await?;
        Ok(rows.into_iter().next())
    }

    async fn insert(&self, appointment: &NewAppointment, auth_token: &str) -> Result<Appointment, DatabaseError> {
        self.supabase.insert(APPOINTMENTS_TABLE, appointment, auth_token).await
    }

    async fn update_guarded(
        &self,
        appointment_id: i64,
        guard: UpdateGuard,
        changes: &AppointmentUpdate,
        auth_token: &str,
    ) -> Result<Option<Appointment>, DatabaseError> {
        let query = guarded(appointment_id, guard);
        let rows: Vec<Appointment> = self.supabase.update(&query, changes, auth_token).await?;
        Ok(rows.into_iter().next())
    }

    async fn list(&self, query: &AppointmentQuery, auth_token: &str) -> Result<Vec<Appointment>, DatabaseError> {
        let rows: Vec<Appointment> = self.supabase.select(&selection(query), auth_token).await?;
        debug!("Fetched {} appointments", rows.len());
        Ok(rows)
    }
}

pub struct SupabaseDirectoryStore {
    supabase: SupabaseClient,
}

impl SupabaseDirectoryStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }
}

#[async_trait]
impl DirectoryStore for SupabaseDirectoryStore {
    async fn profiles_by_ids(&self, ids: &[Uuid], auth_token: &str) -> Result<Vec<Profile>, DatabaseError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let query = PostgrestQuery::table(PROFILES_TABLE)
            .select(PROFILE_COLUMNS)
            .in_list("id", ids.iter());

        self.supabase.select(&query, auth_token).await
    }

    async fn specialties_by_ids(&self, ids: &[i64], auth_token: &str) -> Result<Vec<Specialty>, DatabaseError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let query = PostgrestQuery::table(SPECIALTIES_TABLE).in_list("id", ids.iter());
        self.supabase.select(&query, auth_token).await
    }
}
