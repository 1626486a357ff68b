use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::{Role, SessionContext};

use crate::models::{
    Appointment, AppointmentDetails, AppointmentError, AppointmentFilters, AppointmentQuery, Profile,
    NOT_AVAILABLE,
};
use crate::services::access::{ensure_admin, ensure_participant};
use crate::store::{AppointmentStore, DirectoryStore, SupabaseAppointmentStore, SupabaseDirectoryStore};

/// Listings and single-appointment views with patient, specialist and
/// specialty names filled in.
pub struct AppointmentQueryService {
    store: Arc<dyn AppointmentStore>,
    directory: Arc<dyn DirectoryStore>,
}

impl AppointmentQueryService {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_stores(
            Arc::new(SupabaseAppointmentStore::new(config)),
            Arc::new(SupabaseDirectoryStore::new(config)),
        )
    }

    pub fn with_stores(store: Arc<dyn AppointmentStore>, directory: Arc<dyn DirectoryStore>) -> Self {
        Self { store, directory }
    }

    pub async fn get_details(
        &self,
        appointment_id: i64,
        session: &SessionContext,
    ) -> Result<AppointmentDetails, AppointmentError> {
        let appointment = self.store
            .find_by_id(appointment_id, &session.auth_token)
            .await?
            .ok_or(AppointmentError::NotFound)?;
        ensure_participant(&appointment, session)?;

        self.assemble(vec![appointment], &session.auth_token)
            .await?
            .pop()
            .ok_or(AppointmentError::NotFound)
    }

    /// The caller's own appointments: as patient or as specialist. Admins
    /// get every appointment.
    pub async fn list_mine(
        &self,
        filters: &AppointmentFilters,
        session: &SessionContext,
    ) -> Result<Vec<AppointmentDetails>, AppointmentError> {
        let mut query = store_query(filters);
        match session.role {
            Role::Patient => query.patient_id = Some(session.user_id),
            Role::Specialist => query.specialist_id = Some(session.user_id),
            Role::Admin => {}
        }

        self.list(query, filters, session).await
    }

    pub async fn list_all(
        &self,
        filters: &AppointmentFilters,
        session: &SessionContext,
    ) -> Result<Vec<AppointmentDetails>, AppointmentError> {
        ensure_admin(session)?;
        self.list(store_query(filters), filters, session).await
    }

    async fn list(
        &self,
        query: AppointmentQuery,
        filters: &AppointmentFilters,
        session: &SessionContext,
    ) -> Result<Vec<AppointmentDetails>, AppointmentError> {
        let rows = self.store.list(&query, &session.auth_token).await?;
        let details = self.assemble(rows, &session.auth_token).await?;

        Ok(match filters.q.as_deref() {
            Some(needle) => details.into_iter().filter(|d| d.matches_text(needle)).collect(),
            None => details,
        })
    }

    /// Fetches the distinct profiles and specialties referenced by `rows`
    /// concurrently and merges them in, keeping the input order.
    pub async fn assemble(
        &self,
        rows: Vec<Appointment>,
        auth_token: &str,
    ) -> Result<Vec<AppointmentDetails>, AppointmentError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let people: Vec<Uuid> = rows
            .iter()
            .flat_map(|row| [row.patient_id, row.specialist_id])
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let specialty_ids: Vec<i64> = rows
            .iter()
            .map(|row| row.specialty_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        debug!(
            "Assembling {} appointments ({} people, {} specialties)",
            rows.len(),
            people.len(),
            specialty_ids.len()
        );

        let (profiles, specialties) = futures::try_join!(
            self.directory.profiles_by_ids(&people, auth_token),
            self.directory.specialties_by_ids(&specialty_ids, auth_token),
        )?;

        let profiles: HashMap<Uuid, Profile> = profiles.into_iter().map(|p| (p.id, p)).collect();
        let specialty_names: HashMap<i64, String> =
            specialties.into_iter().map(|s| (s.id, s.name)).collect();

        Ok(rows
            .into_iter()
            .map(|appointment| details_for(appointment, &profiles, &specialty_names))
            .collect())
    }
}

fn store_query(filters: &AppointmentFilters) -> AppointmentQuery {
    AppointmentQuery {
        status: filters.status,
        specialty_id: filters.specialty_id,
        ..Default::default()
    }
}

fn details_for(
    appointment: Appointment,
    profiles: &HashMap<Uuid, Profile>,
    specialty_names: &HashMap<i64, String>,
) -> AppointmentDetails {
    let patient = profiles.get(&appointment.patient_id).cloned();
    let specialist = profiles.get(&appointment.specialist_id).cloned();

    AppointmentDetails {
        specialty_name: specialty_names
            .get(&appointment.specialty_id)
            .cloned()
            .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        patient_name: display_name(patient.as_ref()),
        specialist_name: display_name(specialist.as_ref()),
        patient,
        specialist,
        appointment,
    }
}

fn display_name(profile: Option<&Profile>) -> String {
    profile
        .map(Profile::full_name)
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}
