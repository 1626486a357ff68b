use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::SessionContext;

use crate::models::{
    Appointment, AppointmentDetails, AppointmentError, AppointmentQuery, AppointmentStats, AppointmentStatus,
    AttendedPatient, StatsQuery, Visit,
};
use crate::services::access::specialist_scope;
use crate::services::read_model::AppointmentQueryService;
use crate::store::{AppointmentStore, DirectoryStore, SupabaseAppointmentStore, SupabaseDirectoryStore};

pub const VISITS_PER_PATIENT: usize = 3;

pub struct AppointmentStatsService {
    store: Arc<dyn AppointmentStore>,
    read_model: AppointmentQueryService,
}

impl AppointmentStatsService {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_stores(
            Arc::new(SupabaseAppointmentStore::new(config)),
            Arc::new(SupabaseDirectoryStore::new(config)),
        )
    }

    pub fn with_stores(store: Arc<dyn AppointmentStore>, directory: Arc<dyn DirectoryStore>) -> Self {
        Self {
            read_model: AppointmentQueryService::with_stores(Arc::clone(&store), directory),
            store,
        }
    }

    /// Counts per status and mean rating, optionally for one specialist and
    /// a date range. Without a specialist the figures are clinic-wide and
    /// reserved to admins.
    pub async fn statistics(
        &self,
        query: &StatsQuery,
        session: &SessionContext,
    ) -> Result<AppointmentStats, AppointmentError> {
        let specialist_id = specialist_scope(query.specialist_id, session, true)?;

        let rows = self.store.list(
            &AppointmentQuery {
                specialist_id,
                date_from: query.from,
                date_to: query.to,
                ..Default::default()
            },
            &session.auth_token,
        ).await?;

        debug!("Computing statistics over {} appointments", rows.len());
        Ok(summarize(&rows))
    }

    /// Distinct patients with completed appointments with the specialist,
    /// most recent first, each with up to three latest visits.
    pub async fn patients_attended(
        &self,
        specialist_id: Option<Uuid>,
        session: &SessionContext,
    ) -> Result<Vec<AttendedPatient>, AppointmentError> {
        let specialist_id = specialist_scope(specialist_id, session, false)?;

        let rows = self.store.list(
            &AppointmentQuery {
                specialist_id,
                status: Some(AppointmentStatus::Completed),
                ..Default::default()
            },
            &session.auth_token,
        ).await?;

        let details = self.read_model.assemble(rows, &session.auth_token).await?;
        Ok(group_attended(details))
    }
}

pub fn summarize(rows: &[Appointment]) -> AppointmentStats {
    let count = |status: AppointmentStatus| rows.iter().filter(|row| row.status == status).count();

    let ratings: Vec<f64> = rows.iter().filter_map(|row| row.rating).map(f64::from).collect();
    let average_rating = if ratings.is_empty() {
        None
    } else {
        Some(ratings.iter().sum::<f64>() / ratings.len() as f64)
    };

    AppointmentStats {
        total: rows.len(),
        completed: count(AppointmentStatus::Completed),
        cancelled: count(AppointmentStatus::Cancelled),
        pending: count(AppointmentStatus::Pending),
        accepted: count(AppointmentStatus::Accepted),
        rejected: count(AppointmentStatus::Rejected),
        average_rating,
    }
}

/// Expects `details` newest first, as the store returns them.
pub fn group_attended(details: Vec<AppointmentDetails>) -> Vec<AttendedPatient> {
    let mut patients: Vec<AttendedPatient> = Vec::new();
    let mut index: HashMap<Uuid, usize> = HashMap::new();

    for detail in details {
        let position = *index.entry(detail.appointment.patient_id).or_insert_with(|| {
            patients.push(AttendedPatient {
                patient_id: detail.appointment.patient_id,
                patient_name: detail.patient_name.clone(),
                patient: detail.patient.clone(),
                visits: Vec::new(),
            });
            patients.len() - 1
        });

        let visits = &mut patients[position].visits;
        if visits.len() < VISITS_PER_PATIENT {
            visits.push(Visit {
                appointment_id: detail.appointment.id,
                date: detail.appointment.date,
                time: detail.appointment.time,
                specialty_name: detail.specialty_name,
            });
        }
    }

    patients
}
