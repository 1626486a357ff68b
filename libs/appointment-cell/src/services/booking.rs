use std::sync::Arc;

use chrono::{Local, Utc};
use tracing::{debug, info, warn};

use availability_cell::{SlotGeneratorService, SlotQuery};
use shared_config::AppConfig;
use shared_models::auth::SessionContext;

use crate::models::{
    Appointment, AppointmentError, AppointmentStatus, AppointmentUpdate, CancelAppointmentRequest,
    CompleteAppointmentRequest, NewAppointment, RateAppointmentRequest, RejectAppointmentRequest,
    RequestAppointmentRequest, SurveyRequest,
};
use crate::services::access::{ensure_can_request, ensure_participant, ensure_patient, ensure_specialist};
use crate::services::lifecycle::AppointmentLifecycleService;
use crate::store::{
    AppointmentStore, DirectoryStore, SupabaseAppointmentStore, SupabaseDirectoryStore, UpdateGuard,
};

pub struct AppointmentBookingService {
    store: Arc<dyn AppointmentStore>,
    directory: Arc<dyn DirectoryStore>,
    slot_service: SlotGeneratorService,
    lifecycle_service: AppointmentLifecycleService,
}

impl AppointmentBookingService {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_stores(
            Arc::new(SupabaseAppointmentStore::new(config)),
            Arc::new(SupabaseDirectoryStore::new(config)),
            SlotGeneratorService::new(config),
        )
    }

    pub fn with_stores(
        store: Arc<dyn AppointmentStore>,
        directory: Arc<dyn DirectoryStore>,
        slot_service: SlotGeneratorService,
    ) -> Self {
        Self {
            store,
            directory,
            slot_service,
            lifecycle_service: AppointmentLifecycleService::new(),
        }
    }

    /// Request a slot. The time must be on one of the specialist's rules for
    /// that day and the slot must not be held by a blocking appointment; the
    /// hold is checked again by the store's uniqueness constraint on insert.
    pub async fn request_appointment(
        &self,
        request: RequestAppointmentRequest,
        session: &SessionContext,
    ) -> Result<Appointment, AppointmentError> {
        let patient_id = request.patient_id.unwrap_or(session.user_id);
        ensure_can_request(patient_id, session)?;
        if session.is_admin() && request.patient_id.is_none() {
            return Err(AppointmentError::Validation("patient_id is required".to_string()));
        }

        info!(
            "Requesting appointment for patient {} with specialist {} on {} at {}",
            patient_id, request.specialist_id, request.date, request.time
        );

        self.lifecycle_service
            .validate_request_date(request.date, Local::now().date_naive())?;

        let specialties = self.directory
            .specialties_by_ids(&[request.specialty_id], &session.auth_token)
            .await?;
        if specialties.is_empty() {
            return Err(AppointmentError::SpecialtyNotFound);
        }

        let slot_query = SlotQuery {
            specialist_id: request.specialist_id,
            specialty_id: request.specialty_id,
            date: request.date,
        };
        let rule = self.slot_service
            .slot_rule(&slot_query, request.time, session)
            .await?
            .ok_or_else(|| AppointmentError::Validation(format!(
                "{} is not an available slot for this specialist on {}",
                request.time.format("%H:%M"),
                request.date
            )))?;

        if let Some(existing) = self.store
            .find_blocking(request.specialist_id, request.date, request.time, &session.auth_token)
            .await?
        {
            warn!("Slot already held by appointment {} ({})", existing.id, existing.status);
            return Err(AppointmentError::SlotTaken);
        }

        let new_appointment = NewAppointment {
            patient_id,
            specialist_id: request.specialist_id,
            specialty_id: request.specialty_id,
            date: request.date,
            time: request.time,
            duration_minutes: rule.slot_duration_minutes,
            status: AppointmentStatus::Pending,
            survey_completed: false,
        };

        let appointment = self.store
            .insert(&new_appointment, &session.auth_token)
            .await
            .map_err(|e| if e.is_conflict() {
                warn!("Slot taken concurrently for specialist {}", request.specialist_id);
                AppointmentError::SlotTaken
            } else {
                e.into()
            })?;

        info!("Appointment {} created (pending)", appointment.id);
        Ok(appointment)
    }

    pub async fn get_appointment(
        &self,
        appointment_id: i64,
        session: &SessionContext,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self.load(appointment_id, session).await?;
        ensure_participant(&appointment, session)?;
        Ok(appointment)
    }

    pub async fn accept_appointment(
        &self,
        appointment_id: i64,
        session: &SessionContext,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self.load(appointment_id, session).await?;
        ensure_specialist(&appointment, session)?;

        let update = self.lifecycle_service.plan_accept(&appointment, Utc::now())?;
        self.transition(&appointment, update, session).await
    }

    pub async fn reject_appointment(
        &self,
        appointment_id: i64,
        request: RejectAppointmentRequest,
        session: &SessionContext,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self.load(appointment_id, session).await?;
        ensure_specialist(&appointment, session)?;

        let update = self.lifecycle_service.plan_reject(&appointment, &request.reason, Utc::now())?;
        self.transition(&appointment, update, session).await
    }

    pub async fn cancel_appointment(
        &self,
        appointment_id: i64,
        request: CancelAppointmentRequest,
        session: &SessionContext,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self.load(appointment_id, session).await?;
        ensure_participant(&appointment, session)?;

        let update = self.lifecycle_service
            .plan_cancel(&appointment, &request.reason, session, Utc::now())?;
        self.transition(&appointment, update, session).await
    }

    pub async fn complete_appointment(
        &self,
        appointment_id: i64,
        request: CompleteAppointmentRequest,
        session: &SessionContext,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self.load(appointment_id, session).await?;
        ensure_specialist(&appointment, session)?;

        let update = self.lifecycle_service.plan_complete(&appointment, &request.note, Utc::now())?;
        self.transition(&appointment, update, session).await
    }

    pub async fn rate_appointment(
        &self,
        appointment_id: i64,
        request: RateAppointmentRequest,
        session: &SessionContext,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self.load(appointment_id, session).await?;
        ensure_patient(&appointment, session)?;

        let update = self.lifecycle_service
            .plan_rating(&appointment, request.rating, &request.comment, Utc::now())?;
        let guard = UpdateGuard::status(appointment.status).unrated();
        self.apply(&appointment, guard, update, session, AppointmentError::AlreadyRated).await
    }

    pub async fn complete_survey(
        &self,
        appointment_id: i64,
        survey: SurveyRequest,
        session: &SessionContext,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self.load(appointment_id, session).await?;
        ensure_patient(&appointment, session)?;

        let update = self.lifecycle_service.plan_survey(&appointment, survey, Utc::now())?;
        let guard = UpdateGuard::status(appointment.status).survey_pending();
        self.apply(&appointment, guard, update, session, AppointmentError::SurveyAlreadyCompleted).await
    }

    async fn load(&self, appointment_id: i64, session: &SessionContext) -> Result<Appointment, AppointmentError> {
        self.store
            .find_by_id(appointment_id, &session.auth_token)
            .await?
            .ok_or(AppointmentError::NotFound)
    }

    /// Status changes are guarded by the status they were planned from.
    async fn transition(
        &self,
        current: &Appointment,
        update: AppointmentUpdate,
        session: &SessionContext,
    ) -> Result<Appointment, AppointmentError> {
        let guard = UpdateGuard::status(current.status);
        self.apply(current, guard, update, session, AppointmentError::StaleState).await
    }

    /// Writes the planned change under `guard`. When the row no longer
    /// matches, a concurrent request got there first and `on_miss` is returned.
    async fn apply(
        &self,
        current: &Appointment,
        guard: UpdateGuard,
        update: AppointmentUpdate,
        session: &SessionContext,
        on_miss: AppointmentError,
    ) -> Result<Appointment, AppointmentError> {
        debug!("Updating appointment {} from status {}", current.id, current.status);

        let Some(updated) = self.store
            .update_guarded(current.id, guard, &update, &session.auth_token)
            .await?
        else {
            warn!("Appointment {} changed before the update landed", current.id);
            return Err(on_miss);
        };

        info!("Appointment {} is now {}", updated.id, updated.status);
        Ok(updated)
    }
}
