use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, warn};

use shared_models::auth::SessionContext;

use crate::models::{whole_score, Appointment, AppointmentError, AppointmentStatus, AppointmentUpdate, SurveyRequest};

/// State machine of a turno. Every `plan_*` method checks the transition
/// against the current row and returns the PATCH that performs it; nothing
/// here touches storage.
pub struct AppointmentLifecycleService;

impl Default for AppointmentLifecycleService {
    fn default() -> Self {
        Self::new()
    }
}

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    /// Get all valid next statuses for a given current status
    pub fn get_valid_transitions(&self, current_status: AppointmentStatus) -> Vec<AppointmentStatus> {
        match current_status {
            AppointmentStatus::Pending => vec![
                AppointmentStatus::Accepted,
                AppointmentStatus::Rejected,
                AppointmentStatus::Cancelled,
            ],
            AppointmentStatus::Accepted => vec![
                AppointmentStatus::Completed,
                AppointmentStatus::Cancelled,
            ],
            AppointmentStatus::Completed
            | AppointmentStatus::Rejected
            | AppointmentStatus::Cancelled => vec![],
        }
    }

    /// Validate that a status transition is allowed
    pub fn validate_status_transition(
        &self,
        current_status: AppointmentStatus,
        new_status: AppointmentStatus,
    ) -> Result<(), AppointmentError> {
        debug!("Validating status transition from {} to {}", current_status, new_status);

        if !self.get_valid_transitions(current_status).contains(&new_status) {
            warn!("Invalid status transition attempted: {} -> {}", current_status, new_status);
            return Err(AppointmentError::InvalidTransition {
                current: current_status,
                attempted: new_status,
            });
        }

        Ok(())
    }

    /// Requests for a day before `today` are refused; the time of day is not
    /// considered.
    pub fn validate_request_date(&self, date: NaiveDate, today: NaiveDate) -> Result<(), AppointmentError> {
        if date < today {
            return Err(AppointmentError::Validation(
                "Cannot request an appointment for a past date".to_string(),
            ));
        }
        Ok(())
    }

    pub fn plan_accept(
        &self,
        appointment: &Appointment,
        now: DateTime<Utc>,
    ) -> Result<AppointmentUpdate, AppointmentError> {
        self.validate_status_transition(appointment.status, AppointmentStatus::Accepted)?;

        let mut update = AppointmentUpdate::at(now);
        update.status = Some(AppointmentStatus::Accepted);
        Ok(update)
    }

    pub fn plan_reject(
        &self,
        appointment: &Appointment,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<AppointmentUpdate, AppointmentError> {
        self.validate_status_transition(appointment.status, AppointmentStatus::Rejected)?;
        let reason = required_text(reason, "A rejection reason is required")?;

        let mut update = AppointmentUpdate::at(now);
        update.status = Some(AppointmentStatus::Rejected);
        update.rejection_reason = Some(reason);
        update.rejected_at = Some(now);
        Ok(update)
    }

    /// Records who cancelled, in which capacity, and why.
    pub fn plan_cancel(
        &self,
        appointment: &Appointment,
        reason: &str,
        session: &SessionContext,
        now: DateTime<Utc>,
    ) -> Result<AppointmentUpdate, AppointmentError> {
        self.validate_status_transition(appointment.status, AppointmentStatus::Cancelled)?;
        let reason = required_text(reason, "A cancellation reason is required")?;

        let mut update = AppointmentUpdate::at(now);
        update.status = Some(AppointmentStatus::Cancelled);
        update.cancellation_reason = Some(reason);
        update.cancelled_by = Some(session.user_id);
        update.cancelled_by_role = Some(session.role);
        update.cancelled_at = Some(now);
        Ok(update)
    }

    pub fn plan_complete(
        &self,
        appointment: &Appointment,
        note: &str,
        now: DateTime<Utc>,
    ) -> Result<AppointmentUpdate, AppointmentError> {
        self.validate_status_transition(appointment.status, AppointmentStatus::Completed)?;
        let note = required_text(note, "A specialist note is required to complete the appointment")?;

        let mut update = AppointmentUpdate::at(now);
        update.status = Some(AppointmentStatus::Completed);
        update.specialist_note = Some(note);
        update.completed_at = Some(now);
        Ok(update)
    }

    /// One rating per completed appointment, 1 to 5 stars with a comment.
    pub fn plan_rating(
        &self,
        appointment: &Appointment,
        rating: f64,
        comment: &str,
        now: DateTime<Utc>,
    ) -> Result<AppointmentUpdate, AppointmentError> {
        if appointment.status != AppointmentStatus::Completed {
            return Err(AppointmentError::Validation(format!(
                "Only completed appointments can be rated (current status: {})",
                appointment.status
            )));
        }
        if appointment.rating.is_some() {
            return Err(AppointmentError::AlreadyRated);
        }
        let rating = whole_score(rating, "rating", 1..=5)?;
        let comment = required_text(comment, "A comment is required with the rating")?;

        let mut update = AppointmentUpdate::at(now);
        update.rating = Some(rating);
        update.rating_comment = Some(comment);
        Ok(update)
    }

    pub fn plan_survey(
        &self,
        appointment: &Appointment,
        survey: SurveyRequest,
        now: DateTime<Utc>,
    ) -> Result<AppointmentUpdate, AppointmentError> {
        if appointment.status != AppointmentStatus::Completed {
            return Err(AppointmentError::Validation(format!(
                "The survey is only available for completed appointments (current status: {})",
                appointment.status
            )));
        }
        if appointment.survey_completed {
            return Err(AppointmentError::SurveyAlreadyCompleted);
        }
        let answers = survey.into_answers()?;

        let mut update = AppointmentUpdate::at(now);
        update.survey_completed = Some(true);
        update.survey_answers = Some(answers);
        Ok(update)
    }
}

fn required_text(value: &str, message: &str) -> Result<String, AppointmentError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(AppointmentError::Validation(message.to_string()))
    } else {
        Ok(trimmed.to_string())
    }
}
