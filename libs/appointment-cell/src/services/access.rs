use uuid::Uuid;

use shared_models::auth::{Role, SessionContext};

use crate::models::{Appointment, AppointmentError};

/// Patients book for themselves; admins book on a patient's behalf.
pub fn ensure_can_request(patient_id: Uuid, session: &SessionContext) -> Result<(), AppointmentError> {
    let own = session.role == Role::Patient && session.is(patient_id);
    if own || session.is_admin() {
        Ok(())
    } else {
        Err(AppointmentError::Forbidden(
            "Only the patient or an admin can request this appointment".to_string(),
        ))
    }
}

pub fn ensure_specialist(appointment: &Appointment, session: &SessionContext) -> Result<(), AppointmentError> {
    if session.role == Role::Specialist && session.is(appointment.specialist_id) {
        Ok(())
    } else {
        Err(AppointmentError::Forbidden(
            "Only the appointment's specialist can do this".to_string(),
        ))
    }
}

pub fn ensure_patient(appointment: &Appointment, session: &SessionContext) -> Result<(), AppointmentError> {
    if session.role == Role::Patient && session.is(appointment.patient_id) {
        Ok(())
    } else {
        Err(AppointmentError::Forbidden(
            "Only the appointment's patient can do this".to_string(),
        ))
    }
}

/// Patient, specialist or admin.
pub fn ensure_participant(appointment: &Appointment, session: &SessionContext) -> Result<(), AppointmentError> {
    if session.is(appointment.patient_id) || session.is(appointment.specialist_id) || session.is_admin() {
        Ok(())
    } else {
        Err(AppointmentError::Forbidden(
            "Not a participant of this appointment".to_string(),
        ))
    }
}

pub fn ensure_admin(session: &SessionContext) -> Result<(), AppointmentError> {
    if session.is_admin() {
        Ok(())
    } else {
        Err(AppointmentError::Forbidden("Admin access required".to_string()))
    }
}

/// Resolves whose figures a specialist-scoped report covers. Specialists see
/// their own; admins name one or, when `allow_global`, see everybody.
pub fn specialist_scope(
    requested: Option<Uuid>,
    session: &SessionContext,
    allow_global: bool,
) -> Result<Option<Uuid>, AppointmentError> {
    match (session.role, requested) {
        (Role::Admin, Some(id)) => Ok(Some(id)),
        (Role::Admin, None) if allow_global => Ok(None),
        (Role::Admin, None) => Err(AppointmentError::Validation("specialist_id is required".to_string())),
        (Role::Specialist, None) => Ok(Some(session.user_id)),
        (Role::Specialist, Some(id)) if session.is(id) => Ok(Some(id)),
        _ => Err(AppointmentError::Forbidden(
            "Only the specialist or an admin can view these figures".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::{NaiveDate, NaiveTime, Utc};

    use crate::models::AppointmentStatus;

    fn appointment(patient_id: Uuid, specialist_id: Uuid) -> Appointment {
        Appointment {
            id: 1,
            patient_id,
            specialist_id,
            specialty_id: 1,
            date: NaiveDate::from_ymd_opt(2030, 1, 7).unwrap(),
            time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            duration_minutes: 30,
            status: AppointmentStatus::Pending,
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
            survey_completed: false,
            survey_answers: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn roles_are_checked_along_with_identity() {
        let patient = SessionContext::new(Uuid::new_v4(), Role::Patient, "t");
        let specialist = SessionContext::new(Uuid::new_v4(), Role::Specialist, "t");
        let admin = SessionContext::new(Uuid::new_v4(), Role::Admin, "t");
        let appt = appointment(patient.user_id, specialist.user_id);

        assert!(ensure_patient(&appt, &patient).is_ok());
        assert_matches!(ensure_patient(&appt, &specialist), Err(AppointmentError::Forbidden(_)));
        assert!(ensure_specialist(&appt, &specialist).is_ok());
        assert_matches!(ensure_specialist(&appt, &admin), Err(AppointmentError::Forbidden(_)));
        assert!(ensure_participant(&appt, &admin).is_ok());

        let stranger = SessionContext::new(Uuid::new_v4(), Role::Patient, "t");
        assert_matches!(ensure_participant(&appt, &stranger), Err(AppointmentError::Forbidden(_)));
    }

    #[test]
    fn requests_are_for_self_unless_admin() {
        let patient = SessionContext::new(Uuid::new_v4(), Role::Patient, "t");
        let admin = SessionContext::new(Uuid::new_v4(), Role::Admin, "t");

        assert!(ensure_can_request(patient.user_id, &patient).is_ok());
        assert!(ensure_can_request(patient.user_id, &admin).is_ok());
        assert_matches!(ensure_can_request(Uuid::new_v4(), &patient), Err(AppointmentError::Forbidden(_)));
    }

    #[test]
    fn specialist_scope_defaults_to_caller() {
        let specialist = SessionContext::new(Uuid::new_v4(), Role::Specialist, "t");
        let admin = SessionContext::new(Uuid::new_v4(), Role::Admin, "t");
        let patient = SessionContext::new(Uuid::new_v4(), Role::Patient, "t");
        let other = Uuid::new_v4();

        assert_eq!(specialist_scope(None, &specialist, true).unwrap(), Some(specialist.user_id));
        assert_matches!(specialist_scope(Some(other), &specialist, true), Err(AppointmentError::Forbidden(_)));
        assert_eq!(specialist_scope(None, &admin, true).unwrap(), None);
        assert_matches!(specialist_scope(None, &admin, false), Err(AppointmentError::Validation(_)));
        assert_eq!(specialist_scope(Some(other), &admin, false).unwrap(), Some(other));
        assert_matches!(specialist_scope(None, &patient, true), Err(AppointmentError::Forbidden(_)));
    }
}
