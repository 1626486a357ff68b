use std::sync::Arc;

use chrono::NaiveTime;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::{Role, SessionContext};

use crate::models::{
    AvailabilityError, AvailabilityRule, AvailabilityRuleChanges, CreateAvailabilityRuleRequest,
    NewAvailabilityRule, UpdateAvailabilityRuleRequest,
};
use crate::services::specialty::SpecialtyService;
use crate::store::{AvailabilityStore, SupabaseAvailabilityStore};

pub const DEFAULT_SLOT_DURATION_MINUTES: u32 = 30;

pub struct AvailabilityService {
    store: Arc<dyn AvailabilityStore>,
    specialties: SpecialtyService,
}

impl AvailabilityService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            store: Arc::new(SupabaseAvailabilityStore::new(config)),
            specialties: SpecialtyService::new(config),
        }
    }

    pub fn with_store(store: Arc<dyn AvailabilityStore>, specialties: SpecialtyService) -> Self {
        Self { store, specialties }
    }

    /// Create a weekly rule for a specialist
    pub async fn create_rule(
        &self,
        request: CreateAvailabilityRuleRequest,
        session: &SessionContext,
    ) -> Result<AvailabilityRule, AvailabilityError> {
        debug!("Creating availability rule for specialist {}", request.specialist_id);

        ensure_can_manage(session, request.specialist_id)?;

        let slot_duration = request.slot_duration_minutes.unwrap_or(DEFAULT_SLOT_DURATION_MINUTES);
        validate_rule_shape(request.weekday, request.start_time, request.end_time, slot_duration)?;

        if self.specialties.get_specialty(request.specialty_id, session).await?.is_none() {
            return Err(AvailabilityError::SpecialtyNotFound);
        }

        self.ensure_no_overlap(
            request.specialist_id,
            request.weekday,
            request.start_time,
            request.end_time,
            None,
            session,
        ).await?;

        let rule = NewAvailabilityRule {
            specialist_id: request.specialist_id,
            specialty_id: request.specialty_id,
            weekday: request.weekday,
            start_time: request.start_time,
            end_time: request.end_time,
            slot_duration_minutes: slot_duration,
            active: request.active.unwrap_or(true),
        };

        let created = self.store.insert_rule(&rule, &session.auth_token).await?;
        if created.slot_count() == 0 {
            warn!("Availability rule {} cannot hold a single {}-minute slot", created.id, slot_duration);
        }

        info!("Availability rule {} created for specialist {}", created.id, created.specialist_id);
        Ok(created)
    }

    /// Update times, slot duration or the active flag of a rule
    pub async fn update_rule(
        &self,
        rule_id: i64,
        request: UpdateAvailabilityRuleRequest,
        session: &SessionContext,
    ) -> Result<AvailabilityRule, AvailabilityError> {
        debug!("Updating availability rule {}", rule_id);

        let current = self.get_rule(rule_id, session).await?;
        ensure_can_manage(session, current.specialist_id)?;

        let start_time = request.start_time.unwrap_or(current.start_time);
        let end_time = request.end_time.unwrap_or(current.end_time);
        let slot_duration = request.slot_duration_minutes.unwrap_or(current.slot_duration_minutes);
        validate_rule_shape(current.weekday, start_time, end_time, slot_duration)?;

        if start_time != current.start_time || end_time != current.end_time {
            self.ensure_no_overlap(
                current.specialist_id,
                current.weekday,
                start_time,
                end_time,
                Some(rule_id),
                session,
            ).await?;
        }

        let changes = AvailabilityRuleChanges {
            start_time: request.start_time,
            end_time: request.end_time,
            slot_duration_minutes: request.slot_duration_minutes,
            active: request.active,
        };

        self.store
            .update_rule(rule_id, &changes, &session.auth_token)
            .await?
            .ok_or(AvailabilityError::NotFound)
    }

    /// Delete a rule. Existing appointments are not touched.
    pub async fn delete_rule(&self, rule_id: i64, session: &SessionContext) -> Result<(), AvailabilityError> {
        debug!("Deleting availability rule {}", rule_id);

        let current = self.get_rule(rule_id, session).await?;
        ensure_can_manage(session, current.specialist_id)?;

        if !self.store.delete_rule(rule_id, &session.auth_token).await? {
            return Err(AvailabilityError::NotFound);
        }

        info!("Availability rule {} deleted", rule_id);
        Ok(())
    }

    pub async fn get_rule(&self, rule_id: i64, session: &SessionContext) -> Result<AvailabilityRule, AvailabilityError> {
        self.store
            .rule_by_id(rule_id, &session.auth_token)
            .await?
            .ok_or(AvailabilityError::NotFound)
    }

    /// All rules of a specialist ordered by weekday and start time
    pub async fn list_rules(
        &self,
        specialist_id: Uuid,
        session: &SessionContext,
    ) -> Result<Vec<AvailabilityRule>, AvailabilityError> {
        Ok(self.store.rules_for_specialist(specialist_id, &session.auth_token).await?)
    }

    async fn ensure_no_overlap(
        &self,
        specialist_id: Uuid,
        weekday: u8,
        start_time: NaiveTime,
        end_time: NaiveTime,
        exclude_id: Option<i64>,
        session: &SessionContext,
    ) -> Result<(), AvailabilityError> {
        let existing = self.store.rules_on_weekday(specialist_id, weekday, &session.auth_token).await?;

        let clash = existing
            .iter()
            .filter(|rule| Some(rule.id) != exclude_id)
            .find(|rule| rule.overlaps(start_time, end_time));

        match clash {
            Some(rule) => Err(AvailabilityError::Conflict(format!(
                "Overlaps existing availability {}-{} (rule {})",
                rule.start_time.format("%H:%M"),
                rule.end_time.format("%H:%M"),
                rule.id
            ))),
            None => Ok(()),
        }
    }
}

pub fn validate_rule_shape(
    weekday: u8,
    start_time: NaiveTime,
    end_time: NaiveTime,
    slot_duration_minutes: u32,
) -> Result<(), AvailabilityError> {
    if weekday > 6 {
        return Err(AvailabilityError::Validation(
            "Weekday must be between 0 (Sunday) and 6 (Saturday)".to_string(),
        ));
    }
    if start_time >= end_time {
        return Err(AvailabilityError::Validation("Start time must be before end time".to_string()));
    }
    if slot_duration_minutes == 0 {
        return Err(AvailabilityError::Validation("Slot duration must be greater than zero".to_string()));
    }
    Ok(())
}

fn ensure_can_manage(session: &SessionContext, specialist_id: Uuid) -> Result<(), AvailabilityError> {
    let owner = session.role == Role::Specialist && session.is(specialist_id);
    if owner || session.is_admin() {
        Ok(())
    } else {
        Err(AvailabilityError::Forbidden(
            "Only the specialist or an admin can manage this availability".to_string(),
        ))
    }
}
