use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use chrono::NaiveTime;
use tracing::{debug, info};

use shared_config::AppConfig;
use shared_models::auth::SessionContext;

use crate::models::{minutes_of_day, weekday_index, AvailabilityError, AvailabilityRule, SlotAvailability, SlotQuery};
use crate::store::{AvailabilityStore, SupabaseAvailabilityStore};

pub const NO_AVAILABILITY_MESSAGE: &str = "The specialist has no availability on this day";

/// Walks every active rule in steps of its slot duration and returns the
/// start times not present in `booked`, sorted and without duplicates.
/// A candidate is emitted only while it ends at or before the rule's end.
pub fn generate_slots(rules: &[AvailabilityRule], booked: &HashSet<NaiveTime>) -> Vec<NaiveTime> {
    let mut slots = BTreeSet::new();

    for rule in rules.iter().filter(|rule| rule.active && rule.slot_duration_minutes > 0) {
        let step = rule.slot_duration_minutes;
        let end = minutes_of_day(rule.end_time);
        let mut current = minutes_of_day(rule.start_time);

        while current + step <= end {
            if let Some(candidate) = NaiveTime::from_num_seconds_from_midnight_opt(current * 60, 0) {
                if !booked.contains(&candidate) {
                    slots.insert(candidate);
                }
            }
            current += step;
        }
    }

    slots.into_iter().collect()
}

/// The active rule whose slot grid has a slot starting exactly at `time`.
pub fn rule_for_slot(rules: &[AvailabilityRule], time: NaiveTime) -> Option<&AvailabilityRule> {
    let minute = minutes_of_day(time);
    if NaiveTime::from_num_seconds_from_midnight_opt(minute * 60, 0) != Some(time) {
        return None;
    }

    rules.iter().find(|rule| {
        let step = rule.slot_duration_minutes;
        if !rule.active || step == 0 {
            return false;
        }
        let start = minutes_of_day(rule.start_time);
        let end = minutes_of_day(rule.end_time);
        minute >= start && minute + step <= end && (minute - start) % step == 0
    })
}

pub struct SlotGeneratorService {
    store: Arc<dyn AvailabilityStore>,
}

impl SlotGeneratorService {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_store(Arc::new(SupabaseAvailabilityStore::new(config)))
    }

    pub fn with_store(store: Arc<dyn AvailabilityStore>) -> Self {
        Self { store }
    }

    /// Bookable times for the query. Having no rules for that weekday is not
    /// an error: the result is empty and carries an informational message.
    pub async fn available_slots(
        &self,
        query: &SlotQuery,
        session: &SessionContext,
    ) -> Result<SlotAvailability, AvailabilityError> {
        let weekday = weekday_index(query.date);
        debug!(
            "Calculating slots for specialist {} specialty {} on {} (weekday {})",
            query.specialist_id, query.specialty_id, query.date, weekday
        );

        let rules = self.store.active_rules_for_day(
            query.specialist_id,
            query.specialty_id,
            weekday,
            &session.auth_token,
        ).await?;

        if rules.is_empty() {
            info!("No availability for specialist {} on {}", query.specialist_id, query.date);
            return Ok(SlotAvailability {
                specialist_id: query.specialist_id,
                specialty_id: query.specialty_id,
                date: query.date,
                slots: Vec::new(),
                message: Some(NO_AVAILABILITY_MESSAGE.to_string()),
            });
        }

        let booked: HashSet<NaiveTime> = self.store
            .blocking_times(query.specialist_id, query.date, &session.auth_token)
            .await?
            .into_iter()
            .collect();

        let slots = generate_slots(&rules, &booked);
        debug!("Found {} available slots ({} booked)", slots.len(), booked.len());

        Ok(SlotAvailability {
            specialist_id: query.specialist_id,
            specialty_id: query.specialty_id,
            date: query.date,
            slots,
            message: None,
        })
    }

    /// Rule that offers `time` on the queried day, ignoring bookings.
    /// Callers decide separately whether the slot is still free.
    pub async fn slot_rule(
        &self,
        query: &SlotQuery,
        time: NaiveTime,
        session: &SessionContext,
    ) -> Result<Option<AvailabilityRule>, AvailabilityError> {
        let rules = self.store.active_rules_for_day(
            query.specialist_id,
            query.specialty_id,
            weekday_index(query.date),
            &session.auth_token,
        ).await?;

        Ok(rule_for_slot(&rules, time).cloned())
    }
}
