use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::{DatabaseError, PostgrestQuery, SupabaseClient};
use shared_models::AppointmentStatus;

use crate::models::{AvailabilityRule, AvailabilityRuleChanges, NewAvailabilityRule};

pub const RULES_TABLE: &str = "availability_rules";
pub const APPOINTMENTS_TABLE: &str = "appointments";

/// Persistence collaborator for availability rules and the booked times the
/// slot generator excludes.
#[async_trait]
pub trait AvailabilityStore: Send + Sync {
    async fn active_rules_for_day(
        &self,
        specialist_id: Uuid,
        specialty_id: i64,
        weekday: u8,
        auth_token: &str,
    ) -> Result<Vec<AvailabilityRule>, DatabaseError>;

    /// Every rule of the specialist on `weekday`, any specialty, active or not.
    async fn rules_on_weekday(
        &self,
        specialist_id: Uuid,
        weekday: u8,
        auth_token: &str,
    ) -> Result<Vec<AvailabilityRule>, DatabaseError>;

    async fn rules_for_specialist(
        &self,
        specialist_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<AvailabilityRule>, DatabaseError>;

    async fn rule_by_id(&self, rule_id: i64, auth_token: &str) -> Result<Option<AvailabilityRule>, DatabaseError>;

    async fn insert_rule(&self, rule: &NewAvailabilityRule, auth_token: &str) -> Result<AvailabilityRule, DatabaseError>;

    async fn update_rule(
        &self,
        rule_id: i64,
        changes: &AvailabilityRuleChanges,
        auth_token: &str,
    ) -> Result<Option<AvailabilityRule>, DatabaseError>;

    async fn delete_rule(&self, rule_id: i64, auth_token: &str) -> Result<bool, DatabaseError>;

    /// Times on `date` held by an appointment in a blocking status.
    async fn blocking_times(
        &self,
        specialist_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<NaiveTime>, DatabaseError>;
}

pub struct SupabaseAvailabilityStore {
    supabase: SupabaseClient,
}

impl SupabaseAvailabilityStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }
}

#[derive(Deserialize)]
struct BookedTime {
    time: NaiveTime,
}

#[async_trait]
impl AvailabilityStore for SupabaseAvailabilityStore {
    async fn active_rules_for_day(
        &self,
        specialist_id: Uuid,
        specialty_id: i64,
        weekday: u8,
        auth_token: &str,
    ) -> Result<Vec<AvailabilityRule>, DatabaseError> {
        let query = PostgrestQuery::table(RULES_TABLE)
            .eq("specialist_id", specialist_id)
            .eq("specialty_id", specialty_id)
            .eq("weekday", weekday)
            .eq("active", true)
            .order("start_time", true);

        self.supabase.select(&query, auth_token).await
    }

    async fn rules_on_weekday(
        &self,
        specialist_id: Uuid,
        weekday: u8,
        auth_token: &str,
    ) -> Result<Vec<AvailabilityRule>, DatabaseError> {
        let query = PostgrestQuery::table(RULES_TABLE)
            .eq("specialist_id", specialist_id)
            .eq("weekday", weekday);

        self.supabase.select(&query, auth_token).await
    }

    async fn rules_for_specialist(
        &self,
        specialist_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<AvailabilityRule>, DatabaseError> {
        let query = PostgrestQuery::table(RULES_TABLE)
            .eq("specialist_id", specialist_id)
            .order("weekday", true)
            .order("start_time", true);

        self.supabase.select(&query, auth_token).await
    }

    async fn rule_by_id(&self, rule_id: i64, auth_token: &str) -> Result<Option<AvailabilityRule>, DatabaseError> {
        let query = PostgrestQuery::table(RULES_TABLE).eq("id", rule_id);
        let rules: Vec<AvailabilityRule> = self.supabase.select(&query, auth_token).await?;
        Ok(rules.into_iter().next())
    }

    async fn insert_rule(&self, rule: &NewAvailabilityRule, auth_token: &str) -> Result<AvailabilityRule, DatabaseError> {
        self.supabase.insert(RULES_TABLE, rule, auth_token).await
    }

    async fn update_rule(
        &self,
        rule_id: i64,
        changes: &AvailabilityRuleChanges,
        auth_token: &str,
    ) -> Result<Option<AvailabilityRule>, DatabaseError> {
        let query = PostgrestQuery::table(RULES_TABLE).eq("id", rule_id);
        let updated: Vec<AvailabilityRule> = self.supabase.update(&query, changes, auth_token).await?;
        Ok(updated.into_iter().next())
    }

    async fn delete_rule(&self, rule_id: i64, auth_token: &str) -> Result<bool, DatabaseError> {
        let query = PostgrestQuery::table(RULES_TABLE).eq("id", rule_id);
        let removed = self.supabase.delete(&query, auth_token).await?;
        Ok(removed > 0)
    }

    async fn blocking_times(
        &self,
        specialist_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<NaiveTime>, DatabaseError> {
        let query = PostgrestQuery::table(APPOINTMENTS_TABLE)
            .select("time")
            .eq("specialist_id", specialist_id)
            .eq("date", date)
            .in_list("status", AppointmentStatus::BLOCKING);

        let rows: Vec<BookedTime> = self.supabase.select(&query, auth_token).await?;
        debug!("Specialist {} has {} blocking appointments on {}", specialist_id, rows.len(), date);

        Ok(rows.into_iter().map(|row| row.time).collect())
    }
}
