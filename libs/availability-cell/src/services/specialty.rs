use tracing::{debug, info};

use shared_config::AppConfig;
use shared_database::{PostgrestQuery, SupabaseClient};
use shared_models::auth::{Role, SessionContext};

use crate::models::{AvailabilityError, CreateSpecialtyRequest, Specialty};

pub const SPECIALTIES_TABLE: &str = "specialties";

pub struct SpecialtyService {
    supabase: SupabaseClient,
}

impl SpecialtyService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn list_specialties(&self, session: &SessionContext) -> Result<Vec<Specialty>, AvailabilityError> {
        let query = PostgrestQuery::table(SPECIALTIES_TABLE).order("name", true);
        Ok(self.supabase.select(&query, &session.auth_token).await?)
    }

    pub async fn get_specialty(
        &self,
        specialty_id: i64,
        session: &SessionContext,
    ) -> Result<Option<Specialty>, AvailabilityError> {
        let query = PostgrestQuery::table(SPECIALTIES_TABLE).eq("id", specialty_id);
        let rows: Vec<Specialty> = self.supabase.select(&query, &session.auth_token).await?;
        Ok(rows.into_iter().next())
    }

    /// Specialists register the specialties they practice; admins curate.
    pub async fn create_specialty(
        &self,
        request: CreateSpecialtyRequest,
        session: &SessionContext,
    ) -> Result<Specialty, AvailabilityError> {
        if !matches!(session.role, Role::Specialist | Role::Admin) {
            return Err(AvailabilityError::Forbidden(
                "Only specialists and admins can add specialties".to_string(),
            ));
        }

        let name = request.name.trim();
        if name.is_empty() {
            return Err(AvailabilityError::Validation("Specialty name is required".to_string()));
        }

        debug!("Creating specialty '{}'", name);

        let existing_query = PostgrestQuery::table(SPECIALTIES_TABLE).eq("name", name);
        let existing: Vec<Specialty> = self.supabase.select(&existing_query, &session.auth_token).await?;
        if !existing.is_empty() {
            return Err(AvailabilityError::Conflict(format!("Specialty '{}' already exists", name)));
        }

        let row = CreateSpecialtyRequest { name: name.to_string() };
        let specialty: Specialty = self.supabase
            .insert(SPECIALTIES_TABLE, &row, &session.auth_token)
            .await
            .map_err(|e| if e.is_conflict() {
                AvailabilityError::Conflict(format!("Specialty '{}' already exists", name))
            } else {
                e.into()
            })?;

        info!("Specialty {} '{}' created", specialty.id, specialty.name);
        Ok(specialty)
    }
}
