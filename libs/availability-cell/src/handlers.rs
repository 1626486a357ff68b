use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::error::AppError;
use shared_utils::extractor::Session;

use crate::models::{
    CreateAvailabilityRuleRequest, CreateSpecialtyRequest, SlotQuery, UpdateAvailabilityRuleRequest,
};
use crate::services::{AvailabilityService, SlotGeneratorService, SpecialtyService};

// ==============================================================================
// AVAILABILITY RULES
// ==============================================================================

pub async fn list_rules(
    State(state): State<Arc<AppConfig>>,
    Path(specialist_id): Path<Uuid>,
    Session(session): Session,
) -> Result<Json<Value>, AppError> {
    let service = AvailabilityService::new(&state);
    let rules = service.list_rules(specialist_id, &session).await?;

    Ok(Json(json!({
        "rules": rules,
        "total": rules.len()
    })))
}

pub async fn create_rule(
    State(state): State<Arc<AppConfig>>,
    Session(session): Session,
    Json(request): Json<CreateAvailabilityRuleRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let service = AvailabilityService::new(&state);
    let rule = service.create_rule(request, &session).await?;

    Ok((StatusCode::CREATED, Json(json!(rule))))
}

pub async fn update_rule(
    State(state): State<Arc<AppConfig>>,
    Path(rule_id): Path<i64>,
    Session(session): Session,
    Json(request): Json<UpdateAvailabilityRuleRequest>,
) -> Result<Json<Value>, AppError> {
    let service = AvailabilityService::new(&state);
    let rule = service.update_rule(rule_id, request, &session).await?;

    Ok(Json(json!(rule)))
}

pub async fn delete_rule(
    State(state): State<Arc<AppConfig>>,
    Path(rule_id): Path<i64>,
    Session(session): Session,
) -> Result<StatusCode, AppError> {
    let service = AvailabilityService::new(&state);
    service.delete_rule(rule_id, &session).await?;

    Ok(StatusCode::NO_CONTENT)
}

// ==============================================================================
// SLOTS
// ==============================================================================

pub async fn get_available_slots(
    State(state): State<Arc<AppConfig>>,
    Query(query): Query<SlotQuery>,
    Session(session): Session,
) -> Result<Json<Value>, AppError> {
    let service = SlotGeneratorService::new(&state);
    let availability = service.available_slots(&query, &session).await?;

    Ok(Json(json!(availability)))
}

// ==============================================================================
// SPECIALTIES
// ==============================================================================

pub async fn list_specialties(
    State(state): State<Arc<AppConfig>>,
    Session(session): Session,
) -> Result<Json<Value>, AppError> {
    let service = SpecialtyService::new(&state);
    let specialties = service.list_specialties(&session).await?;

    Ok(Json(json!(specialties)))
}

pub async fn create_specialty(
    State(state): State<Arc<AppConfig>>,
    Session(session): Session,
    Json(request): Json<CreateSpecialtyRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let service = SpecialtyService::new(&state);
    let specialty = service.create_specialty(request, &session).await?;

    Ok((StatusCode::CREATED, Json(json!(specialty))))
}
