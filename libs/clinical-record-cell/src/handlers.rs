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

use crate::models::{ClinicalRecordQuery, CreateClinicalRecordRequest};
use crate::services::ClinicalRecordService;

pub async fn create_record(
    State(state): State<Arc<AppConfig>>,
    Session(session): Session,
    Json(request): Json<CreateClinicalRecordRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let record_service = ClinicalRecordService::new(&state);
    let record = record_service.create_record(request, &session).await?;

    Ok((StatusCode::CREATED, Json(json!(record))))
}

pub async fn list_patient_records(
    State(state): State<Arc<AppConfig>>,
    Path(patient_id): Path<Uuid>,
    Query(query): Query<ClinicalRecordQuery>,
    Session(session): Session,
) -> Result<Json<Value>, AppError> {
    let record_service = ClinicalRecordService::new(&state);
    let records = record_service.records_for_patient(patient_id, &query, &session).await?;

    Ok(Json(json!({
        "records": records,
        "total": records.len()
    })))
}
