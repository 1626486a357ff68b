use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::error::AppError;
use shared_utils::extractor::Session;

use crate::models::{
    AppointmentFilters, AttendedQuery, CancelAppointmentRequest, CompleteAppointmentRequest,
    RateAppointmentRequest, RejectAppointmentRequest, RequestAppointmentRequest, StatsQuery, SurveyRequest,
};
use crate::services::{AppointmentBookingService, AppointmentQueryService, AppointmentStatsService};

// ==============================================================================
// BOOKING
// ==============================================================================

pub async fn request_appointment(
    State(state): State<Arc<AppConfig>>,
    Session(session): Session,
    Json(request): Json<RequestAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let booking_service = AppointmentBookingService::new(&state);
    let appointment = booking_service.request_appointment(request, &session).await?;

    Ok((StatusCode::CREATED, Json(json!(appointment))))
}

// ==============================================================================
// LISTINGS & REPORTS
// ==============================================================================

pub async fn get_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<i64>,
    Session(session): Session,
) -> Result<Json<Value>, AppError> {
    let query_service = AppointmentQueryService::new(&state);
    let details = query_service.get_details(appointment_id, &session).await?;

    Ok(Json(json!(details)))
}

pub async fn list_my_appointments(
    State(state): State<Arc<AppConfig>>,
    Query(filters): Query<AppointmentFilters>,
    Session(session): Session,
) -> Result<Json<Value>, AppError> {
    let query_service = AppointmentQueryService::new(&state);
    let appointments = query_service.list_mine(&filters, &session).await?;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    })))
}

pub async fn list_all_appointments(
    State(state): State<Arc<AppConfig>>,
    Query(filters): Query<AppointmentFilters>,
    Session(session): Session,
) -> Result<Json<Value>, AppError> {
    let query_service = AppointmentQueryService::new(&state);
    let appointments = query_service.list_all(&filters, &session).await?;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    })))
}

pub async fn get_appointment_stats(
    State(state): State<Arc<AppConfig>>,
    Query(query): Query<StatsQuery>,
    Session(session): Session,
) -> Result<Json<Value>, AppError> {
    let stats_service = AppointmentStatsService::new(&state);
    let stats = stats_service.statistics(&query, &session).await?;

    Ok(Json(json!(stats)))
}

pub async fn get_patients_attended(
    State(state): State<Arc<AppConfig>>,
    Query(query): Query<AttendedQuery>,
    Session(session): Session,
) -> Result<Json<Value>, AppError> {
    let stats_service = AppointmentStatsService::new(&state);
    let patients = stats_service.patients_attended(query.specialist_id, &session).await?;

    Ok(Json(json!({
        "patients": patients,
        "total": patients.len()
    })))
}

// ==============================================================================
// LIFECYCLE
// ==============================================================================

pub async fn accept_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<i64>,
    Session(session): Session,
) -> Result<Json<Value>, AppError> {
    let booking_service = AppointmentBookingService::new(&state);
    let appointment = booking_service.accept_appointment(appointment_id, &session).await?;

    Ok(Json(json!(appointment)))
}

pub async fn reject_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<i64>,
    Session(session): Session,
    Json(request): Json<RejectAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let booking_service = AppointmentBookingService::new(&state);
    let appointment = booking_service.reject_appointment(appointment_id, request, &session).await?;

    Ok(Json(json!(appointment)))
}

pub async fn cancel_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<i64>,
    Session(session): Session,
    Json(request): Json<CancelAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let booking_service = AppointmentBookingService::new(&state);
    let appointment = booking_service.cancel_appointment(appointment_id, request, &session).await?;

    Ok(Json(json!(appointment)))
}

pub async fn complete_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<i64>,
    Session(session): Session,
    Json(request): Json<CompleteAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let booking_service = AppointmentBookingService::new(&state);
    let appointment = booking_service.complete_appointment(appointment_id, request, &session).await?;

    Ok(Json(json!(appointment)))
}

pub async fn rate_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<i64>,
    Session(session): Session,
    Json(request): Json<RateAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let booking_service = AppointmentBookingService::new(&state);
    let appointment = booking_service.rate_appointment(appointment_id, request, &session).await?;

    Ok(Json(json!(appointment)))
}

pub async fn complete_survey(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<i64>,
    Session(session): Session,
    Json(survey): Json<SurveyRequest>,
) -> Result<Json<Value>, AppError> {
    let booking_service = AppointmentBookingService::new(&state);
    let appointment = booking_service.complete_survey(appointment_id, survey, &session).await?;

    Ok(Json(json!(appointment)))
}
