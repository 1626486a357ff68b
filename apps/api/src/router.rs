use std::sync::Arc;

use axum::{
    Json, Router,
    routing::get,
};
use serde_json::{json, Value};

use appointment_cell::router::appointment_routes;
use availability_cell::router::{availability_routes, specialty_routes};
use clinical_record_cell::router::clinical_record_routes;
use shared_config::AppConfig;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(|| async { "Clinic turnos API is running!" }))
        .route("/health", get(health))
        .nest("/specialties", specialty_routes(state.clone()))
        .nest("/availability", availability_routes(state.clone()))
        .nest("/appointments", appointment_routes(state.clone()))
        .nest("/clinical-records", clinical_record_routes(state))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
