use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn appointment_routes(state: Arc<AppConfig>) -> Router {
    // All appointment operations require authentication
    let protected_routes = Router::new()
        .route("/", post(handlers::request_appointment).get(handlers::list_all_appointments))
        .route("/mine", get(handlers::list_my_appointments))
        .route("/stats", get(handlers::get_appointment_stats))
        .route("/patients-attended", get(handlers::get_patients_attended))
        .route("/{appointment_id}", get(handlers::get_appointment))
        // Lifecycle transitions
        .route("/{appointment_id}/accept", post(handlers::accept_appointment))
        .route("/{appointment_id}/reject", post(handlers::reject_appointment))
        .route("/{appointment_id}/cancel", post(handlers::cancel_appointment))
        .route("/{appointment_id}/complete", post(handlers::complete_appointment))
        .route("/{appointment_id}/rate", post(handlers::rate_appointment))
        .route("/{appointment_id}/survey", post(handlers::complete_survey))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
