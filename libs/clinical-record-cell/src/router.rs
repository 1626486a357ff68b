use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn clinical_record_routes(state: Arc<AppConfig>) -> Router {
    // Records are only reachable with a valid session
    let protected_routes = Router::new()
        .route("/", post(handlers::create_record))
        .route("/patients/{patient_id}", get(handlers::list_patient_records))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
