use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, put},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn availability_routes(state: Arc<AppConfig>) -> Router {
    // Slot queries and rule management require authentication
    let protected_routes = Router::new()
        .route("/slots", get(handlers::get_available_slots))
        // Weekly rules
        .route("/rules", post(handlers::create_rule))
        .route("/rules/{rule_id}", put(handlers::update_rule).delete(handlers::delete_rule))
        .route("/specialists/{specialist_id}/rules", get(handlers::list_rules))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}

pub fn specialty_routes(state: Arc<AppConfig>) -> Router {
    let protected_routes = Router::new()
        .route("/", get(handlers::list_specialties).post(handlers::create_specialty))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
