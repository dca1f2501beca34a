use std::sync::Arc;

use axum::{
    Router,
    routing::{get, patch, post},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::{auth_middleware, optional_auth_middleware};

use crate::handlers;

pub fn appointment_request_routes(state: Arc<AppConfig>) -> Router {
    // Anyone may ask a doctor for a consultation
    let open_routes = Router::new()
        .route("/", post(handlers::create_appointment_request))
        .layer(middleware::from_fn_with_state(state.clone(), optional_auth_middleware));

    let protected_routes = Router::new()
        .route("/", get(handlers::list_appointment_requests))
        .route("/mine", get(handlers::list_my_requests))
        .route("/inbox", get(handlers::doctor_inbox))
        .route("/{request_id}", patch(handlers::update_request_status))
        .route("/{request_id}/reply", post(handlers::reply_to_request))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(open_routes)
        .merge(protected_routes)
        .with_state(state)
}
