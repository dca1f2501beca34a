use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::{auth_middleware, optional_auth_middleware};

use crate::handlers;

/// Attachments arrive base64-encoded inside JSON.
const MAX_ATTACHMENT_BODY_BYTES: usize = 25 * 1024 * 1024;

pub fn patient_case_routes(state: Arc<AppConfig>) -> Router {
    // Anonymous visitors may submit a case and attach files to it
    let open_routes = Router::new()
        .route("/", post(handlers::create_patient_case))
        .route(
            "/{case_id}/attachments",
            post(handlers::upload_attachment).get(handlers::list_attachments),
        )
        .layer(DefaultBodyLimit::max(MAX_ATTACHMENT_BODY_BYTES))
        .layer(middleware::from_fn_with_state(state.clone(), optional_auth_middleware));

    let protected_routes = Router::new()
        .route("/", get(handlers::list_patient_cases))
        .route("/mine", get(handlers::list_my_cases))
        .route("/{case_id}", get(handlers::get_patient_case))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(open_routes)
        .merge(protected_routes)
        .with_state(state)
}
