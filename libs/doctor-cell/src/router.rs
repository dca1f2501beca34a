use std::sync::Arc;

use axum::{
    Extension, Router,
    routing::{get, post},
    middleware,
};

use matching_cell::MatchingCatalog;
use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn doctor_routes(state: Arc<AppConfig>, catalog: Arc<MatchingCatalog>) -> Router {
    Router::new()
        .route("/", get(handlers::list_doctors))
        .route("/listing", get(handlers::get_doctor_listing))
        .route("/match", post(handlers::match_doctors))
        .route("/{slug}", get(handlers::get_doctor_by_slug))
        .layer(Extension(catalog))
        .with_state(state)
}

/// Routes about the signed-in user, mounted under `/me`.
pub fn me_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/doctor", get(handlers::get_my_doctor_profile))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
