use std::sync::Arc;

use axum::{
    Extension, Router,
    routing::{get, post},
};

use crate::catalog::MatchingCatalog;
use crate::handlers;

pub fn questionnaire_routes(catalog: Arc<MatchingCatalog>) -> Router {
    Router::new()
        .route("/", get(handlers::get_questionnaire))
        .route("/tags", post(handlers::derive_tags))
        .route("/organ-categories", get(handlers::get_organ_categories))
        .layer(Extension(catalog))
}
