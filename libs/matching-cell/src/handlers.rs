use std::sync::Arc;

use axum::{Extension, Json};
use serde_json::{json, Value};
use tracing::debug;

use shared_models::error::AppError;

use crate::catalog::MatchingCatalog;
use crate::models::{DeriveTagsRequest, DeriveTagsResponse};
use crate::services::MatchingService;

#[axum::debug_handler]
pub async fn get_questionnaire(
    Extension(catalog): Extension<Arc<MatchingCatalog>>,
) -> Result<Json<Value>, AppError> {
    Ok(Json(json!(catalog.questionnaire)))
}

#[axum::debug_handler]
pub async fn derive_tags(
    Extension(catalog): Extension<Arc<MatchingCatalog>>,
    Json(request): Json<DeriveTagsRequest>,
) -> Result<Json<DeriveTagsResponse>, AppError> {
    let service = MatchingService::new(catalog);

    service.validate_answers(&request.answers)?;
    let tags = service.derive_tags(&request.answers);

    debug!("Questionnaire answers mapped to tags {:?}", tags);

    Ok(Json(DeriveTagsResponse {
        tags,
        questionnaire_version: service.catalog().questionnaire.version,
    }))
}

#[axum::debug_handler]
pub async fn get_organ_categories(
    Extension(catalog): Extension<Arc<MatchingCatalog>>,
) -> Result<Json<Value>, AppError> {
    Ok(Json(json!({
        "all_label": catalog.organ_filter.all_label,
        "options": catalog.organ_filter.options,
    })))
}
