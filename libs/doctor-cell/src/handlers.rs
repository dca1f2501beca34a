use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use serde_json::{json, Value};
use tracing::debug;

use matching_cell::{MatchingCatalog, MatchingService};
use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{
    DoctorError, DoctorListing, DoctorIdentity, DoctorSearchFilters, ListingQuery,
    MatchDoctorsRequest, MatchDoctorsResponse,
};
use crate::services::{DoctorListingService, DoctorService};

// ==============================================================================
// PUBLIC HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_doctors(
    State(state): State<Arc<AppConfig>>,
    Query(filters): Query<DoctorSearchFilters>,
) -> Result<Json<Value>, AppError> {
    let doctor_service = DoctorService::new(&state);

    let doctors = doctor_service.list_doctors(&filters).await
        .map_err(|e| AppError::from(DoctorError::Upstream(e.to_string())))?;

    Ok(Json(json!(doctors)))
}

#[axum::debug_handler]
pub async fn get_doctor_listing(
    State(state): State<Arc<AppConfig>>,
    Extension(catalog): Extension<Arc<MatchingCatalog>>,
    Query(query): Query<ListingQuery>,
) -> Result<Json<DoctorListing>, AppError> {
    let listing_service = DoctorListingService::new(&state, MatchingService::new(catalog));

    let listing = listing_service.listing(&query).await
        .map_err(|e| AppError::from(DoctorError::Upstream(e.to_string())))?;

    Ok(Json(listing))
}

#[axum::debug_handler]
pub async fn match_doctors(
    State(state): State<Arc<AppConfig>>,
    Extension(catalog): Extension<Arc<MatchingCatalog>>,
    Json(request): Json<MatchDoctorsRequest>,
) -> Result<Json<MatchDoctorsResponse>, AppError> {
    let listing_service = DoctorListingService::new(&state, MatchingService::new(catalog));

    let response = listing_service.match_answers(&request.answers).await
        .map_err(|e| AppError::from(DoctorError::Upstream(e.to_string())))?;

    debug!("Matched {} doctors for tags {:?}", response.doctors.len(), response.tags);

    Ok(Json(response))
}

#[axum::debug_handler]
pub async fn get_doctor_by_slug(
    State(state): State<Arc<AppConfig>>,
    Path(slug): Path<String>,
) -> Result<Json<Value>, AppError> {
    let doctor_service = DoctorService::new(&state);

    let doctor = doctor_service.get_by_slug(&slug).await
        .map_err(|e| AppError::from(DoctorError::Upstream(e.to_string())))?
        .ok_or(DoctorError::NotFound)?;

    let markers: Vec<_> = doctor.map_marker().into_iter().collect();

    Ok(Json(json!({
        "doctor": doctor,
        "markers": markers,
    })))
}

// ==============================================================================
// AUTHENTICATED HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_my_doctor_profile(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
) -> Result<Json<DoctorIdentity>, AppError> {
    if !user.is_doctor() {
        return Err(DoctorError::NotADoctor.into());
    }

    let doctor_service = DoctorService::new(&state);

    let identity = doctor_service.get_for_user(&user.id).await
        .map_err(|e| AppError::from(DoctorError::Upstream(e.to_string())))?
        .ok_or(DoctorError::ProfileNotLinked)?;

    Ok(Json(identity))
}
