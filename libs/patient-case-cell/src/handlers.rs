use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;
use tracing::warn;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::OptionalSession;

use crate::models::{
    AttachmentSummary, CreatePatientCaseRequest, CreatedCase, PatientCase, PatientCaseDetail,
    PatientCaseError, UploadAttachmentRequest,
};
use crate::services::{AttachmentService, PatientCaseService};

fn database_error(e: anyhow::Error) -> AppError {
    PatientCaseError::Database(e.to_string()).into()
}

// ==============================================================================
// CASES
// ==============================================================================

#[axum::debug_handler]
pub async fn create_patient_case(
    State(state): State<Arc<AppConfig>>,
    OptionalSession(session): OptionalSession,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<CreatedCase>), AppError> {
    let request = CreatePatientCaseRequest::from_json(&body)?;
    let case_service = PatientCaseService::new(&state);

    let user_id = session.as_ref().map(|s| s.user.id.as_str());
    let case = case_service.create_case(request, user_id).await
        .map_err(database_error)?;

    Ok((
        StatusCode::CREATED,
        Json(CreatedCase {
            id: case.id,
            created_at: case.created_at,
        }),
    ))
}

#[axum::debug_handler]
pub async fn list_patient_cases(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
) -> Result<Json<Vec<PatientCase>>, AppError> {
    if !user.is_admin() {
        return Err(AppError::Forbidden("Only administrators can list all cases".to_string()));
    }

    let case_service = PatientCaseService::new(&state);
    let cases = case_service.list_cases().await.map_err(database_error)?;

    Ok(Json(cases))
}

#[axum::debug_handler]
pub async fn list_my_cases(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
) -> Result<Json<Vec<PatientCase>>, AppError> {
    let case_service = PatientCaseService::new(&state);
    let cases = case_service.list_for_user(&user.id).await.map_err(database_error)?;

    Ok(Json(cases))
}

#[axum::debug_handler]
pub async fn get_patient_case(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(case_id): Path<String>,
) -> Result<Json<PatientCaseDetail>, AppError> {
    let case_service = PatientCaseService::new(&state);
    let attachment_service = AttachmentService::new(&state);

    let detail = case_service.get_case_detail(&case_id, &user, &attachment_service).await?;

    Ok(Json(detail))
}

// ==============================================================================
// ATTACHMENTS
// ==============================================================================

#[axum::debug_handler]
pub async fn upload_attachment(
    State(state): State<Arc<AppConfig>>,
    Path(case_id): Path<String>,
    Json(request): Json<UploadAttachmentRequest>,
) -> Result<(StatusCode, Json<AttachmentSummary>), AppError> {
    if !state.is_storage_configured() {
        warn!("Attachment upload attempted without storage configuration");
        return Err(AppError::Internal("File storage is not configured".to_string()));
    }

    let attachment_service = AttachmentService::new(&state);
    let summary = attachment_service.upload(&case_id, request).await?;

    Ok((StatusCode::CREATED, Json(summary)))
}

#[axum::debug_handler]
pub async fn list_attachments(
    State(state): State<Arc<AppConfig>>,
    Path(case_id): Path<String>,
) -> Result<Json<Vec<AttachmentSummary>>, AppError> {
    let attachment_service = AttachmentService::new(&state);
    let attachments = attachment_service.list(&case_id).await.map_err(database_error)?;

    Ok(Json(attachments))
}
