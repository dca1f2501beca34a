use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::OptionalSession;

use crate::models::{
    AppointmentError, AppointmentRequest, AppointmentRequestDetail, CreateAppointmentRequestBody,
    ReplyRequest, RequestListQuery, UpdateStatusRequest,
};
use crate::services::AppointmentRequestService;

fn database_error(e: anyhow::Error) -> AppError {
    AppointmentError::Database(e.to_string()).into()
}

#[axum::debug_handler]
pub async fn list_appointment_requests(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Query(query): Query<RequestListQuery>,
) -> Result<Json<Vec<AppointmentRequestDetail>>, AppError> {
    if !user.is_admin() {
        return Err(AppError::Forbidden("Only administrators can list all appointment requests".to_string()));
    }

    let service = AppointmentRequestService::new(&state);
    let requests = service.list(&query).await.map_err(database_error)?;

    Ok(Json(requests))
}

#[axum::debug_handler]
pub async fn create_appointment_request(
    State(state): State<Arc<AppConfig>>,
    OptionalSession(session): OptionalSession,
    Json(body): Json<CreateAppointmentRequestBody>,
) -> Result<(StatusCode, Json<AppointmentRequest>), AppError> {
    let user = session.as_ref().map(|s| &s.user);
    let new_request = body.resolve(user.and_then(|u| u.email.as_deref()))?;

    let service = AppointmentRequestService::new(&state);
    let created = service.create(new_request, user.map(|u| u.id.as_str())).await?;

    Ok((StatusCode::CREATED, Json(created)))
}

#[axum::debug_handler]
pub async fn list_my_requests(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
) -> Result<Json<Vec<AppointmentRequestDetail>>, AppError> {
    let service = AppointmentRequestService::new(&state);
    let requests = service.list_for_patient(&user.id).await.map_err(database_error)?;

    Ok(Json(requests))
}

#[axum::debug_handler]
pub async fn doctor_inbox(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
) -> Result<Json<Vec<AppointmentRequestDetail>>, AppError> {
    let service = AppointmentRequestService::new(&state);
    let requests = service.inbox(&user).await?;

    Ok(Json(requests))
}

#[axum::debug_handler]
pub async fn update_request_status(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(request_id): Path<String>,
    Json(body): Json<UpdateStatusRequest>,
) -> Result<Json<AppointmentRequest>, AppError> {
    let service = AppointmentRequestService::new(&state);
    let updated = service.update_status(&user, &request_id, body.status.as_deref()).await?;

    Ok(Json(updated))
}

#[axum::debug_handler]
pub async fn reply_to_request(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(request_id): Path<String>,
    Json(body): Json<ReplyRequest>,
) -> Result<Json<AppointmentRequest>, AppError> {
    let service = AppointmentRequestService::new(&state);
    let updated = service.save_reply(&user, &request_id, body.doctor_reply.as_deref()).await?;

    Ok(Json(updated))
}
