use std::sync::Arc;

use axum::{
    extract::{Extension, State},
    Json,
};

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{AdminError, AdminOverview};
use crate::services::AdminOverviewService;

#[axum::debug_handler]
pub async fn get_overview(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
) -> Result<Json<AdminOverview>, AppError> {
    if !user.is_admin() {
        return Err(AdminError::NotAdmin.into());
    }

    let service = AdminOverviewService::new(&state);
    let overview = service.overview().await
        .map_err(|e| AdminError::Upstream(e.to_string()))?;

    Ok(Json(overview))
}
