use std::sync::Arc;

use axum::{
    Json,
    Router,
    routing::get,
};
use serde_json::{json, Value};

use admin_cell::router::admin_routes;
use appointment_cell::router::appointment_request_routes;
use doctor_cell::router::{doctor_routes, me_routes};
use matching_cell::router::questionnaire_routes;
use matching_cell::MatchingCatalog;
use patient_case_cell::router::patient_case_routes;
use shared_config::AppConfig;

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub fn create_router(state: Arc<AppConfig>, catalog: Arc<MatchingCatalog>) -> Router {
    Router::new()
        .route("/", get(|| async { "onco-match API is running!" }))
        .route("/health", get(health))
        .nest("/questionnaire", questionnaire_routes(catalog.clone()))
        .nest("/doctors", doctor_routes(state.clone(), catalog))
        .nest("/me", me_routes(state.clone()))
        .nest("/patient-cases", patient_case_routes(state.clone()))
        .nest("/appointment-requests", appointment_request_routes(state.clone()))
        .nest("/admin", admin_routes(state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::{Request, StatusCode}};
    use shared_utils::test_utils::TestConfig;
    use tower::ServiceExt;

    fn app() -> Router {
        let catalog = Arc::new(MatchingCatalog::embedded().unwrap());
        create_router(TestConfig::default().to_arc(), catalog)
    }

    async fn status_of(uri: &str) -> StatusCode {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        app().oneshot(request).await.unwrap().status()
    }

    #[tokio::test]
    async fn test_public_routes_are_mounted() {
        assert_eq!(status_of("/health").await, StatusCode::OK);
        assert_eq!(status_of("/questionnaire").await, StatusCode::OK);
        assert_eq!(status_of("/questionnaire/organ-categories").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_protected_routes_require_a_token() {
        assert_eq!(status_of("/me/doctor").await, StatusCode::UNAUTHORIZED);
        assert_eq!(status_of("/patient-cases/mine").await, StatusCode::UNAUTHORIZED);
        assert_eq!(status_of("/appointment-requests/inbox").await, StatusCode::UNAUTHORIZED);
        assert_eq!(status_of("/admin/overview").await, StatusCode::UNAUTHORIZED);
    }
}
