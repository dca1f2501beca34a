use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{body_partial_json, header, method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use patient_case_cell::router::patient_case_routes;
use shared_utils::test_utils::{JwtTestUtils, MockSupabaseResponses, TestConfig, TestUser};

struct TestApp {
    server: MockServer,
    config: TestConfig,
}

impl TestApp {
    async fn start() -> Self {
        let server = MockServer::start().await;
        let config = TestConfig::with_url(&server.uri());
        Self { server, config }
    }

    fn router(&self) -> Router {
        patient_case_routes(self.config.to_arc())
    }

    fn token(&self, user: &TestUser) -> String {
        JwtTestUtils::create_test_token(user, &self.config.jwt_secret, Some(1))
    }

    async fn send(&self, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }

        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }
}

fn case_body() -> Value {
    json!({
        "age": 47,
        "sex": "female",
        "suspectedOrgan": "молочна залоза",
        "suspicionLevel": "high",
        "mainComplaint": "ущільнення у правій молочній залозі"
    })
}

fn owned_case(id: &str, owner: &str) -> Value {
    let mut case = MockSupabaseResponses::patient_case_response(id, "молочна залоза", "high");
    case["created_by_user_id"] = json!(owner);
    case
}

async fn mount_case(app: &TestApp, case: Value) {
    let id = case["id"].as_str().unwrap().to_string();
    Mock::given(method("GET"))
        .and(path("/rest/v1/patient_cases"))
        .and(query_param("id", format!("eq.{}", id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([case])))
        .mount(&app.server)
        .await;
}

async fn mount_case_children(app: &TestApp, case_id: &str) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/attachments"))
        .and(query_param("patient_case_id", format!("eq.{}", case_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::attachment_response("att-1", case_id, "biopsy.pdf")
        ])))
        .mount(&app.server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointment_requests"))
        .and(query_param("patient_case_id", format!("eq.{}", case_id)))
        .and(query_param("select", "*,doctor:doctors(id,slug,full_name)"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_request_response("req-1", "doc-1", case_id)
        ])))
        .mount(&app.server)
        .await;
}

// ==============================================================================
// CASE CREATION
// ==============================================================================

#[tokio::test]
async fn test_anonymous_case_creation() {
    let app = TestApp::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/patient_cases"))
        .and(header("apikey", "test-service-role-key"))
        .and(body_partial_json(json!({ "age": 47, "suspected_organ": "молочна залоза" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::patient_case_response("case-1", "молочна залоза", "high")
        ])))
        .expect(1)
        .mount(&app.server)
        .await;

    let (status, body) = app.send("POST", "/", None, Some(case_body())).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["id"], "case-1");
    assert!(body["created_at"].is_string());
}

#[tokio::test]
async fn test_signed_in_case_is_linked_to_user() {
    let app = TestApp::start().await;
    let user = TestUser::patient("patient@example.com");

    Mock::given(method("POST"))
        .and(path("/rest/v1/patient_cases"))
        .and(body_partial_json(json!({ "created_by_user_id": user.id })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([owned_case("case-2", &user.id)])))
        .expect(1)
        .mount(&app.server)
        .await;

    let (status, body) = app.send("POST", "/", Some(&app.token(&user)), Some(case_body())).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["id"], "case-2");
}

#[tokio::test]
async fn test_case_creation_validates_fields() {
    let app = TestApp::start().await;

    let mut body = case_body();
    body["age"] = json!("сорок");
    let (status, response) = app.send("POST", "/", None, Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["error"], "Field 'age' must be a number");

    let mut body = case_body();
    body["suspicionLevel"] = json!("");
    let (status, _) = app.send("POST", "/", None, Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ==============================================================================
// CASE ACCESS
// ==============================================================================

#[tokio::test]
async fn test_case_listing_is_admin_only() {
    let app = TestApp::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/patient_cases"))
        .and(query_param("order", "created_at.desc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::patient_case_response("case-2", "легені", "low"),
            MockSupabaseResponses::patient_case_response("case-1", "шкіра", "medium"),
        ])))
        .mount(&app.server)
        .await;

    let patient = TestUser::patient("patient@example.com");
    let (status, _) = app.send("GET", "/", Some(&app.token(&patient)), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.send("GET", "/", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let admin = TestUser::admin("admin@example.com");
    let (status, body) = app.send("GET", "/", Some(&app.token(&admin)), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_my_cases_filter_by_creator() {
    let app = TestApp::start().await;
    let user = TestUser::patient("patient@example.com");

    Mock::given(method("GET"))
        .and(path("/rest/v1/patient_cases"))
        .and(query_param("created_by_user_id", format!("eq.{}", user.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([owned_case("case-9", &user.id)])))
        .expect(1)
        .mount(&app.server)
        .await;

    let (status, body) = app.send("GET", "/mine", Some(&app.token(&user)), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["id"], "case-9");
}

#[tokio::test]
async fn test_owner_sees_case_with_attachments_and_requests() {
    let app = TestApp::start().await;
    let user = TestUser::patient("patient@example.com");

    mount_case(&app, owned_case("case-1", &user.id)).await;
    mount_case_children(&app, "case-1").await;

    let (status, body) = app.send("GET", "/case-1", Some(&app.token(&user)), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "case-1");
    assert_eq!(body["suspected_organ"], "молочна залоза");
    assert_eq!(body["attachments"][0]["filename"], "biopsy.pdf");
    assert_eq!(body["attachments"][0]["type"], "histology");
    assert_eq!(body["appointment_requests"][0]["status"], "PENDING");
}

#[tokio::test]
async fn test_other_patient_is_forbidden() {
    let app = TestApp::start().await;
    mount_case(&app, owned_case("case-1", "someone-else")).await;

    let intruder = TestUser::patient("intruder@example.com");
    let (status, _) = app.send("GET", "/case-1", Some(&app.token(&intruder)), None).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_unknown_case_is_not_found() {
    let app = TestApp::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/patient_cases"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&app.server)
        .await;

    let admin = TestUser::admin("admin@example.com");
    let (status, _) = app.send("GET", "/missing", Some(&app.token(&admin)), None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_doctor_sees_only_requested_cases() {
    let app = TestApp::start().await;
    let doctor = TestUser::doctor("doctor@example.com");

    mount_case(&app, owned_case("case-1", "patient-1")).await;
    mount_case(&app, owned_case("case-2", "patient-2")).await;
    mount_case_children(&app, "case-1").await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("user_id", format!("eq.{}", doctor.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": "doc-1" }])))
        .mount(&app.server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointment_requests"))
        .and(query_param("doctor_id", "eq.doc-1"))
        .and(query_param("patient_case_id", "eq.case-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": "req-1" }])))
        .mount(&app.server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointment_requests"))
        .and(query_param("doctor_id", "eq.doc-1"))
        .and(query_param("patient_case_id", "eq.case-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&app.server)
        .await;

    let token = app.token(&doctor);

    let (status, _) = app.send("GET", "/case-1", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.send("GET", "/case-2", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

// ==============================================================================
// ATTACHMENTS
// ==============================================================================

#[tokio::test]
async fn test_upload_attachment_stores_object_and_row() {
    let app = TestApp::start().await;
    mount_case(&app, MockSupabaseResponses::patient_case_response("case-1", "шкіра", "low")).await;

    Mock::given(method("POST"))
        .and(path_regex(r"^/storage/v1/object/patient-files/case-1/\d+-[a-z0-9]{10}\.pdf$"))
        .and(header("content-type", "application/pdf"))
        .and(header("x-upsert", "false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "Key": "patient-files/case-1/x.pdf" })))
        .expect(1)
        .mount(&app.server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/attachments"))
        .and(body_partial_json(json!({
            "patient_case_id": "case-1",
            "type": "histology",
            "filename": "Biopsy.PDF",
            "size": 5,
            "content_type": "application/pdf"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::attachment_response("att-7", "case-1", "Biopsy.PDF")
        ])))
        .expect(1)
        .mount(&app.server)
        .await;

    let upload = json!({
        "filename": "Biopsy.PDF",
        "type": "histology",
        "file_data": "data:application/pdf;base64,JVBERi0="
    });

    let (status, body) = app.send("POST", "/case-1/attachments", None, Some(upload)).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["id"], "att-7");
    assert_eq!(body["filename"], "Biopsy.PDF");
    assert!(body["url"].as_str().unwrap().contains("/storage/v1/object/public/patient-files/case-1/"));
}

#[tokio::test]
async fn test_upload_to_unknown_case_is_not_found() {
    let app = TestApp::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/patient_cases"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&app.server)
        .await;

    let upload = json!({ "filename": "scan.png", "file_data": "aGVsbG8=" });
    let (status, _) = app.send("POST", "/missing/attachments", None, Some(upload)).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_upload_rejects_invalid_base64() {
    let app = TestApp::start().await;
    mount_case(&app, MockSupabaseResponses::patient_case_response("case-1", "шкіра", "low")).await;

    let upload = json!({ "filename": "scan.png", "file_data": "%%%" });
    let (status, body) = app.send("POST", "/case-1/attachments", None, Some(upload)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Invalid attachment"));
}

#[tokio::test]
async fn test_list_attachments_newest_first() {
    let app = TestApp::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/attachments"))
        .and(query_param("patient_case_id", "eq.case-1"))
        .and(query_param("order", "created_at.desc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::attachment_response("att-2", "case-1", "ihc.pdf"),
            MockSupabaseResponses::attachment_response("att-1", "case-1", "he.pdf"),
        ])))
        .mount(&app.server)
        .await;

    let (status, body) = app.send("GET", "/case-1/attachments", None, None).await;

    assert_eq!(status, StatusCode::OK);
    let ids: Vec<_> = body.as_array().unwrap().iter().map(|a| a["id"].as_str().unwrap()).collect();
    assert_eq!(ids, vec!["att-2", "att-1"]);
    assert!(body[0].get("size").is_none());
}
