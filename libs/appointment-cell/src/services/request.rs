use anyhow::{anyhow, Result};
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Method,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::auth::{User, UserRole};

use crate::models::{
    AppointmentError, AppointmentRequest, AppointmentRequestDetail, NewAppointmentRequest,
    RequestListQuery, REQUEST_LIST_LIMIT,
};
use crate::services::lifecycle::AppointmentLifecycleService;

const DETAIL_SELECT: &str = "*,doctor:doctors(id,slug,full_name,user_id),patient_case:patient_cases(id,age,sex,suspected_organ,suspicion_level)";

#[derive(Debug, Deserialize)]
struct IdRow {
    id: String,
}

fn database_error(e: anyhow::Error) -> AppointmentError {
    AppointmentError::Database(e.to_string())
}

pub struct AppointmentRequestService {
    supabase: SupabaseClient,
}

impl AppointmentRequestService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::service(config),
        }
    }

    fn representation_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));
        headers
    }

    async fn exists(&self, table: &str, id: &str) -> Result<bool> {
        let path = format!("/rest/v1/{}?id=eq.{}&select=id&limit=1", table, urlencoding::encode(id));
        let rows: Vec<IdRow> = self.supabase.request(Method::GET, &path, None, None).await?;
        Ok(!rows.is_empty())
    }

    /// Newest first, capped at [`REQUEST_LIST_LIMIT`] rows.
    pub async fn list(&self, query: &RequestListQuery) -> Result<Vec<AppointmentRequestDetail>> {
        let mut path = format!("/rest/v1/appointment_requests?select={}", DETAIL_SELECT);

        if let Some(doctor_id) = query.doctor_id.as_deref().filter(|id| !id.is_empty()) {
            path.push_str(&format!("&doctor_id=eq.{}", urlencoding::encode(doctor_id)));
        }
        if let Some(case_id) = query.case_id.as_deref().filter(|id| !id.is_empty()) {
            path.push_str(&format!("&patient_case_id=eq.{}", urlencoding::encode(case_id)));
        }
        path.push_str(&format!("&order=created_at.desc&limit={}", REQUEST_LIST_LIMIT));

        self.supabase.request(Method::GET, &path, None, None).await
    }

    pub async fn list_for_patient(&self, user_id: &str) -> Result<Vec<AppointmentRequestDetail>> {
        let path = format!(
            "/rest/v1/appointment_requests?patient_user_id=eq.{}&select={}&order=created_at.desc",
            urlencoding::encode(user_id),
            DETAIL_SELECT
        );
        self.supabase.request(Method::GET, &path, None, None).await
    }

    pub async fn list_for_doctor(&self, doctor_id: &str) -> Result<Vec<AppointmentRequestDetail>> {
        let path = format!(
            "/rest/v1/appointment_requests?doctor_id=eq.{}&select={}&order=created_at.desc",
            urlencoding::encode(doctor_id),
            DETAIL_SELECT
        );
        self.supabase.request(Method::GET, &path, None, None).await
    }

    pub async fn doctor_id_for_user(&self, user_id: &str) -> Result<Option<String>> {
        let path = format!(
            "/rest/v1/doctors?user_id=eq.{}&select=id&limit=1",
            urlencoding::encode(user_id)
        );
        let rows: Vec<IdRow> = self.supabase.request(Method::GET, &path, None, None).await?;
        Ok(rows.into_iter().next().map(|row| row.id))
    }

    pub async fn get_with_doctor(&self, request_id: &str) -> Result<Option<AppointmentRequestDetail>> {
        let path = format!(
            "/rest/v1/appointment_requests?id=eq.{}&select={}&limit=1",
            urlencoding::encode(request_id),
            DETAIL_SELECT
        );
        let rows: Vec<AppointmentRequestDetail> = self.supabase.request(Method::GET, &path, None, None).await?;
        Ok(rows.into_iter().next())
    }

    async fn patch(&self, request_id: &str, changes: Value) -> Result<AppointmentRequest> {
        let path = format!("/rest/v1/appointment_requests?id=eq.{}", urlencoding::encode(request_id));
        let rows: Vec<AppointmentRequest> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            None,
            Some(changes),
            Some(Self::representation_headers()),
        ).await?;

        rows.into_iter().next()
            .ok_or_else(|| anyhow!("Appointment request {} vanished during update", request_id))
    }

    /// Stores a new PENDING request after checking the doctor and case exist.
    pub async fn create(
        &self,
        request: NewAppointmentRequest,
        patient_user_id: Option<&str>,
    ) -> Result<AppointmentRequest, AppointmentError> {
        if !self.exists("doctors", &request.doctor_id).await.map_err(database_error)? {
            return Err(AppointmentError::DoctorNotFound);
        }
        if !self.exists("patient_cases", &request.patient_case_id).await.map_err(database_error)? {
            return Err(AppointmentError::CaseNotFound);
        }

        let mut data = json!(request);
        if let Some(fields) = data.as_object_mut() {
            fields.insert("status".to_string(), json!("PENDING"));
            if let Some(user_id) = patient_user_id {
                fields.insert("patient_user_id".to_string(), json!(user_id));
            }
        }

        let rows: Vec<AppointmentRequest> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/appointment_requests",
            None,
            Some(data),
            Some(Self::representation_headers()),
        ).await.map_err(database_error)?;

        let created = rows.into_iter().next()
            .ok_or_else(|| AppointmentError::Database("Failed to create appointment request".to_string()))?;

        info!(
            "Appointment request {} created for doctor {} and case {}",
            created.id, created.doctor_id, created.patient_case_id
        );
        Ok(created)
    }

    /// Requests addressed to the doctor profile linked to `user`. ADMIN sees
    /// the unfiltered listing.
    pub async fn inbox(&self, user: &User) -> Result<Vec<AppointmentRequestDetail>, AppointmentError> {
        match user.user_role() {
            UserRole::Admin => {
                return self.list(&RequestListQuery::default()).await.map_err(database_error);
            }
            UserRole::Patient => return Err(AppointmentError::NoInbox),
            UserRole::Doctor => {}
        }

        let doctor_id = self.doctor_id_for_user(&user.id).await
            .map_err(database_error)?
            .ok_or(AppointmentError::ProfileNotLinked)?;

        self.list_for_doctor(&doctor_id).await.map_err(database_error)
    }

    async fn load_managed(&self, user: &User, request_id: &str) -> Result<AppointmentRequestDetail, AppointmentError> {
        let request = self.get_with_doctor(request_id).await
            .map_err(database_error)?
            .ok_or(AppointmentError::NotFound)?;

        AppointmentLifecycleService::authorize(user, &request)?;
        Ok(request)
    }

    pub async fn update_status(
        &self,
        user: &User,
        request_id: &str,
        status: Option<&str>,
    ) -> Result<AppointmentRequest, AppointmentError> {
        let status = AppointmentLifecycleService::parse_status(status)?;
        let current = self.load_managed(user, request_id).await?;

        debug!("Request {}: {} -> {}", request_id, current.request.status, status);

        let updated = self.patch(request_id, json!({ "status": status })).await
            .map_err(database_error)?;

        info!("Appointment request {} set to {} by user {}", request_id, status, user.id);
        Ok(updated)
    }

    /// Saves the doctor's reply; the status is left as is.
    pub async fn save_reply(
        &self,
        user: &User,
        request_id: &str,
        reply: Option<&str>,
    ) -> Result<AppointmentRequest, AppointmentError> {
        let reply = AppointmentLifecycleService::validate_reply(reply)?;
        self.load_managed(user, request_id).await?;

        let updated = self.patch(
            request_id,
            json!({
                "doctor_reply": reply,
                "doctor_reply_created_at": AppointmentLifecycleService::reply_timestamp(),
            }),
        ).await.map_err(database_error)?;

        info!("Doctor reply saved on appointment request {}", request_id);
        Ok(updated)
    }
}
