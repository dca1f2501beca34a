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
    AttachmentSummary, CaseRequest, CreatePatientCaseRequest, PatientCase, PatientCaseDetail,
    PatientCaseError,
};
use crate::services::attachment::AttachmentService;

#[derive(Debug, Deserialize)]
struct IdRow {
    id: String,
}

/// Patient cases are written by anonymous visitors as well as signed-in
/// users, so access rules are enforced here and the service-role client is used.
pub struct PatientCaseService {
    supabase: SupabaseClient,
}

impl PatientCaseService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::service(config),
        }
    }

    pub async fn create_case(
        &self,
        request: CreatePatientCaseRequest,
        created_by_user_id: Option<&str>,
    ) -> Result<PatientCase> {
        debug!("Creating patient case, organ '{}', suspicion '{}'", request.suspected_organ, request.suspicion_level);

        let mut case_data = json!(request);
        if let (Some(user_id), Some(data)) = (created_by_user_id, case_data.as_object_mut()) {
            data.insert("created_by_user_id".to_string(), json!(user_id));
        }

        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));

        let result: Vec<PatientCase> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/patient_cases",
            None,
            Some(case_data),
            Some(headers),
        ).await?;

        let case = result.into_iter().next()
            .ok_or_else(|| anyhow!("Failed to create patient case"))?;

        info!("Patient case {} created (signed in: {})", case.id, created_by_user_id.is_some());
        Ok(case)
    }

    pub async fn list_cases(&self) -> Result<Vec<PatientCase>> {
        self.supabase.request(
            Method::GET,
            "/rest/v1/patient_cases?select=*&order=created_at.desc",
            None,
            None,
        ).await
    }

    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<PatientCase>> {
        let path = format!(
            "/rest/v1/patient_cases?created_by_user_id=eq.{}&select=*&order=created_at.desc",
            urlencoding::encode(user_id)
        );
        self.supabase.request(Method::GET, &path, None, None).await
    }

    pub async fn get_case(&self, case_id: &str) -> Result<Option<PatientCase>> {
        let path = format!("/rest/v1/patient_cases?id=eq.{}&limit=1", urlencoding::encode(case_id));
        let cases: Vec<PatientCase> = self.supabase.request(Method::GET, &path, None, None).await?;
        Ok(cases.into_iter().next())
    }

    async fn doctor_id_for_user(&self, user_id: &str) -> Result<Option<String>> {
        let path = format!(
            "/rest/v1/doctors?user_id=eq.{}&select=id&limit=1",
            urlencoding::encode(user_id)
        );
        let rows: Vec<IdRow> = self.supabase.request(Method::GET, &path, None, None).await?;
        Ok(rows.into_iter().next().map(|row| row.id))
    }

    async fn doctor_has_request(&self, doctor_id: &str, case_id: &str) -> Result<bool> {
        let path = format!(
            "/rest/v1/appointment_requests?doctor_id=eq.{}&patient_case_id=eq.{}&select=id&limit=1",
            urlencoding::encode(doctor_id),
            urlencoding::encode(case_id)
        );
        let rows: Vec<Value> = self.supabase.request(Method::GET, &path, None, None).await?;
        Ok(!rows.is_empty())
    }

    /// ADMIN sees every case, a PATIENT only the cases they created, a DOCTOR
    /// only cases one of their appointment requests points at.
    pub async fn authorize_view(&self, user: &User, case: &PatientCase) -> Result<(), PatientCaseError> {
        let allowed = match user.user_role() {
            UserRole::Admin => true,
            UserRole::Patient => case.created_by_user_id.as_deref() == Some(user.id.as_str()),
            UserRole::Doctor => {
                let doctor_id = self.doctor_id_for_user(&user.id).await
                    .map_err(|e| PatientCaseError::Database(e.to_string()))?;
                match doctor_id {
                    Some(doctor_id) => self.doctor_has_request(&doctor_id, &case.id).await
                        .map_err(|e| PatientCaseError::Database(e.to_string()))?,
                    None => false,
                }
            }
        };

        if allowed {
            Ok(())
        } else {
            debug!("User {} ({}) denied access to case {}", user.id, user.user_role(), case.id);
            Err(PatientCaseError::Forbidden)
        }
    }

    async fn requests_for_case(&self, case_id: &str) -> Result<Vec<CaseRequest>> {
        let path = format!(
            "/rest/v1/appointment_requests?patient_case_id=eq.{}&select=*,doctor:doctors(id,slug,full_name)&order=created_at.desc",
            urlencoding::encode(case_id)
        );
        self.supabase.request(Method::GET, &path, None, None).await
    }

    /// Case with attachments and appointment requests, after checking access.
    pub async fn get_case_detail(
        &self,
        case_id: &str,
        user: &User,
        attachments: &AttachmentService,
    ) -> Result<PatientCaseDetail, PatientCaseError> {
        let case = self.get_case(case_id).await
            .map_err(|e| PatientCaseError::Database(e.to_string()))?
            .ok_or(PatientCaseError::NotFound)?;

        self.authorize_view(user, &case).await?;

        let attachments: Vec<AttachmentSummary> = attachments.list(case_id).await
            .map_err(|e| PatientCaseError::Database(e.to_string()))?;
        let appointment_requests = self.requests_for_case(case_id).await
            .map_err(|e| PatientCaseError::Database(e.to_string()))?;

        Ok(PatientCaseDetail {
            case,
            attachments,
            appointment_requests,
        })
    }
}
