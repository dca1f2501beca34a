use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use shared_models::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatientCase {
    pub id: String,
    pub created_by_user_id: Option<String>,
    pub age: i32,
    pub sex: String,
    pub suspected_organ: String,
    pub suspicion_level: String,
    pub main_complaint: Option<String>,
    pub free_text_summary: Option<String>,
    pub biopsy_type: Option<String>,
    pub material_type: Option<String>,
    pub prior_treatment: Option<String>,
    pub suspected_cancer_type: Option<String>,
    pub staging_info: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Validated input for a new case.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CreatePatientCaseRequest {
    pub age: i32,
    pub sex: String,
    pub suspected_organ: String,
    pub suspicion_level: String,
    pub main_complaint: Option<String>,
    pub free_text_summary: Option<String>,
    pub biopsy_type: Option<String>,
    pub material_type: Option<String>,
    pub prior_treatment: Option<String>,
    pub suspected_cancer_type: Option<String>,
    pub staging_info: Option<String>,
}

/// Looks a field up by its snake_case name, then by its camelCase name.
fn field<'a>(body: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    body.get(name).or_else(|| body.get(&snake_to_camel(name)))
}

fn snake_to_camel(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = false;
    for ch in name.chars() {
        if ch == '_' {
            upper = true;
        } else if upper {
            out.extend(ch.to_uppercase());
            upper = false;
        } else {
            out.push(ch);
        }
    }
    out
}

fn required_text(body: &Map<String, Value>, name: &str) -> Result<String, PatientCaseError> {
    match field(body, name) {
        Some(Value::String(text)) if !text.is_empty() => Ok(text.clone()),
        _ => Err(PatientCaseError::Validation(format!("Field '{}' must be a non-empty string", name))),
    }
}

/// Non-string values are dropped rather than rejected.
fn optional_text(body: &Map<String, Value>, name: &str) -> Option<String> {
    field(body, name).and_then(Value::as_str).map(String::from)
}

impl CreatePatientCaseRequest {
    pub fn from_json(body: &Value) -> Result<Self, PatientCaseError> {
        let Some(body) = body.as_object() else {
            return Err(PatientCaseError::Validation("Request body must be a JSON object".to_string()));
        };

        let age = match field(body, "age") {
            Some(Value::Number(number)) => number
                .as_i64()
                .or_else(|| number.as_f64().filter(|v| v.fract() == 0.0).map(|v| v as i64))
                .and_then(|v| i32::try_from(v).ok())
                .ok_or_else(|| PatientCaseError::Validation("Field 'age' must be a whole number".to_string()))?,
            _ => return Err(PatientCaseError::Validation("Field 'age' must be a number".to_string())),
        };

        Ok(Self {
            age,
            sex: required_text(body, "sex")?,
            suspected_organ: required_text(body, "suspected_organ")?,
            suspicion_level: required_text(body, "suspicion_level")?,
            main_complaint: optional_text(body, "main_complaint"),
            free_text_summary: optional_text(body, "free_text_summary"),
            biopsy_type: optional_text(body, "biopsy_type"),
            material_type: optional_text(body, "material_type"),
            prior_treatment: optional_text(body, "prior_treatment"),
            suspected_cancer_type: optional_text(body, "suspected_cancer_type"),
            staging_info: optional_text(body, "staging_info"),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreatedCase {
    pub id: String,
    pub created_at: DateTime<Utc>,
}

// ==============================================================================
// ATTACHMENTS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Attachment {
    pub id: String,
    pub patient_case_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub url: String,
    pub filename: String,
    pub size: Option<i64>,
    pub content_type: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AttachmentSummary {
    pub id: String,
    pub filename: String,
    pub url: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub created_at: DateTime<Utc>,
}

impl From<Attachment> for AttachmentSummary {
    fn from(attachment: Attachment) -> Self {
        Self {
            id: attachment.id,
            filename: attachment.filename,
            url: attachment.url,
            kind: attachment.kind,
            created_at: attachment.created_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadAttachmentRequest {
    pub filename: String,
    pub content_type: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Base64 payload, optionally prefixed with a `data:` URL header.
    pub file_data: String,
}

// ==============================================================================
// CASE VIEW
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RequestDoctor {
    pub id: String,
    pub slug: String,
    pub full_name: String,
}

/// Appointment request as listed on a case, with its doctor embedded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CaseRequest {
    pub id: String,
    pub doctor_id: String,
    pub patient_email: String,
    pub message: String,
    pub status: String,
    pub doctor_reply: Option<String>,
    pub doctor_reply_created_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub doctor: Option<RequestDoctor>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PatientCaseDetail {
    #[serde(flatten)]
    pub case: PatientCase,
    pub attachments: Vec<AttachmentSummary>,
    pub appointment_requests: Vec<CaseRequest>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PatientCaseError {
    #[error("Patient case not found")]
    NotFound,

    #[error("Access to this patient case is not allowed")]
    Forbidden,

    #[error("{0}")]
    Validation(String),

    #[error("Invalid attachment: {0}")]
    InvalidFile(String),

    #[error("Storage upload failed: {0}")]
    Storage(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<PatientCaseError> for AppError {
    fn from(err: PatientCaseError) -> Self {
        match err {
            PatientCaseError::NotFound => AppError::NotFound(err.to_string()),
            PatientCaseError::Forbidden => AppError::Forbidden(err.to_string()),
            PatientCaseError::Validation(msg) => AppError::ValidationError(msg),
            PatientCaseError::InvalidFile(_) => AppError::BadRequest(err.to_string()),
            PatientCaseError::Storage(msg) => AppError::ExternalService(msg),
            PatientCaseError::Database(msg) => AppError::Database(msg),
        }
    }
}
