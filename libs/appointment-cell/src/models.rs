use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shared_models::error::AppError;

/// Stored when the patient leaves the message field blank.
pub const DEFAULT_REQUEST_MESSAGE: &str = "Пацієнт не залишив додаткового повідомлення.";

/// Shortest doctor reply accepted, in characters after trimming.
pub const MIN_REPLY_CHARS: usize = 5;

/// Page size of the unfiltered request listing.
pub const REQUEST_LIST_LIMIT: usize = 100;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentStatus {
    Pending,
    Accepted,
    Rejected,
    Done,
}

impl AppointmentStatus {
    pub const ALL: [AppointmentStatus; 4] = [
        AppointmentStatus::Pending,
        AppointmentStatus::Accepted,
        AppointmentStatus::Rejected,
        AppointmentStatus::Done,
    ];
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Pending => write!(f, "PENDING"),
            AppointmentStatus::Accepted => write!(f, "ACCEPTED"),
            AppointmentStatus::Rejected => write!(f, "REJECTED"),
            AppointmentStatus::Done => write!(f, "DONE"),
        }
    }
}

impl FromStr for AppointmentStatus {
    type Err = AppointmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AppointmentStatus::ALL
            .into_iter()
            .find(|status| status.to_string() == s)
            .ok_or(AppointmentError::InvalidStatus)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppointmentRequest {
    pub id: String,
    pub doctor_id: String,
    pub patient_case_id: String,
    pub patient_user_id: Option<String>,
    pub patient_email: String,
    pub message: String,
    pub status: AppointmentStatus,
    pub doctor_reply: Option<String>,
    pub doctor_reply_created_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RequestDoctor {
    pub id: String,
    pub slug: String,
    pub full_name: String,
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RequestCase {
    pub id: String,
    pub age: Option<i32>,
    pub sex: Option<String>,
    pub suspected_organ: Option<String>,
    pub suspicion_level: Option<String>,
}

/// Request row with its doctor and patient case embedded by PostgREST.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppointmentRequestDetail {
    #[serde(flatten)]
    pub request: AppointmentRequest,
    pub doctor: Option<RequestDoctor>,
    pub patient_case: Option<RequestCase>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestListQuery {
    #[serde(rename = "doctorId", alias = "doctor_id")]
    pub doctor_id: Option<String>,
    #[serde(rename = "caseId", alias = "case_id")]
    pub case_id: Option<String>,
}

/// Body of `POST /appointment-requests`. Both case id spellings are accepted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateAppointmentRequestBody {
    #[serde(default, alias = "doctorId")]
    pub doctor_id: Option<String>,
    #[serde(default, alias = "patientCaseId")]
    pub patient_case_id: Option<String>,
    #[serde(default, alias = "caseId")]
    pub case_id: Option<String>,
    #[serde(default, alias = "patientEmail")]
    pub patient_email: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

impl CreateAppointmentRequestBody {
    /// Resolves the case id, the contact email (body first, then the session)
    /// and the message text.
    pub fn resolve(self, session_email: Option<&str>) -> Result<NewAppointmentRequest, AppointmentError> {
        let doctor_id = non_empty(self.doctor_id).ok_or(AppointmentError::MissingDoctor)?;

        let patient_case_id = non_empty(self.patient_case_id)
            .or_else(|| non_empty(self.case_id))
            .ok_or(AppointmentError::MissingCase)?;

        let patient_email = non_empty(self.patient_email)
            .or_else(|| session_email.filter(|e| !e.is_empty()).map(String::from))
            .ok_or(AppointmentError::MissingEmail)?;

        let message = self
            .message
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| DEFAULT_REQUEST_MESSAGE.to_string());

        Ok(NewAppointmentRequest {
            doctor_id,
            patient_case_id,
            patient_email,
            message,
        })
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NewAppointmentRequest {
    pub doctor_id: String,
    pub patient_case_id: String,
    pub patient_email: String,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReplyRequest {
    #[serde(default, alias = "doctorReply")]
    pub doctor_reply: Option<String>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AppointmentError {
    #[error("Appointment request not found")]
    NotFound,

    #[error("Not allowed to manage this appointment request")]
    Forbidden,

    #[error("doctor_id is required")]
    MissingDoctor,

    #[error("patient_case_id or case_id is required")]
    MissingCase,

    #[error("Patient email is required when not signed in")]
    MissingEmail,

    #[error("status is required and must be one of PENDING, ACCEPTED, REJECTED, DONE")]
    InvalidStatus,

    #[error("Doctor reply must contain at least 5 characters")]
    ReplyTooShort,

    #[error("Only doctors can open an inbox")]
    NoInbox,

    #[error("No doctor profile is linked to this user")]
    ProfileNotLinked,

    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("Patient case not found")]
    CaseNotFound,

    #[error("Database error: {0}")]
    Database(String),
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::NotFound
            | AppointmentError::ProfileNotLinked
            | AppointmentError::DoctorNotFound
            | AppointmentError::CaseNotFound => AppError::NotFound(err.to_string()),
            AppointmentError::Forbidden | AppointmentError::NoInbox => AppError::Forbidden(err.to_string()),
            AppointmentError::Database(msg) => AppError::Database(msg),
            _ => AppError::BadRequest(err.to_string()),
        }
    }
}
