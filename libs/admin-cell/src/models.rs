use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shared_models::error::AppError;

/// Number of rows shown in each "recent" list of the overview.
pub const RECENT_LIMIT: usize = 5;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct OverviewCounts {
    pub doctors: u64,
    pub patient_cases: u64,
    pub appointment_requests: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecentDoctor {
    pub id: String,
    pub slug: String,
    pub full_name: String,
    pub city: Option<String>,
    pub specialization: String,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IdRef {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecentCase {
    pub id: String,
    pub age: i32,
    pub sex: String,
    pub suspected_organ: String,
    pub suspicion_level: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing)]
    pub appointment_requests: Vec<IdRef>,
    #[serde(default)]
    pub request_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecentRequestDoctor {
    pub id: String,
    pub full_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecentRequestCase {
    pub id: String,
    pub suspected_organ: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecentRequest {
    pub id: String,
    pub status: String,
    pub patient_email: String,
    pub created_at: DateTime<Utc>,
    pub doctor: Option<RecentRequestDoctor>,
    pub patient_case: Option<RecentRequestCase>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AdminOverview {
    pub counts: OverviewCounts,
    pub recent_doctors: Vec<RecentDoctor>,
    pub recent_cases: Vec<RecentCase>,
    pub recent_requests: Vec<RecentRequest>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AdminError {
    #[error("Administrator role required")]
    NotAdmin,

    #[error("Overview unavailable: {0}")]
    Upstream(String),
}

impl From<AdminError> for AppError {
    fn from(err: AdminError) -> Self {
        match err {
            AdminError::NotAdmin => AppError::Forbidden(err.to_string()),
            AdminError::Upstream(msg) => AppError::Database(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_case_embeds_are_hidden_behind_count() {
        let mut case: RecentCase = serde_json::from_value(json!({
            "id": "c1",
            "age": 61,
            "sex": "male",
            "suspected_organ": "легені",
            "suspicion_level": "high",
            "created_at": "2024-03-01T08:00:00Z",
            "appointment_requests": [{ "id": "r1" }, { "id": "r2" }]
        }))
        .unwrap();
        case.request_count = case.appointment_requests.len();

        let value = serde_json::to_value(&case).unwrap();
        assert_eq!(value["request_count"], 2);
        assert!(value.get("appointment_requests").is_none());
    }
}
