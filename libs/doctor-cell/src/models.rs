use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use matching_cell::models::{
    Answers, DerivedTagSet, DoctorProfile, OrganCategory, OrganFilterChoice, RankedDoctor,
    SuspicionLevel,
};
use shared_models::error::AppError;

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Doctor {
    pub id: String,
    pub user_id: Option<String>,
    pub slug: String,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub clinic_name: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub specialization: String,
    pub sub_specialization: Option<String>,
    pub description: Option<String>,
    pub years_of_experience: Option<i32>,
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub specialty_tags: Vec<String>,
    #[serde(default)]
    pub is_telepathology_available: bool,
    #[serde(default = "default_true")]
    pub is_accepting_new_patients: bool,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Doctor {
    /// Marker for the doctors map; doctors without both coordinates have none.
    pub fn map_marker(&self) -> Option<MapMarker> {
        let (lat, lng) = (self.lat?, self.lng?);
        Some(MapMarker {
            id: self.id.clone(),
            full_name: self.full_name.clone(),
            lat,
            lng,
            city: self.city.clone(),
            region: self.region.clone(),
            specialization: self.specialization.clone(),
        })
    }
}

impl DoctorProfile for Doctor {
    fn full_name(&self) -> &str {
        &self.full_name
    }

    fn specialization(&self) -> &str {
        &self.specialization
    }

    fn sub_specialization(&self) -> Option<&str> {
        self.sub_specialization.as_deref()
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn specialty_tags(&self) -> &[String] {
        &self.specialty_tags
    }

    fn is_telepathology_available(&self) -> bool {
        self.is_telepathology_available
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MapMarker {
    pub id: String,
    pub full_name: String,
    pub lat: f64,
    pub lng: f64,
    pub city: Option<String>,
    pub region: Option<String>,
    pub specialization: String,
}

/// Minimal profile returned to a signed-in doctor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DoctorIdentity {
    pub id: String,
    pub slug: String,
    pub full_name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DoctorSearchFilters {
    pub region: Option<String>,
    pub specialization: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListingQuery {
    #[serde(rename = "caseId", alias = "case_id")]
    pub case_id: Option<String>,
    pub organ: Option<String>,
}

/// Columns of a patient case the listing scores against.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListingCase {
    pub id: String,
    pub suspected_organ: Option<String>,
    pub suspicion_level: Option<String>,
}

impl ListingCase {
    /// Last six characters of the id, upper-cased, as shown to patients.
    pub fn short_id(&self) -> String {
        let chars: Vec<char> = self.id.chars().collect();
        let start = chars.len().saturating_sub(6);
        chars[start..].iter().collect::<String>().to_uppercase()
    }

    pub fn suspicion(&self) -> Option<SuspicionLevel> {
        self.suspicion_level.as_deref().and_then(SuspicionLevel::parse)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CaseSummary {
    pub id: String,
    pub short_id: String,
    pub suspected_organ: Option<String>,
    pub suspicion_level: Option<String>,
}

impl From<&ListingCase> for CaseSummary {
    fn from(case: &ListingCase) -> Self {
        Self {
            id: case.id.clone(),
            short_id: case.short_id(),
            suspected_organ: case.suspected_organ.clone(),
            suspicion_level: case.suspicion_level.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DoctorListing {
    pub case: Option<CaseSummary>,
    pub selected_organ: Option<OrganCategory>,
    pub organ_filters: Vec<OrganFilterChoice>,
    pub doctors: Vec<RankedDoctor<Doctor>>,
    pub markers: Vec<MapMarker>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MatchDoctorsRequest {
    #[serde(default)]
    pub answers: Answers,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MatchDoctorsResponse {
    pub tags: DerivedTagSet,
    pub doctors: Vec<RankedDoctor<Doctor>>,
}

#[derive(Debug)]
pub enum DoctorError {
    NotFound,
    NotADoctor,
    ProfileNotLinked,
    Upstream(String),
}

impl std::fmt::Display for DoctorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DoctorError::NotFound => write!(f, "Doctor not found"),
            DoctorError::NotADoctor => write!(f, "User is not a doctor"),
            DoctorError::ProfileNotLinked => write!(f, "No doctor profile is linked to this user"),
            DoctorError::Upstream(msg) => write!(f, "Doctor directory unavailable: {}", msg),
        }
    }
}

impl std::error::Error for DoctorError {}

impl From<DoctorError> for AppError {
    fn from(err: DoctorError) -> Self {
        match err {
            DoctorError::NotFound | DoctorError::ProfileNotLinked => AppError::NotFound(err.to_string()),
            DoctorError::NotADoctor => AppError::Forbidden(err.to_string()),
            DoctorError::Upstream(msg) => AppError::Database(msg),
        }
    }
}
