use std::collections::{BTreeSet, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use shared_models::error::AppError;

/// Raw questionnaire answers keyed by item id. Values are scalars or lists.
pub type Answers = HashMap<String, Value>;

/// Canonical specialty tags derived from one questionnaire submission.
pub type DerivedTagSet = BTreeSet<String>;

// ==============================================================================
// QUESTIONNAIRE
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    Select,
    Multiselect,
    Radio,
    Checkbox,
    Text,
    Number,
}

impl InputKind {
    pub fn is_multi(&self) -> bool {
        matches!(self, InputKind::Multiselect | InputKind::Checkbox)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuestionOption {
    pub value: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// Item is shown only when the answer to `id` is one of `values`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShowIf {
    pub id: String,
    #[serde(rename = "in")]
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuestionnaireItem {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: InputKind,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<QuestionOption>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_if: Option<ShowIf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl QuestionnaireItem {
    pub fn option(&self, value: &str) -> Option<&QuestionOption> {
        self.options.as_ref()?.iter().find(|option| option.value == value)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Questionnaire {
    pub version: u32,
    pub items: Vec<QuestionnaireItem>,
}

// ==============================================================================
// PATIENT SIGNAL
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SuspicionLevel {
    Low,
    Medium,
    High,
}

impl SuspicionLevel {
    /// Lenient parse of the free-text column; unknown values yield `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "low" => Some(SuspicionLevel::Low),
            "medium" => Some(SuspicionLevel::Medium),
            "high" => Some(SuspicionLevel::High),
            _ => None,
        }
    }
}

impl fmt::Display for SuspicionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SuspicionLevel::Low => write!(f, "low"),
            SuspicionLevel::Medium => write!(f, "medium"),
            SuspicionLevel::High => write!(f, "high"),
        }
    }
}

/// Free-text signal read from a stored patient case.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OrganSignal {
    pub suspected_organ: Option<String>,
    pub suspicion_level: Option<SuspicionLevel>,
}

/// What is known about the patient when ranking doctors.
#[derive(Debug, Clone, PartialEq)]
pub enum CaseSignal {
    Tags(DerivedTagSet),
    Organ(OrganSignal),
}

// ==============================================================================
// ORGAN FILTER
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum OrganCategory {
    Breast,
    Prostate,
    Lung,
    Skin,
}

impl OrganCategory {
    pub const ALL: [OrganCategory; 4] = [
        OrganCategory::Breast,
        OrganCategory::Prostate,
        OrganCategory::Lung,
        OrganCategory::Skin,
    ];

    /// `None` for "all", an empty key or an unknown key: no filtering.
    pub fn from_key(key: &str) -> Option<Self> {
        match key.trim().to_lowercase().as_str() {
            "breast" => Some(OrganCategory::Breast),
            "prostate" => Some(OrganCategory::Prostate),
            "lung" => Some(OrganCategory::Lung),
            "skin" => Some(OrganCategory::Skin),
            _ => None,
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            OrganCategory::Breast => "breast",
            OrganCategory::Prostate => "prostate",
            OrganCategory::Lung => "lung",
            OrganCategory::Skin => "skin",
        }
    }
}

impl fmt::Display for OrganCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrganFilterOption {
    pub category: OrganCategory,
    pub label: String,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrganFilterTable {
    pub all_label: String,
    pub options: Vec<OrganFilterOption>,
}

/// One entry of the filter bar, including the "all" entry (`value: None`).
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OrganFilterChoice {
    pub label: String,
    pub value: Option<OrganCategory>,
    pub is_active: bool,
}

// ==============================================================================
// SCORING
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeywordBonuses {
    pub organ_match: u32,
    pub high_suspicion_telepathology: u32,
}

impl Default for KeywordBonuses {
    fn default() -> Self {
        Self {
            organ_match: 10,
            high_suspicion_telepathology: 3,
        }
    }
}

impl KeywordBonuses {
    pub fn max_score(&self) -> u32 {
        self.organ_match + self.high_suspicion_telepathology
    }
}

/// Fields of a doctor profile the scorers read.
pub trait DoctorProfile {
    fn full_name(&self) -> &str;
    fn specialization(&self) -> &str;
    fn sub_specialization(&self) -> Option<&str>;
    fn description(&self) -> Option<&str>;
    fn specialty_tags(&self) -> &[String];
    fn is_telepathology_available(&self) -> bool;

    /// Lower-cased `specialization sub_specialization description`.
    fn searchable_text(&self) -> String {
        format!(
            "{} {} {}",
            self.specialization(),
            self.sub_specialization().unwrap_or_default(),
            self.description().unwrap_or_default()
        )
        .to_lowercase()
    }
}

impl<T: DoctorProfile + ?Sized> DoctorProfile for &T {
    fn full_name(&self) -> &str {
        (**self).full_name()
    }

    fn specialization(&self) -> &str {
        (**self).specialization()
    }

    fn sub_specialization(&self) -> Option<&str> {
        (**self).sub_specialization()
    }

    fn description(&self) -> Option<&str> {
        (**self).description()
    }

    fn specialty_tags(&self) -> &[String] {
        (**self).specialty_tags()
    }

    fn is_telepathology_available(&self) -> bool {
        (**self).is_telepathology_available()
    }
}

/// Score produced by one of the two strategies. The scales differ and are
/// only brought to `[0, 1]` by [`RelevanceScore::normalized`].
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
#[serde(tag = "strategy", content = "value", rename_all = "snake_case")]
pub enum RelevanceScore {
    /// Jaccard overlap in `[0, 1]`.
    TagOverlap(f64),
    /// Sum of keyword bonuses, unbounded.
    Keyword(u32),
}

impl RelevanceScore {
    pub fn is_match(&self) -> bool {
        match self {
            RelevanceScore::TagOverlap(value) => *value > 0.0,
            RelevanceScore::Keyword(points) => *points > 0,
        }
    }

    pub fn normalized(&self, bonuses: &KeywordBonuses) -> f64 {
        match self {
            RelevanceScore::TagOverlap(value) => *value,
            RelevanceScore::Keyword(points) => {
                let max = bonuses.max_score();
                if max == 0 {
                    0.0
                } else {
                    (f64::from(*points) / f64::from(max)).min(1.0)
                }
            }
        }
    }
}

impl From<f64> for RelevanceScore {
    fn from(value: f64) -> Self {
        RelevanceScore::TagOverlap(value)
    }
}

impl From<u32> for RelevanceScore {
    fn from(points: u32) -> Self {
        RelevanceScore::Keyword(points)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredDoctor<D, S> {
    pub doctor: D,
    pub score: S,
}

/// Ranked entry handed to the response layer.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RankedDoctor<D> {
    pub doctor: D,
    pub score: RelevanceScore,
    pub normalized_score: f64,
    pub is_recommended: bool,
}

// ==============================================================================
// REQUESTS / ERRORS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeriveTagsRequest {
    #[serde(default)]
    pub answers: Answers,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeriveTagsResponse {
    pub tags: DerivedTagSet,
    pub questionnaire_version: u32,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MatchingError {
    #[error("Invalid questionnaire answers: {}", .0.join("; "))]
    InvalidAnswers(Vec<String>),
}

impl From<MatchingError> for AppError {
    fn from(err: MatchingError) -> Self {
        AppError::ValidationError(err.to_string())
    }
}
