use std::collections::BTreeSet;

use crate::models::{
    DerivedTagSet, DoctorProfile, KeywordBonuses, OrganSignal, RelevanceScore, SuspicionLevel,
};

/// Assigns a relevance score to a candidate doctor for one patient.
///
/// Implementations keep their own score type so that scales are never mixed;
/// conversion into [`RelevanceScore`] happens at the response boundary.
pub trait DoctorRelevanceScorer {
    type Score: Copy + PartialOrd + Into<RelevanceScore>;

    fn score<D: DoctorProfile + ?Sized>(&self, doctor: &D) -> Self::Score;
}

/// Strategy A: `|doctor ∩ patient| / |doctor ∪ patient|` over specialty tags.
/// Always in `[0, 1]`; two empty sets score 0.
#[derive(Debug, Clone, Copy)]
pub struct TagOverlapScorer<'a> {
    patient_tags: &'a DerivedTagSet,
}

impl<'a> TagOverlapScorer<'a> {
    pub fn new(patient_tags: &'a DerivedTagSet) -> Self {
        Self { patient_tags }
    }
}

impl DoctorRelevanceScorer for TagOverlapScorer<'_> {
    type Score = f64;

    fn score<D: DoctorProfile + ?Sized>(&self, doctor: &D) -> f64 {
        let doctor_tags: BTreeSet<&str> = doctor
            .specialty_tags()
            .iter()
            .map(String::as_str)
            .collect();

        let intersection = doctor_tags
            .iter()
            .filter(|tag| self.patient_tags.contains(**tag))
            .count();
        let union = doctor_tags.len() + self.patient_tags.len() - intersection;

        if union == 0 {
            return 0.0;
        }

        intersection as f64 / union as f64
    }
}

/// Strategy B: fixed bonuses for free-text matches against the doctor's
/// specialization, sub-specialization and description.
#[derive(Debug, Clone)]
pub struct KeywordMatchScorer {
    needles: Vec<String>,
    suspicion_level: Option<SuspicionLevel>,
    bonuses: KeywordBonuses,
}

impl KeywordMatchScorer {
    pub fn new(signal: &OrganSignal, bonuses: KeywordBonuses) -> Self {
        let needles = signal
            .suspected_organ
            .as_deref()
            .map(|organ| organ.trim().to_lowercase())
            .filter(|organ| !organ.is_empty())
            .into_iter()
            .collect();

        Self {
            needles,
            suspicion_level: signal.suspicion_level,
            bonuses,
        }
    }

    /// Extra roots that also earn the organ bonus, e.g. the keyword roots of
    /// the selected organ filter.
    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for keyword in keywords {
            let keyword = keyword.as_ref().trim().to_lowercase();
            if !keyword.is_empty() && !self.needles.contains(&keyword) {
                self.needles.push(keyword);
            }
        }
        self
    }

    fn matches_organ(&self, haystack: &str) -> bool {
        self.needles.iter().any(|needle| haystack.contains(needle.as_str()))
    }
}

impl DoctorRelevanceScorer for KeywordMatchScorer {
    type Score = u32;

    fn score<D: DoctorProfile + ?Sized>(&self, doctor: &D) -> u32 {
        let mut score = 0;

        if self.matches_organ(&doctor.searchable_text()) {
            score += self.bonuses.organ_match;
        }

        if self.suspicion_level == Some(SuspicionLevel::High) && doctor.is_telepathology_available() {
            score += self.bonuses.high_suspicion_telepathology;
        }

        score
    }
}
