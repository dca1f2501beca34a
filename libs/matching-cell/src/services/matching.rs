use std::sync::Arc;

use tracing::debug;

use crate::catalog::MatchingCatalog;
use crate::models::{
    Answers, CaseSignal, DerivedTagSet, DoctorProfile, MatchingError, OrganCategory,
    OrganFilterOption, OrganSignal, RankedDoctor, RelevanceScore, ScoredDoctor,
};
use crate::services::filter::filter_by_organ;
use crate::services::ranking::rank_doctors;
use crate::services::scoring::{KeywordMatchScorer, TagOverlapScorer};
use crate::services::tags;

/// Entry point of the recommendation core. Holds only the shared catalog,
/// so it is cheap to clone into every request.
#[derive(Debug, Clone)]
pub struct MatchingService {
    catalog: Arc<MatchingCatalog>,
}

impl MatchingService {
    pub fn new(catalog: Arc<MatchingCatalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &MatchingCatalog {
        &self.catalog
    }

    pub fn derive_tags(&self, answers: &Answers) -> DerivedTagSet {
        let tags = tags::derive_tags(&self.catalog.questionnaire.items, answers);
        debug!("Derived {} tags from {} answers", tags.len(), answers.len());
        tags
    }

    pub fn validate_answers(&self, answers: &Answers) -> Result<(), MatchingError> {
        let issues = tags::validate_answers(&self.catalog.questionnaire.items, answers);
        if issues.is_empty() {
            Ok(())
        } else {
            Err(MatchingError::InvalidAnswers(issues))
        }
    }

    pub fn organ_filter(&self, category: Option<OrganCategory>) -> Option<&OrganFilterOption> {
        category.and_then(|category| self.catalog.organ_option(category))
    }

    /// Strategy A over the patient's derived tags.
    pub fn rank_by_tags<D: DoctorProfile>(
        &self,
        doctors: Vec<D>,
        tags: &DerivedTagSet,
        organ: Option<OrganCategory>,
    ) -> Vec<RankedDoctor<D>> {
        let candidates = filter_by_organ(doctors, self.organ_filter(organ));
        let scorer = TagOverlapScorer::new(tags);
        self.finish(rank_doctors(candidates, &scorer))
    }

    /// Strategy B over the free-text organ of a stored case. With an organ
    /// category selected, its keyword roots also count as a match.
    pub fn rank_by_organ<D: DoctorProfile>(
        &self,
        doctors: Vec<D>,
        signal: &OrganSignal,
        organ: Option<OrganCategory>,
    ) -> Vec<RankedDoctor<D>> {
        let filter = self.organ_filter(organ);
        let candidates = filter_by_organ(doctors, filter);

        let mut scorer = KeywordMatchScorer::new(signal, self.catalog.keyword_bonuses);
        if let Some(filter) = filter {
            scorer = scorer.with_keywords(&filter.keywords);
        }

        self.finish(rank_doctors(candidates, &scorer))
    }

    /// Picks the strategy from the data available for the case.
    pub fn recommend<D: DoctorProfile>(
        &self,
        doctors: Vec<D>,
        signal: &CaseSignal,
        organ: Option<OrganCategory>,
    ) -> Vec<RankedDoctor<D>> {
        match signal {
            CaseSignal::Tags(tags) => self.rank_by_tags(doctors, tags, organ),
            CaseSignal::Organ(organ_signal) => self.rank_by_organ(doctors, organ_signal, organ),
        }
    }

    fn finish<D, S>(&self, scored: Vec<ScoredDoctor<D, S>>) -> Vec<RankedDoctor<D>>
    where
        S: Copy + Into<RelevanceScore>,
    {
        let bonuses = self.catalog.keyword_bonuses;
        scored
            .into_iter()
            .map(|ScoredDoctor { doctor, score }| {
                let score: RelevanceScore = score.into();
                RankedDoctor {
                    doctor,
                    normalized_score: score.normalized(&bonuses),
                    is_recommended: score.is_match(),
                    score,
                }
            })
            .collect()
    }
}
