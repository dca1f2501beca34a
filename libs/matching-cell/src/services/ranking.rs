use std::cmp::Ordering;

use crate::models::{DoctorProfile, ScoredDoctor};
use crate::services::collation::compare_uk;
use crate::services::scoring::DoctorRelevanceScorer;

/// Scores every doctor and sorts by descending score, ties by full name
/// under Ukrainian collation.
pub fn rank_doctors<D, S>(doctors: Vec<D>, scorer: &S) -> Vec<ScoredDoctor<D, S::Score>>
where
    D: DoctorProfile,
    S: DoctorRelevanceScorer,
{
    let mut scored: Vec<ScoredDoctor<D, S::Score>> = doctors
        .into_iter()
        .map(|doctor| {
            let score = scorer.score(&doctor);
            ScoredDoctor { doctor, score }
        })
        .collect();

    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| compare_uk(a.doctor.full_name(), b.doctor.full_name()))
    });

    scored
}
