pub mod collation;
pub mod filter;
pub mod matching;
pub mod ranking;
pub mod scoring;
pub mod tags;

pub use matching::MatchingService;
pub use scoring::{DoctorRelevanceScorer, KeywordMatchScorer, TagOverlapScorer};
