use anyhow::Result;
use reqwest::Method;
use tracing::{debug, info};

use matching_cell::models::{Answers, CaseSignal, OrganCategory, OrganSignal};
use matching_cell::MatchingService;
use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    CaseSummary, Doctor, DoctorListing, DoctorSearchFilters, ListingCase, ListingQuery,
    MatchDoctorsResponse,
};
use crate::services::doctor::DoctorService;

/// Builds ranked doctor listings for the directory page and the
/// questionnaire flow.
pub struct DoctorListingService {
    doctors: DoctorService,
    supabase: SupabaseClient,
    matching: MatchingService,
}

impl DoctorListingService {
    pub fn new(config: &AppConfig, matching: MatchingService) -> Self {
        Self {
            doctors: DoctorService::new(config),
            supabase: SupabaseClient::service(config),
            matching,
        }
    }

    pub async fn fetch_case(&self, case_id: &str) -> Result<Option<ListingCase>> {
        let path = format!(
            "/rest/v1/patient_cases?id=eq.{}&select=id,suspected_organ,suspicion_level&limit=1",
            urlencoding::encode(case_id)
        );
        let cases: Vec<ListingCase> = self.supabase.request(Method::GET, &path, None, None).await?;
        Ok(cases.into_iter().next())
    }

    /// Directory listing, optionally scored against a stored case and
    /// narrowed to one organ category. An unknown case id lists without scoring.
    pub async fn listing(&self, query: &ListingQuery) -> Result<DoctorListing> {
        let case = match query.case_id.as_deref().filter(|id| !id.is_empty()) {
            Some(case_id) => {
                let case = self.fetch_case(case_id).await?;
                if case.is_none() {
                    debug!("Case {} not found, listing without case signal", case_id);
                }
                case
            }
            None => None,
        };

        let organ = query.organ.as_deref().and_then(OrganCategory::from_key);
        let doctors = self.doctors.list_doctors(&DoctorSearchFilters::default()).await?;

        let listing = assemble_listing(&self.matching, doctors, case.as_ref(), organ);
        info!(
            "Doctor listing built: {} doctors, {} recommended, organ filter {:?}",
            listing.doctors.len(),
            listing.doctors.iter().filter(|d| d.is_recommended).count(),
            organ
        );

        Ok(listing)
    }

    /// Ranks every doctor by tag overlap with the questionnaire answers.
    pub async fn match_answers(&self, answers: &Answers) -> Result<MatchDoctorsResponse> {
        let tags = self.matching.derive_tags(answers);
        let doctors = self.doctors.list_doctors(&DoctorSearchFilters::default()).await?;

        let ranked = self.matching.rank_by_tags(doctors, &tags, None);
        Ok(MatchDoctorsResponse { tags, doctors: ranked })
    }
}

/// Filter, score and rank `doctors` for a listing page.
pub fn assemble_listing(
    matching: &MatchingService,
    doctors: Vec<Doctor>,
    case: Option<&ListingCase>,
    organ: Option<OrganCategory>,
) -> DoctorListing {
    let signal = case
        .map(|case| OrganSignal {
            suspected_organ: case.suspected_organ.clone(),
            suspicion_level: case.suspicion(),
        })
        .unwrap_or_default();

    let ranked = matching.recommend(doctors, &CaseSignal::Organ(signal), organ);
    let markers = ranked.iter().filter_map(|entry| entry.doctor.map_marker()).collect();

    DoctorListing {
        case: case.map(CaseSummary::from),
        selected_organ: organ,
        organ_filters: matching.catalog().organ_filter_choices(organ),
        doctors: ranked,
        markers,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use matching_cell::{MatchingCatalog, RelevanceScore};
    use serde_json::json;

    fn matching() -> MatchingService {
        MatchingService::new(Arc::new(MatchingCatalog::embedded().unwrap()))
    }

    fn doctor(id: &str, full_name: &str, description: &str, telepathology: bool) -> Doctor {
        let lat = if id == "d3" { None } else { Some(50.4) };
        serde_json::from_value(json!({
            "id": id,
            "user_id": null,
            "slug": id,
            "full_name": full_name,
            "email": null,
            "phone": null,
            "clinic_name": null,
            "city": "Київ",
            "region": null,
            "specialization": "патоморфолог",
            "sub_specialization": null,
            "description": description,
            "years_of_experience": null,
            "avatar_url": null,
            "is_telepathology_available": telepathology,
            "lat": lat,
            "lng": 30.5,
            "created_at": null,
            "updated_at": null
        }))
        .unwrap()
    }

    fn directory() -> Vec<Doctor> {
        vec![
            doctor("d1", "д-р Олександр Петренко", "Діагностика раку легень", true),
            doctor("d2", "д-р Ірина Коваленко", "рак молочної залози", false),
            doctor("d3", "д-р Андрій Бойко", "пухлини шкіри", true),
        ]
    }

    #[test]
    fn test_listing_without_case_is_alphabetical() {
        let listing = assemble_listing(&matching(), directory(), None, None);

        let names: Vec<_> = listing.doctors.iter().map(|d| d.doctor.full_name.as_str()).collect();
        assert_eq!(names, vec!["д-р Андрій Бойко", "д-р Ірина Коваленко", "д-р Олександр Петренко"]);
        assert!(listing.doctors.iter().all(|d| !d.is_recommended));
        assert!(listing.case.is_none());
        assert!(listing.organ_filters[0].is_active);
        assert_eq!(listing.markers.len(), 2);
    }

    #[test]
    fn test_listing_scores_against_case() {
        let case = ListingCase {
            id: "case-000abc123".to_string(),
            suspected_organ: Some("Легень".to_string()),
            suspicion_level: Some("high".to_string()),
        };

        let listing = assemble_listing(&matching(), directory(), Some(&case), None);

        assert_eq!(listing.doctors[0].doctor.id, "d1");
        assert_eq!(listing.doctors[0].score, RelevanceScore::Keyword(13));
        assert!(listing.doctors[0].is_recommended);
        assert_eq!(listing.doctors[1].doctor.id, "d3");
        assert_eq!(listing.doctors[1].score, RelevanceScore::Keyword(3));
        assert_eq!(listing.doctors[2].score, RelevanceScore::Keyword(0));
        assert!(!listing.doctors[2].is_recommended);

        assert_eq!(listing.case.unwrap().short_id, "ABC123");
    }

    #[test]
    fn test_organ_filter_limits_doctors_and_markers() {
        let listing = assemble_listing(&matching(), directory(), None, Some(OrganCategory::Breast));

        assert_eq!(listing.doctors.len(), 1);
        assert_eq!(listing.doctors[0].doctor.id, "d2");
        assert_eq!(listing.markers.len(), 1);
        assert_eq!(listing.selected_organ, Some(OrganCategory::Breast));

        let active: Vec<_> = listing.organ_filters.iter().filter(|c| c.is_active).collect();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].value, Some(OrganCategory::Breast));
    }
}
