use crate::models::{DoctorProfile, OrganFilterOption};

/// Whether the doctor's free-text fields contain at least one keyword root.
pub fn matches_organ_filter<D: DoctorProfile + ?Sized>(doctor: &D, filter: &OrganFilterOption) -> bool {
    let haystack = doctor.searchable_text();
    filter
        .keywords
        .iter()
        .any(|keyword| haystack.contains(keyword.as_str()))
}

/// Drops doctors that fail the organ filter. `None` keeps everyone.
pub fn filter_by_organ<D: DoctorProfile>(doctors: Vec<D>, filter: Option<&OrganFilterOption>) -> Vec<D> {
    match filter {
        Some(filter) if !filter.keywords.is_empty() => doctors
            .into_iter()
            .filter(|doctor| matches_organ_filter(doctor, filter))
            .collect(),
        _ => doctors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OrganCategory;
    use crate::services::scoring::tests::TestDoctor;

    fn breast_filter() -> OrganFilterOption {
        OrganFilterOption {
            category: OrganCategory::Breast,
            label: "Молочна залоза".to_string(),
            keywords: vec!["молочн".to_string(), "груд".to_string(), "breast".to_string()],
        }
    }

    #[test]
    fn test_breast_root_in_description_passes() {
        let doctor = TestDoctor::named("д-р Ірина Коваленко")
            .with_description("Патоморфолог із фокусом на ранню діагностику раку молочної залози");

        assert!(matches_organ_filter(&doctor, &breast_filter()));
    }

    #[test]
    fn test_match_is_case_insensitive() {
        let mut doctor = TestDoctor::named("Dr. Smith");
        doctor.sub_specialization = Some("BREAST pathology".to_string());

        assert!(matches_organ_filter(&doctor, &breast_filter()));
    }

    #[test]
    fn test_doctors_without_roots_are_excluded() {
        let kovalenko = TestDoctor::named("Коваленко").with_description("рак молочної залози");
        let petrenko = TestDoctor::named("Петренко").with_description("легені, лімфоми");

        let filter = breast_filter();
        let kept = filter_by_organ(vec![kovalenko.clone(), petrenko], Some(&filter));

        assert_eq!(kept, vec![kovalenko]);
    }

    #[test]
    fn test_no_filter_keeps_everyone() {
        let doctors = vec![TestDoctor::named("A"), TestDoctor::named("B")];
        assert_eq!(filter_by_organ(doctors.clone(), None), doctors);
    }
}
