use anyhow::Result;
use reqwest::Method;
use tracing::debug;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{Doctor, DoctorIdentity, DoctorSearchFilters};

/// Read access to the doctor directory. Doctor profiles are public, so the
/// service-role client is used and no user token is forwarded.
pub struct DoctorService {
    supabase: SupabaseClient,
}

impl DoctorService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::service(config),
        }
    }

    /// All doctors matching the exact-value filters, ordered by full name.
    pub async fn list_doctors(&self, filters: &DoctorSearchFilters) -> Result<Vec<Doctor>> {
        let mut query_parts = vec!["select=*".to_string()];

        if let Some(region) = filters.region.as_deref().filter(|r| !r.is_empty()) {
            query_parts.push(format!("region=eq.{}", urlencoding::encode(region)));
        }
        if let Some(specialization) = filters.specialization.as_deref().filter(|s| !s.is_empty()) {
            query_parts.push(format!("specialization=eq.{}", urlencoding::encode(specialization)));
        }
        query_parts.push("order=full_name.asc".to_string());

        let path = format!("/rest/v1/doctors?{}", query_parts.join("&"));
        debug!("Listing doctors with filters {:?}", filters);

        let doctors: Vec<Doctor> = self.supabase.request(Method::GET, &path, None, None).await?;
        Ok(doctors)
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Doctor>> {
        debug!("Fetching doctor profile by slug: {}", slug);

        let path = format!("/rest/v1/doctors?slug=eq.{}&limit=1", urlencoding::encode(slug));
        let doctors: Vec<Doctor> = self.supabase.request(Method::GET, &path, None, None).await?;

        Ok(doctors.into_iter().next())
    }

    /// Profile linked to an authenticated user account, if any.
    pub async fn get_for_user(&self, user_id: &str) -> Result<Option<DoctorIdentity>> {
        debug!("Fetching doctor profile linked to user {}", user_id);

        let path = format!(
            "/rest/v1/doctors?user_id=eq.{}&select=id,slug,full_name&limit=1",
            urlencoding::encode(user_id)
        );
        let doctors: Vec<DoctorIdentity> = self.supabase.request(Method::GET, &path, None, None).await?;

        Ok(doctors.into_iter().next())
    }
}
