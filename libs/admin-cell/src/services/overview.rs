use anyhow::Result;
use reqwest::Method;
use tracing::{info, instrument};

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    AdminOverview, OverviewCounts, RecentCase, RecentDoctor, RecentRequest, RECENT_LIMIT,
};

pub struct AdminOverviewService {
    supabase: SupabaseClient,
}

impl AdminOverviewService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::service(config),
        }
    }

    pub async fn counts(&self) -> Result<OverviewCounts> {
        let (doctors, patient_cases, appointment_requests) = tokio::try_join!(
            self.supabase.count("doctors", "", None),
            self.supabase.count("patient_cases", "", None),
            self.supabase.count("appointment_requests", "", None),
        )?;

        Ok(OverviewCounts {
            doctors,
            patient_cases,
            appointment_requests,
        })
    }

    async fn recent<T: serde::de::DeserializeOwned>(&self, table: &str, select: &str) -> Result<Vec<T>> {
        let path = format!(
            "/rest/v1/{}?select={}&order=created_at.desc&limit={}",
            table, select, RECENT_LIMIT
        );
        self.supabase.request(Method::GET, &path, None, None).await
    }

    #[instrument(skip(self))]
    pub async fn overview(&self) -> Result<AdminOverview> {
        let (counts, recent_doctors, recent_cases, recent_requests) = tokio::try_join!(
            self.counts(),
            self.recent::<RecentDoctor>("doctors", "id,slug,full_name,city,specialization,created_at"),
            self.recent::<RecentCase>(
                "patient_cases",
                "id,age,sex,suspected_organ,suspicion_level,created_at,appointment_requests(id)",
            ),
            self.recent::<RecentRequest>(
                "appointment_requests",
                "id,status,patient_email,created_at,doctor:doctors(id,full_name),patient_case:patient_cases(id,suspected_organ)",
            ),
        )?;

        let recent_cases = recent_cases
            .into_iter()
            .map(|mut case| {
                case.request_count = case.appointment_requests.len();
                case
            })
            .collect();

        info!(
            "Admin overview: {} doctors, {} cases, {} requests",
            counts.doctors, counts.patient_cases, counts.appointment_requests
        );

        Ok(AdminOverview {
            counts,
            recent_doctors,
            recent_cases,
            recent_requests,
        })
    }
}
