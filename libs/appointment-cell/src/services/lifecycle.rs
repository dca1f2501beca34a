use chrono::{DateTime, Utc};
use tracing::debug;

use shared_models::auth::{User, UserRole};

use crate::models::{
    AppointmentError, AppointmentRequestDetail, AppointmentStatus, MIN_REPLY_CHARS,
};

/// Rules for moving an appointment request through its lifecycle. Any of the
/// four statuses may be set directly; there is no transition graph.
pub struct AppointmentLifecycleService;

impl AppointmentLifecycleService {
    pub fn parse_status(raw: Option<&str>) -> Result<AppointmentStatus, AppointmentError> {
        raw.ok_or(AppointmentError::InvalidStatus)?.parse()
    }

    /// Trimmed reply text, rejected when shorter than [`MIN_REPLY_CHARS`].
    pub fn validate_reply(raw: Option<&str>) -> Result<String, AppointmentError> {
        let reply = raw.map(str::trim).unwrap_or_default();
        if reply.chars().count() < MIN_REPLY_CHARS {
            return Err(AppointmentError::ReplyTooShort);
        }
        Ok(reply.to_string())
    }

    /// ADMIN manages every request; a DOCTOR only requests addressed to the
    /// doctor profile linked to their account.
    pub fn can_manage(user: &User, request: &AppointmentRequestDetail) -> bool {
        match user.user_role() {
            UserRole::Admin => true,
            UserRole::Doctor => request
                .doctor
                .as_ref()
                .and_then(|doctor| doctor.user_id.as_deref())
                .is_some_and(|owner| owner == user.id),
            UserRole::Patient => false,
        }
    }

    pub fn authorize(user: &User, request: &AppointmentRequestDetail) -> Result<(), AppointmentError> {
        if Self::can_manage(user, request) {
            Ok(())
        } else {
            debug!("User {} ({}) may not manage request {}", user.id, user.user_role(), request.request.id);
            Err(AppointmentError::Forbidden)
        }
    }

    pub fn reply_timestamp() -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn user(id: &str, role: &str) -> User {
        User {
            id: id.to_string(),
            email: Some(format!("{}@example.com", id)),
            role: Some(role.to_string()),
            metadata: None,
            created_at: None,
        }
    }

    fn request(doctor_user_id: Option<&str>) -> AppointmentRequestDetail {
        serde_json::from_value(json!({
            "id": "req-1",
            "doctor_id": "d1",
            "patient_case_id": "c1",
            "patient_user_id": null,
            "patient_email": "p@example.com",
            "message": "Прошу консультацію",
            "status": "PENDING",
            "doctor_reply": null,
            "doctor_reply_created_at": null,
            "created_at": "2024-05-01T10:00:00Z",
            "updated_at": null,
            "doctor": { "id": "d1", "slug": "d1", "full_name": "д-р Ірина", "user_id": doctor_user_id },
            "patient_case": null
        }))
        .unwrap()
    }

    #[test]
    fn test_status_is_required() {
        assert_matches!(AppointmentLifecycleService::parse_status(None), Err(AppointmentError::InvalidStatus));
        assert_eq!(
            AppointmentLifecycleService::parse_status(Some("REJECTED")).unwrap(),
            AppointmentStatus::Rejected
        );
    }

    #[test]
    fn test_reply_is_trimmed_and_counted_in_characters() {
        assert_eq!(AppointmentLifecycleService::validate_reply(Some("  Добре  ")).unwrap(), "Добре");
        assert_matches!(
            AppointmentLifecycleService::validate_reply(Some("  так  ")),
            Err(AppointmentError::ReplyTooShort)
        );
        assert_matches!(AppointmentLifecycleService::validate_reply(None), Err(AppointmentError::ReplyTooShort));
    }

    #[test]
    fn test_only_admin_or_owning_doctor_may_manage() {
        let owned = request(Some("doc-user"));

        assert!(AppointmentLifecycleService::can_manage(&user("admin", "ADMIN"), &owned));
        assert!(AppointmentLifecycleService::can_manage(&user("doc-user", "DOCTOR"), &owned));
        assert!(!AppointmentLifecycleService::can_manage(&user("other", "DOCTOR"), &owned));
        assert!(!AppointmentLifecycleService::can_manage(&user("doc-user", "PATIENT"), &owned));
        assert!(!AppointmentLifecycleService::can_manage(&user("doc-user", "DOCTOR"), &request(None)));
    }
}
