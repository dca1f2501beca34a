use anyhow::Result;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::Utc;
use rand::{distributions::Alphanumeric, Rng};
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Method,
};
use serde_json::{json, Value};
use tracing::{debug, error, info};

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{Attachment, AttachmentSummary, PatientCaseError, UploadAttachmentRequest};

const DEFAULT_ATTACHMENT_TYPE: &str = "other";
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Payload decoded from a base64 string or a `data:` URL.
#[derive(Debug, PartialEq)]
pub struct DecodedFile {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

pub fn decode_file_data(file_data: &str) -> Result<DecodedFile, PatientCaseError> {
    let trimmed = file_data.trim();

    let (content_type, encoded) = match trimmed.strip_prefix("data:") {
        Some(rest) => {
            let (header, payload) = rest
                .split_once(',')
                .ok_or_else(|| PatientCaseError::InvalidFile("malformed data URL".to_string()))?;
            let mime = header.strip_suffix(";base64").ok_or_else(|| {
                PatientCaseError::InvalidFile("data URL must be base64 encoded".to_string())
            })?;
            (Some(mime.to_string()).filter(|m| !m.is_empty()), payload)
        }
        None => (None, trimmed),
    };

    let bytes = BASE64
        .decode(encoded)
        .map_err(|e| PatientCaseError::InvalidFile(format!("file_data is not valid base64: {}", e)))?;

    if bytes.is_empty() {
        return Err(PatientCaseError::InvalidFile("file is empty".to_string()));
    }

    Ok(DecodedFile { bytes, content_type })
}

/// `{case_id}/{millis}-{suffix}.{ext}`; the extension is lower-cased and
/// left out when the filename has none.
pub fn object_key(case_id: &str, filename: &str, millis: i64, suffix: &str) -> String {
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .filter(|ext| !ext.is_empty());

    match extension {
        Some(ext) => format!("{}/{}-{}.{}", case_id, millis, suffix, ext),
        None => format!("{}/{}-{}", case_id, millis, suffix),
    }
}

fn random_suffix() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(10)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect()
}

pub struct AttachmentService {
    supabase: SupabaseClient,
    bucket: String,
}

impl AttachmentService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::service(config),
            bucket: config.patient_files_bucket.clone(),
        }
    }

    async fn case_exists(&self, case_id: &str) -> Result<bool> {
        let path = format!("/rest/v1/patient_cases?id=eq.{}&select=id&limit=1", urlencoding::encode(case_id));
        let rows: Vec<Value> = self.supabase.request(Method::GET, &path, None, None).await?;
        Ok(!rows.is_empty())
    }

    /// Stores the file in the patient files bucket and records it on the case.
    pub async fn upload(
        &self,
        case_id: &str,
        request: UploadAttachmentRequest,
    ) -> Result<AttachmentSummary, PatientCaseError> {
        let filename = request.filename.trim().to_string();
        if filename.is_empty() {
            return Err(PatientCaseError::InvalidFile("filename is required".to_string()));
        }

        let exists = self.case_exists(case_id).await
            .map_err(|e| PatientCaseError::Database(e.to_string()))?;
        if !exists {
            return Err(PatientCaseError::NotFound);
        }

        let decoded = decode_file_data(&request.file_data)?;
        let content_type = request.content_type
            .filter(|ct| !ct.trim().is_empty())
            .or(decoded.content_type);
        let size = decoded.bytes.len();

        let key = object_key(case_id, &filename, Utc::now().timestamp_millis(), &random_suffix());
        debug!("Uploading attachment '{}' ({} bytes) as {}", filename, size, key);

        self.supabase
            .upload_object(
                &self.bucket,
                &key,
                decoded.bytes,
                content_type.as_deref().unwrap_or(DEFAULT_CONTENT_TYPE),
            )
            .await
            .map_err(|e| {
                error!("Attachment upload to bucket '{}' failed: {}", self.bucket, e);
                PatientCaseError::Storage(e.to_string())
            })?;

        let attachment_data = json!({
            "patient_case_id": case_id,
            "type": request.kind.filter(|k| !k.is_empty()).unwrap_or_else(|| DEFAULT_ATTACHMENT_TYPE.to_string()),
            "url": self.supabase.public_object_url(&self.bucket, &key),
            "filename": filename,
            "size": size,
            "content_type": content_type,
        });

        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));

        let created: Vec<Attachment> = self.supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/attachments",
                None,
                Some(attachment_data),
                Some(headers),
            )
            .await
            .map_err(|e| PatientCaseError::Database(e.to_string()))?;

        let attachment = created.into_iter().next()
            .ok_or_else(|| PatientCaseError::Database("attachment insert returned no rows".to_string()))?;

        info!("Attachment {} stored for case {}", attachment.id, case_id);
        Ok(attachment.into())
    }

    pub async fn list(&self, case_id: &str) -> Result<Vec<AttachmentSummary>> {
        let path = format!(
            "/rest/v1/attachments?patient_case_id=eq.{}&select=*&order=created_at.desc",
            urlencoding::encode(case_id)
        );
        let attachments: Vec<Attachment> = self.supabase.request(Method::GET, &path, None, None).await?;
        Ok(attachments.into_iter().map(AttachmentSummary::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_decodes_plain_base64() {
        let decoded = decode_file_data("aGVsbG8=").unwrap();
        assert_eq!(decoded.bytes, b"hello");
        assert_eq!(decoded.content_type, None);
    }

    #[test]
    fn test_decodes_data_url() {
        let decoded = decode_file_data("data:application/pdf;base64,JVBERi0=").unwrap();
        assert_eq!(decoded.bytes, b"%PDF-");
        assert_eq!(decoded.content_type.as_deref(), Some("application/pdf"));
    }

    #[test]
    fn test_rejects_bad_payloads() {
        assert_matches!(decode_file_data("not base64!"), Err(PatientCaseError::InvalidFile(_)));
        assert_matches!(decode_file_data(""), Err(PatientCaseError::InvalidFile(_)));
        assert_matches!(decode_file_data("data:text/plain,hello"), Err(PatientCaseError::InvalidFile(_)));
    }

    #[test]
    fn test_object_key_layout() {
        assert_eq!(
            object_key("case-1", "Scan.PNG", 1700000000000, "k3j9x0abcd"),
            "case-1/1700000000000-k3j9x0abcd.png"
        );
        assert_eq!(object_key("case-1", "report", 5, "abc"), "case-1/5-abc");
        assert_eq!(object_key("case-1", "archive.tar.gz", 5, "abc"), "case-1/5-abc.gz");
    }

    #[test]
    fn test_random_suffix_is_lowercase_alphanumeric() {
        let suffix = random_suffix();
        assert_eq!(suffix.len(), 10);
        assert!(suffix.chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
    }
}
