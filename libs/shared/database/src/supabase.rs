use anyhow::{Result, anyhow};
use reqwest::{
    Client,
    header::{HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION},
    Method,
};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;
use tracing::{debug, error};

use shared_config::AppConfig;

/// Thin client over the PostgREST (`/rest/v1`) and Storage (`/storage/v1`) APIs.
pub struct SupabaseClient {
    client: Client,
    base_url: String,
    api_key: String,
}

/// Object written by [`SupabaseClient::upload_object`].
#[derive(Debug, Clone, Deserialize)]
pub struct StoredObject {
    #[serde(rename = "Key")]
    pub key: String,
}

impl SupabaseClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.supabase_url.trim_end_matches('/').to_string(),
            api_key: config.supabase_anon_key.clone(),
        }
    }

    /// Client authenticated with the service-role key. Server side only.
    pub fn service(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.supabase_url.trim_end_matches('/').to_string(),
            api_key: config.supabase_service_role_key.clone(),
        }
    }

    fn get_headers(&self, auth_token: Option<&str>) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();

        headers.insert("apikey", HeaderValue::from_str(&self.api_key)?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        // Without a user token the request runs under the client's own key.
        let bearer = auth_token.unwrap_or(&self.api_key);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", bearer))?,
        );

        Ok(headers)
    }

    pub async fn request<T>(&self, method: Method, path: &str,
                            auth_token: Option<&str>, body: Option<Value>)
                            -> Result<T>
    where T: DeserializeOwned {
        self.request_with_headers(method, path, auth_token, body, None).await
    }

    pub async fn request_with_headers<T>(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
        extra_headers: Option<HeaderMap>,
    ) -> Result<T>
    where T: DeserializeOwned {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making {} request to {}", method, url);

        let mut headers = self.get_headers(auth_token)?;
        if let Some(extra) = extra_headers {
            headers.extend(extra);
        }

        let mut req = self.client.request(method, &url)
            .headers(headers);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;
        let response = Self::check_status(response).await?;

        let data = response.json::<T>().await?;
        Ok(data)
    }

    /// Counts rows of `table` matching `filter` (PostgREST query string, may be empty)
    /// using the `Content-Range` header of an exact-count request.
    pub async fn count(&self, table: &str, filter: &str, auth_token: Option<&str>) -> Result<u64> {
        let mut path = format!("/rest/v1/{}?select=id&limit=1", table);
        if !filter.is_empty() {
            path.push('&');
            path.push_str(filter);
        }
        let url = format!("{}{}", self.base_url, path);
        debug!("Counting rows at {}", url);

        let mut headers = self.get_headers(auth_token)?;
        headers.insert("Prefer", HeaderValue::from_static("count=exact"));

        let response = self.client.get(&url).headers(headers).send().await?;
        let response = Self::check_status(response).await?;

        let range = response
            .headers()
            .get("content-range")
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| anyhow!("Missing Content-Range header in count response"))?;

        parse_content_range_total(range)
    }

    /// Uploads raw bytes into a storage bucket. Existing keys are never overwritten.
    pub async fn upload_object(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<StoredObject> {
        let url = format!(
            "{}/storage/v1/object/{}/{}",
            self.base_url,
            bucket,
            encode_object_key(key)
        );
        debug!("Uploading {} bytes to {}", data.len(), url);

        let mut headers = self.get_headers(None)?;
        headers.insert(CONTENT_TYPE, HeaderValue::from_str(content_type)?);
        headers.insert("x-upsert", HeaderValue::from_static("false"));

        let response = self.client
            .post(&url)
            .headers(headers)
            .body(data)
            .send()
            .await?;
        let response = Self::check_status(response).await?;

        let stored = response.json::<StoredObject>().await?;
        Ok(stored)
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let error_text = response.text().await?;
        error!("API error ({}): {}", status, error_text);

        Err(match status.as_u16() {
            401 | 403 => anyhow!("Authentication error: {}", error_text),
            404 => anyhow!("Resource not found: {}", error_text),
            _ => anyhow!("API error ({}): {}", status, error_text),
        })
    }

    pub fn get_base_url(&self) -> &str {
        &self.base_url
    }

    /// Public URL of an object stored in a public bucket.
    pub fn public_object_url(&self, bucket: &str, key: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url,
            bucket,
            encode_object_key(key)
        )
    }
}

fn encode_object_key(key: &str) -> String {
    key.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// `0-0/42` -> 42, `*/0` -> 0.
fn parse_content_range_total(range: &str) -> Result<u64> {
    let total = range
        .rsplit('/')
        .next()
        .ok_or_else(|| anyhow!("Malformed Content-Range: {}", range))?;

    total
        .parse::<u64>()
        .map_err(|_| anyhow!("Content-Range without exact total: {}", range))
}
