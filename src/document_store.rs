use crate::config::PublicAuthConfig;
use crate::errors::{AppError, ResultExt};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

pub const DOCUMENTS_BUCKET: &str = "documents";
/// Lifetime of a signed download URL when the caller does not pick one.
pub const DEFAULT_SIGNED_URL_TTL_SECS: u64 = 600;
const LIST_LIMIT: u32 = 100;

/// A document in a user's vault.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
pub struct StoredDocument {
    pub name: String,
    #[serde(rename = "createdAt")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Entry of the storage list endpoint. Folders come back with a null `id`.
#[derive(Debug, Deserialize)]
struct StorageObject {
    name: String,
    id: Option<String>,
    created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct SignedUrlPayload {
    #[serde(rename = "signedURL")]
    signed_url: String,
}

/// Per-user document vault on hosted object storage (Supabase Storage).
///
/// Every call carries the user's own access token, so bucket policies apply
/// on top of the namespace prefix enforced here.
#[derive(Clone)]
pub struct DocumentStore {
    client: reqwest::Client,
    base_url: String,
    anon_key: String,
    bucket: String,
}

impl DocumentStore {
    pub fn new(config: &PublicAuthConfig) -> Result<Self, AppError> {
        let client = reqwest::Client::builder().build().map_err(|e| {
            AppError::Internal(format!("Failed to create storage client: {}", e))
        })?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            anon_key: config.anon_key.clone(),
            bucket: DOCUMENTS_BUCKET.to_string(),
        })
    }

    /// Lists the namespace, newest first.
    pub async fn list(
        &self,
        access_token: &str,
        namespace: &str,
    ) -> Result<Vec<StoredDocument>, AppError> {
        check_segment(namespace, "namespace")?;
        let url = self.object_url(&["list", self.bucket.as_str()])?;

        let response = self
            .client
            .post(url)
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .json(&json!({
                "prefix": namespace,
                "limit": LIST_LIMIT,
                "offset": 0,
                "sortBy": { "column": "created_at", "order": "desc" }
            }))
            .send()
            .await?;

        let response = check_status(response, "list").await?;
        let objects: Vec<StorageObject> = response.json().await.map_err(|e| {
            AppError::ExternalApi(format!("Failed to parse storage list response: {}", e))
        })?;

        Ok(objects
            .into_iter()
            .filter(|o| o.id.is_some())
            .map(|o| StoredDocument {
                name: o.name,
                created_at: o.created_at,
            })
            .collect())
    }

    /// Stores a new object as `<namespace>/<unix-millis>_<file_name>` and
    /// returns that path. Existing objects are never overwritten.
    pub async fn upload(
        &self,
        access_token: &str,
        namespace: &str,
        file_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, AppError> {
        check_segment(namespace, "namespace")?;
        check_segment(file_name, "file name")?;

        let object_name = format!("{}_{}", Utc::now().timestamp_millis(), file_name);
        let url = self.object_url(&[self.bucket.as_str(), namespace, object_name.as_str()])?;
        tracing::info!("Uploading {} bytes to vault {}", bytes.len(), namespace);

        let response = self
            .client
            .post(url)
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .header("Content-Type", content_type)
            .header("x-upsert", "false")
            .body(bytes)
            .send()
            .await?;

        check_status(response, "upload")
            .await
            .with_context(|| format!("uploading {}", object_name))?;

        Ok(format!("{}/{}", namespace, object_name))
    }

    /// Returns an absolute, temporary download URL for `namespace/name`.
    pub async fn create_signed_url(
        &self,
        access_token: &str,
        namespace: &str,
        name: &str,
        ttl_secs: u64,
    ) -> Result<String, AppError> {
        check_segment(namespace, "namespace")?;
        check_segment(name, "file name")?;
        let url = self.object_url(&["sign", self.bucket.as_str(), namespace, name])?;

        let response = self
            .client
            .post(url)
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .json(&json!({ "expiresIn": ttl_secs }))
            .send()
            .await?;

        let response = check_status(response, "sign").await?;
        let payload: SignedUrlPayload = response.json().await.map_err(|e| {
            AppError::ExternalApi(format!("Failed to parse signed URL response: {}", e))
        })?;

        // The storage API answers with a path relative to /storage/v1.
        if payload.signed_url.starts_with("http://") || payload.signed_url.starts_with("https://")
        {
            return Ok(payload.signed_url);
        }
        Ok(format!("{}/storage/v1{}", self.base_url, payload.signed_url))
    }

    fn object_url(&self, segments: &[&str]) -> Result<url::Url, AppError> {
        let mut url = url::Url::parse(&format!("{}/storage/v1/object", self.base_url))
            .map_err(|e| AppError::Internal(format!("Failed to build URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| AppError::Internal("Storage URL cannot be a base".to_string()))?
            .extend(segments);
        Ok(url)
    }
}

/// Keeps every object access inside the caller's namespace.
fn check_segment(value: &str, what: &str) -> Result<(), AppError> {
    if value.is_empty()
        || value == "."
        || value == ".."
        || value.contains('/')
        || value.contains('\\')
    {
        return Err(AppError::Validation(format!("Invalid {}", what)));
    }
    Ok(())
}

async fn check_status(
    response: reqwest::Response,
    operation: &str,
) -> Result<reqwest::Response, AppError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    match status {
        reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => Err(
            AppError::Unauthorized(format!("Storage {} denied: {}", operation, error_text)),
        ),
        reqwest::StatusCode::NOT_FOUND => Err(AppError::NotFound(format!(
            "Document not found ({})",
            operation
        ))),
        // Duplicate key on upload with x-upsert: false.
        reqwest::StatusCode::CONFLICT => Err(AppError::Validation(
            "A document with this name already exists".to_string(),
        )),
        _ => Err(AppError::ExternalApi(format!(
            "Storage {} returned {}: {}",
            operation, status, error_text
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> DocumentStore {
        DocumentStore::new(&PublicAuthConfig {
            url: "https://proj.supabase.co/".to_string(),
            anon_key: "anon".to_string(),
        })
        .unwrap()
    }

    #[test]
    fn test_segments_outside_namespace_rejected() {
        for bad in ["", ".", "..", "a/b", "..\\x", "../other-user"] {
            assert!(check_segment(bad, "file name").is_err(), "{:?}", bad);
        }
        assert!(check_segment("itinerary v2.pdf", "file name").is_ok());
    }

    #[test]
    fn test_object_url_encodes_segments() {
        let url = store()
            .object_url(&["sign", "documents", "user-1", "my trip.pdf"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://proj.supabase.co/storage/v1/object/sign/documents/user-1/my%20trip.pdf"
        );
    }
}
