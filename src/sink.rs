use crate::config::SinkCredentials;
use crate::errors::AppError;
use crate::models::Lead;
use async_trait::async_trait;
use serde::Deserialize;

/// Destination for normalized leads.
#[async_trait]
pub trait LeadSink: Send + Sync {
    /// Inserts exactly one row. Any error means nothing was stored.
    async fn insert(&self, lead: &Lead) -> Result<(), AppError>;
}

/// PostgREST error payload (`{"message": ..., "code": ..., "hint": ...}`).
#[derive(Debug, Deserialize)]
struct PostgrestError {
    message: Option<String>,
    code: Option<String>,
}

/// Row-store client writing to the `leads` table through the Supabase REST API.
#[derive(Clone)]
pub struct SupabaseLeadSink {
    client: reqwest::Client,
    base_url: String,
    key: String,
}

impl SupabaseLeadSink {
    pub const TABLE: &'static str = "leads";

    pub fn new(credentials: &SinkCredentials) -> Result<Self, AppError> {
        let client = reqwest::Client::builder().build().map_err(|e| {
            AppError::Internal(format!("Failed to create Supabase client: {}", e))
        })?;

        Ok(Self {
            client,
            base_url: credentials.url.trim_end_matches('/').to_string(),
            key: credentials.key.clone(),
        })
    }
}

#[async_trait]
impl LeadSink for SupabaseLeadSink {
    async fn insert(&self, lead: &Lead) -> Result<(), AppError> {
        let url = format!("{}/rest/v1/{}", self.base_url, Self::TABLE);
        tracing::debug!("Inserting lead into {}", url);

        let response = self
            .client
            .post(&url)
            .header("apikey", &self.key)
            .header("Authorization", format!("Bearer {}", self.key))
            .header("Prefer", "return=minimal")
            .json(lead)
            .send()
            .await
            .map_err(|e| AppError::Persistence(format!("Supabase insert failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let reason = serde_json::from_str::<PostgrestError>(&error_text)
                .ok()
                .and_then(|e| match (e.message, e.code) {
                    (Some(message), Some(code)) => Some(format!("{} ({})", message, code)),
                    (Some(message), None) => Some(message),
                    _ => None,
                })
                .unwrap_or_else(|| format!("HTTP {}: {}", status, error_text));
            return Err(AppError::Persistence(format!(
                "Supabase insert failed: {}",
                reason
            )));
        }

        Ok(())
    }
}
