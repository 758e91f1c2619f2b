use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

// ============ Quote submission ============

/// Body of `POST /api/quote`.
///
/// `lead` is kept as raw JSON: form fields arrive loosely typed and are coerced
/// during normalization instead of being rejected by the extractor.
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct QuoteRequest {
    #[serde(default)]
    #[schema(value_type = Object, example = json!({"name": "Jo Lee", "email": "jo@x.com", "adults": 2}))]
    pub lead: Value,
}

/// A normalized quote request, exactly as written to the `leads` table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
pub struct Lead {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub dates: Option<String>,
    pub adults: Option<i64>,
    pub children: i64,
    pub budget: Option<String>,
    pub style: Option<String>,
    pub interests: Option<Vec<String>>,
}

/// Acknowledgement returned once the lead row is stored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
pub struct SubmissionAck {
    pub ok: bool,
    /// Present only when a notification provider is configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notified: Option<bool>,
}

/// Error body shared by every endpoint.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct ErrorBody {
    #[schema(example = "Missing name or email")]
    pub error: String,
}

// ============ Capabilities ============

/// Which optional gateways this deployment has credentials for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
pub struct Capabilities {
    pub lead_storage: bool,
    pub notifications: bool,
    pub login: bool,
    pub vault: bool,
}

// ============ Login ============

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct MagicLinkRequest {
    pub email: String,
    /// Where the magic link should land after sign-in.
    #[serde(default)]
    pub redirect_to: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct MagicLinkResponse {
    pub sent: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct SignOutResponse {
    pub signed_out: bool,
}

// ============ Vault ============

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct UploadResponse {
    /// Object path inside the bucket, prefixed by the owner's id.
    pub path: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct SignedUrlResponse {
    pub signed_url: String,
    pub expires_in: u64,
}
