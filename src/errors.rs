use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

/// Application-specific error types.
#[derive(Debug, Clone)]
pub enum AppError {
    /// Client sent an unusable submission (missing name/email, malformed body).
    Validation(String),
    /// A required gateway is not configured for this deployment.
    Configuration(String),
    /// The relational sink rejected or never received the write.
    Persistence(String),
    /// The endpoint only accepts the listed verb.
    MethodNotAllowed(&'static str),
    /// Resource not found error.
    NotFound(String),
    /// Missing or rejected session token.
    Unauthorized(String),
    /// Optional capability (login, vault) is switched off for this deployment.
    Unavailable(String),
    /// Error interacting with an external API.
    ExternalApi(String),
    /// Internal server error.
    Internal(String),
    /// Error with context chain for better debugging.
    WithContext {
        /// The underlying source of the error.
        source: Box<AppError>,
        /// Additional context message.
        context: String,
    },
}

impl AppError {
    /// HTTP status this error maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Configuration(_) | AppError::Persistence(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::ExternalApi(_) => StatusCode::BAD_GATEWAY,
            AppError::WithContext { source, .. } => source.status(),
        }
    }

    /// Message shown to the caller in the `error` field.
    ///
    /// Validation, configuration and persistence messages are surfaced verbatim
    /// so the quote form can display them; internal details are not.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Validation(msg)
            | AppError::Configuration(msg)
            | AppError::Persistence(msg)
            | AppError::NotFound(msg)
            | AppError::Unauthorized(msg)
            | AppError::Unavailable(msg) => msg.clone(),
            AppError::MethodNotAllowed(_) => "Method not allowed".to_string(),
            AppError::ExternalApi(_) => "External service error".to_string(),
            AppError::Internal(_) => "Unexpected server error".to_string(),
            AppError::WithContext { source, .. } => source.public_message(),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(msg) => write!(f, "Validation error: {}", msg),
            AppError::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Persistence(msg) => write!(f, "Persistence error: {}", msg),
            AppError::MethodNotAllowed(allow) => {
                write!(f, "Method not allowed (allowed: {})", allow)
            }
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::Unavailable(msg) => write!(f, "Unavailable: {}", msg),
            AppError::ExternalApi(msg) => write!(f, "External API error: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
            AppError::WithContext { source, context } => {
                write!(f, "{}: {}", context, source)
            }
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    /// Converts the error into an HTTP response.
    ///
    /// Every variant renders as `{"error": "<message>"}`. Server-side failures
    /// are logged at ERROR, client mistakes at WARN or not at all.
    fn into_response(self) -> Response {
        match &self {
            AppError::Configuration(msg) => tracing::error!("Configuration error: {}", msg),
            AppError::Persistence(msg) => tracing::error!("Persistence error: {}", msg),
            AppError::ExternalApi(msg) => tracing::error!("External API error: {}", msg),
            AppError::Internal(msg) => tracing::error!("Internal error: {}", msg),
            AppError::Unauthorized(msg) => tracing::warn!("Unauthorized access: {}", msg),
            AppError::WithContext { source, context } => {
                tracing::error!("Error with context: {} -> {}", context, source)
            }
            AppError::Validation(_)
            | AppError::NotFound(_)
            | AppError::MethodNotAllowed(_)
            | AppError::Unavailable(_) => {}
        }

        let status = self.status();
        let body = Json(json!({
            "error": self.public_message(),
        }));

        match self {
            AppError::MethodNotAllowed(allow) => {
                (status, [(header::ALLOW, allow)], body).into_response()
            }
            _ => (status, body).into_response(),
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::ExternalApi(err.to_string())
    }
}

/// Extension trait for adding context to errors.
/// Similar to `anyhow::Context` but for our `AppError` type.
pub trait ResultExt<T> {
    /// Add context lazily (only evaluated on error).
    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T, AppError> {
    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: f(),
        })
    }
}
