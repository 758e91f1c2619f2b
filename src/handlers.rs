use crate::auth::{AuthGateway, AuthUser};
use crate::config::Config;
use crate::document_store::DocumentStore;
use crate::errors::AppError;
use crate::intake::LeadIntakeService;
use crate::models::*;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderMap, StatusCode},
    Json,
};
use serde_json::json;
use std::sync::Arc;

pub const LOGIN_UNAVAILABLE: &str = "Login unavailable";
pub const VAULT_UNAVAILABLE: &str = "Vault unavailable";

/// Shared application state injected into handlers.
#[derive(Clone, Default)]
pub struct AppState {
    /// Quote-request pipeline.
    pub intake: LeadIntakeService,
    /// Magic-link auth; `None` when the public auth keys are missing.
    pub auth: Option<AuthGateway>,
    /// Per-user document vault; present exactly when `auth` is.
    pub documents: Option<DocumentStore>,
}

impl AppState {
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        let intake = LeadIntakeService::from_config(config)?;

        let (auth, documents) = match config.public_auth() {
            Some(public) => (
                Some(AuthGateway::new(&public)?),
                Some(DocumentStore::new(&public)?),
            ),
            None => (None, None),
        };

        Ok(Self {
            intake,
            auth,
            documents,
        })
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            lead_storage: self.intake.has_sink(),
            notifications: self.intake.has_notifier(),
            login: self.auth.is_some(),
            vault: self.auth.is_some() && self.documents.is_some(),
        }
    }

    pub(crate) fn auth(&self) -> Result<&AuthGateway, AppError> {
        self.auth
            .as_ref()
            .ok_or_else(|| AppError::Unavailable(LOGIN_UNAVAILABLE.to_string()))
    }
}

/// Extracts the session token from `Authorization: Bearer <token>`.
pub(crate) fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::Unauthorized("Please sign in first".to_string()))
}

/// Health check endpoint.
#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    responses((status = 200, description = "Service is running"))
)]
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "lexvoyage-api",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// GET /api/capabilities
///
/// Lets the front-end show "unavailable" placeholders instead of failing.
#[utoipa::path(
    get,
    path = "/api/capabilities",
    tag = "system",
    responses((status = 200, body = Capabilities))
)]
pub async fn capabilities(State(state): State<Arc<AppState>>) -> Json<Capabilities> {
    Json(state.capabilities())
}

/// POST /api/quote
///
/// Stores one quote request and notifies the sales inbox when configured.
#[utoipa::path(
    post,
    path = "/api/quote",
    tag = "leads",
    request_body = QuoteRequest,
    responses(
        (status = 200, description = "Lead stored", body = SubmissionAck),
        (status = 400, description = "Missing name or email", body = ErrorBody),
        (status = 405, description = "Only POST is accepted", body = ErrorBody),
        (status = 500, description = "Storage not configured or insert failed", body = ErrorBody)
    )
)]
pub async fn submit_quote(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<QuoteRequest>, JsonRejection>,
) -> Result<Json<SubmissionAck>, AppError> {
    let Json(request) = payload.map_err(|rejection| {
        AppError::Validation(format!("Invalid request body: {}", rejection.body_text()))
    })?;
    tracing::info!("POST /api/quote");

    let ack = state.intake.submit_lead(request).await?;
    Ok(Json(ack))
}

/// Any verb other than POST on /api/quote.
pub async fn quote_method_not_allowed() -> AppError {
    AppError::MethodNotAllowed("POST")
}

/// POST /api/auth/magic-link
#[utoipa::path(
    post,
    path = "/api/auth/magic-link",
    tag = "auth",
    request_body = MagicLinkRequest,
    responses(
        (status = 200, body = MagicLinkResponse),
        (status = 400, body = ErrorBody),
        (status = 503, description = "Login unavailable", body = ErrorBody)
    )
)]
pub async fn request_magic_link(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<MagicLinkRequest>,
) -> Result<Json<MagicLinkResponse>, AppError> {
    let auth = state.auth()?;

    let email = payload.email.trim();
    if email.is_empty() {
        return Err(AppError::Validation("Email is required".to_string()));
    }

    auth.send_magic_link(email, payload.redirect_to.as_deref())
        .await?;
    Ok(Json(MagicLinkResponse { sent: true }))
}

/// GET /api/auth/user
#[utoipa::path(
    get,
    path = "/api/auth/user",
    tag = "auth",
    responses(
        (status = 200, body = AuthUser),
        (status = 401, body = ErrorBody),
        (status = 503, description = "Login unavailable", body = ErrorBody)
    )
)]
pub async fn current_user(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<AuthUser>, AppError> {
    let auth = state.auth()?;
    let token = bearer_token(&headers)?;

    let user = auth.session(token).refresh().await?;
    Ok(Json(user))
}

/// POST /api/auth/logout
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "auth",
    responses(
        (status = 200, body = SignOutResponse),
        (status = 401, body = ErrorBody),
        (status = 503, description = "Login unavailable", body = ErrorBody)
    )
)]
pub async fn sign_out(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<SignOutResponse>, AppError> {
    let auth = state.auth()?;
    let token = bearer_token(&headers)?;

    auth.session(token).sign_out().await?;
    tracing::info!("Session signed out");
    Ok(Json(SignOutResponse { signed_out: true }))
}
