use crate::config::PublicAuthConfig;
use crate::errors::AppError;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::watch;
use utoipa::ToSchema;

/// Signed-in identity as reported by the auth service.
///
/// `id` is opaque to us; it only serves as the vault namespace.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Client for the hosted passwordless auth service (Supabase GoTrue).
#[derive(Clone)]
pub struct AuthGateway {
    client: reqwest::Client,
    base_url: String,
    anon_key: String,
}

impl AuthGateway {
    pub fn new(config: &PublicAuthConfig) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create auth client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            anon_key: config.anon_key.clone(),
        })
    }

    /// Emails a one-time sign-in link, creating the account on first use.
    pub async fn send_magic_link(
        &self,
        email: &str,
        redirect_to: Option<&str>,
    ) -> Result<(), AppError> {
        let endpoint = format!("{}/auth/v1/otp", self.base_url);
        let url = match redirect_to {
            Some(redirect) => url::Url::parse_with_params(&endpoint, &[("redirect_to", redirect)]),
            None => url::Url::parse(&endpoint),
        }
        .map_err(|e| AppError::Internal(format!("Failed to build URL: {}", e)))?;

        tracing::info!("Requesting magic link");

        let response = self
            .client
            .post(url)
            .header("apikey", &self.anon_key)
            .json(&json!({ "email": email, "create_user": true }))
            .send()
            .await
            .map_err(|e| AppError::ExternalApi(format!("Auth request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            if status.is_client_error() {
                return Err(AppError::Validation(gotrue_message(&error_text)));
            }
            return Err(AppError::ExternalApi(format!(
                "Auth returned {}: {}",
                status, error_text
            )));
        }

        Ok(())
    }

    /// Resolves an access token to the signed-in user.
    pub async fn get_user(&self, access_token: &str) -> Result<AuthUser, AppError> {
        let url = format!("{}/auth/v1/user", self.base_url);

        let response = self
            .client
            .get(&url)
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AppError::ExternalApi(format!("Auth request failed: {}", e)))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(AppError::Unauthorized(
                "Session expired or invalid".to_string(),
            ));
        }
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::ExternalApi(format!(
                "Auth returned {}: {}",
                status, error_text
            )));
        }

        response.json().await.map_err(|e| {
            AppError::ExternalApi(format!("Failed to parse auth user response: {}", e))
        })
    }

    /// Revokes the session behind `access_token`.
    pub async fn sign_out(&self, access_token: &str) -> Result<(), AppError> {
        let url = format!("{}/auth/v1/logout", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = response.status();
        // An already-expired session counts as signed out.
        if status.is_success() || status == reqwest::StatusCode::UNAUTHORIZED {
            return Ok(());
        }

        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(AppError::ExternalApi(format!(
            "Sign-out returned {}: {}",
            status, error_text
        )))
    }

    /// Starts an observable session for `access_token`. Nobody is signed in
    /// until the first [`AuthSession::refresh`].
    pub fn session(&self, access_token: impl Into<String>) -> AuthSession {
        let (state, _) = watch::channel(None);
        AuthSession {
            gateway: self.clone(),
            access_token: access_token.into(),
            state,
        }
    }
}

/// Session handle that publishes identity changes to its subscribers.
pub struct AuthSession {
    gateway: AuthGateway,
    access_token: String,
    state: watch::Sender<Option<AuthUser>>,
}

impl AuthSession {
    pub fn subscribe(&self) -> watch::Receiver<Option<AuthUser>> {
        self.state.subscribe()
    }

    pub fn current(&self) -> Option<AuthUser> {
        self.state.borrow().clone()
    }

    /// Fetches the current user and publishes it. A rejected token publishes
    /// "signed out" before the error is returned.
    pub async fn refresh(&self) -> Result<AuthUser, AppError> {
        match self.gateway.get_user(&self.access_token).await {
            Ok(user) => {
                self.state.send_replace(Some(user.clone()));
                Ok(user)
            }
            Err(e @ AppError::Unauthorized(_)) => {
                self.state.send_replace(None);
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn sign_out(&self) -> Result<(), AppError> {
        self.gateway.sign_out(&self.access_token).await?;
        self.state.send_replace(None);
        Ok(())
    }
}

/// Pulls the human-readable message out of a GoTrue error body.
fn gotrue_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            ["msg", "message", "error_description", "error"]
                .iter()
                .find_map(|key| v.get(*key).and_then(|m| m.as_str()).map(str::to_string))
        })
        .unwrap_or_else(|| "Magic link request rejected".to_string())
}
