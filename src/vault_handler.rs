//! Itinerary vault endpoints.
//!
//! Every request resolves the bearer token to a user first; the user's id is
//! the only namespace the request may touch.

use crate::auth::AuthUser;
use crate::document_store::{DocumentStore, StoredDocument, DEFAULT_SIGNED_URL_TTL_SECS};
use crate::errors::AppError;
use crate::handlers::{bearer_token, AppState, VAULT_UNAVAILABLE};
use crate::models::{ErrorBody, SignedUrlResponse, UploadResponse};
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct SignedUrlQuery {
    pub ttl: Option<u64>,
}

/// Store, token and signed-in user for one vault request.
async fn vault_context<'a>(
    state: &'a AppState,
    headers: &'a HeaderMap,
) -> Result<(&'a DocumentStore, &'a str, AuthUser), AppError> {
    let (auth, store) = match (&state.auth, &state.documents) {
        (Some(auth), Some(store)) => (auth, store),
        _ => return Err(AppError::Unavailable(VAULT_UNAVAILABLE.to_string())),
    };
    let token = bearer_token(headers)?;
    let user = auth.session(token).refresh().await?;
    Ok((store, token, user))
}

/// GET /api/vault/documents
#[utoipa::path(
    get,
    path = "/api/vault/documents",
    tag = "vault",
    responses(
        (status = 200, body = [StoredDocument]),
        (status = 401, body = ErrorBody),
        (status = 503, description = "Vault unavailable", body = ErrorBody)
    )
)]
pub async fn list_documents(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<StoredDocument>>, AppError> {
    let (store, token, user) = vault_context(&state, &headers).await?;

    let documents = store.list(token, &user.id).await?;
    tracing::debug!("Vault {} holds {} documents", user.id, documents.len());
    Ok(Json(documents))
}

/// POST /api/vault/documents?name=<file>
#[utoipa::path(
    post,
    path = "/api/vault/documents",
    tag = "vault",
    params(("name" = String, Query, description = "Original file name")),
    request_body(content = String, content_type = "application/octet-stream", description = "Raw file bytes"),
    responses(
        (status = 201, body = UploadResponse),
        (status = 400, body = ErrorBody),
        (status = 401, body = ErrorBody),
        (status = 503, description = "Vault unavailable", body = ErrorBody)
    )
)]
pub async fn upload_document(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UploadQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<UploadResponse>), AppError> {
    let (store, token, user) = vault_context(&state, &headers).await?;

    if body.is_empty() {
        return Err(AppError::Validation("Empty file".to_string()));
    }
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream");

    let path = store
        .upload(token, &user.id, query.name.trim(), content_type, body.to_vec())
        .await?;
    tracing::info!("Stored vault document {}", path);

    Ok((StatusCode::CREATED, Json(UploadResponse { path })))
}

/// GET /api/vault/documents/:name/signed-url
#[utoipa::path(
    get,
    path = "/api/vault/documents/{name}/signed-url",
    tag = "vault",
    params(
        ("name" = String, Path, description = "Document name as returned by the listing"),
        ("ttl" = Option<u64>, Query, description = "Lifetime in seconds (default 600)")
    ),
    responses(
        (status = 200, body = SignedUrlResponse),
        (status = 401, body = ErrorBody),
        (status = 404, body = ErrorBody),
        (status = 503, description = "Vault unavailable", body = ErrorBody)
    )
)]
pub async fn signed_document_url(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Query(query): Query<SignedUrlQuery>,
    headers: HeaderMap,
) -> Result<Json<SignedUrlResponse>, AppError> {
    let (store, token, user) = vault_context(&state, &headers).await?;

    let expires_in = query.ttl.unwrap_or(DEFAULT_SIGNED_URL_TTL_SECS);
    if expires_in == 0 {
        return Err(AppError::Validation("ttl must be positive".to_string()));
    }

    let signed_url = store
        .create_signed_url(token, &user.id, &name, expires_in)
        .await?;
    Ok(Json(SignedUrlResponse {
        signed_url,
        expires_in,
    }))
}
