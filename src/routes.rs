use crate::auth::AuthUser;
use crate::document_store::StoredDocument;
use crate::handlers::{self, AppState};
use crate::models::*;
use crate::vault_handler;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Largest accepted request body (vault uploads included).
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

#[derive(OpenApi)]
#[openapi(
    info(title = "LEXVOYAGE API", description = "Quote intake, magic-link login and itinerary vault"),
    paths(
        handlers::health,
        handlers::capabilities,
        handlers::submit_quote,
        handlers::request_magic_link,
        handlers::current_user,
        handlers::sign_out,
        vault_handler::list_documents,
        vault_handler::upload_document,
        vault_handler::signed_document_url,
    ),
    components(schemas(
        QuoteRequest,
        Lead,
        SubmissionAck,
        ErrorBody,
        Capabilities,
        MagicLinkRequest,
        MagicLinkResponse,
        SignOutResponse,
        AuthUser,
        StoredDocument,
        UploadResponse,
        SignedUrlResponse,
    )),
    tags(
        (name = "leads", description = "Quote requests"),
        (name = "auth", description = "Passwordless sign-in"),
        (name = "vault", description = "Per-user trip documents"),
        (name = "system", description = "Health and capability probes")
    )
)]
pub struct ApiDoc;

/// Builds the full application router.
pub fn build_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        .route(
            "/api/quote",
            post(handlers::submit_quote).fallback(handlers::quote_method_not_allowed),
        )
        .route("/api/capabilities", get(handlers::capabilities))
        .route("/api/auth/magic-link", post(handlers::request_magic_link))
        .route("/api/auth/user", get(handlers::current_user))
        .route("/api/auth/logout", post(handlers::sign_out))
        .route(
            "/api/vault/documents",
            get(vault_handler::list_documents).post(vault_handler::upload_document),
        )
        .route(
            "/api/vault/documents/:name/signed-url",
            get(vault_handler::signed_document_url),
        )
        .layer(
            ServiceBuilder::new()
                // Uploads are bounded by the layer below instead of axum's 2MB default
                .layer(DefaultBodyLimit::disable())
                .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES)),
        );

    Router::new()
        .route("/health", get(handlers::health))
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
