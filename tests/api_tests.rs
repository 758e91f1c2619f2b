/// HTTP-level tests driving the full router with mocked Supabase services.
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use lexvoyage_api::auth::AuthGateway;
use lexvoyage_api::config::{KeyRole, PublicAuthConfig, SinkCredentials};
use lexvoyage_api::document_store::DocumentStore;
use lexvoyage_api::handlers::AppState;
use lexvoyage_api::intake::LeadIntakeService;
use lexvoyage_api::routes::build_router;
use lexvoyage_api::sink::{LeadSink, SupabaseLeadSink};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use wiremock::matchers::{body_json, body_partial_json, header as header_is, method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "user-access-token";

/// Helper function to build a fully configured app against the mock server
fn configured_app(base_url: &str) -> Router {
    let sink: Arc<dyn LeadSink> = Arc::new(
        SupabaseLeadSink::new(&SinkCredentials {
            url: base_url.to_string(),
            key: "service-key".to_string(),
            role: KeyRole::ServiceRole,
        })
        .unwrap(),
    );
    let public = PublicAuthConfig {
        url: base_url.to_string(),
        anon_key: "anon-key".to_string(),
    };

    build_router(Arc::new(AppState {
        intake: LeadIntakeService::new(Some(sink), None),
        auth: Some(AuthGateway::new(&public).unwrap()),
        documents: Some(DocumentStore::new(&public).unwrap()),
    }))
}

fn unconfigured_app() -> Router {
    build_router(Arc::new(AppState::default()))
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, headers, body)
}

fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn authed(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", TOKEN))
        .body(Body::empty())
        .unwrap()
}

async fn mount_user(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .and(header_is("authorization", format!("Bearer {}", TOKEN).as_str()))
        .and(header_is("apikey", "anon-key"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"id": "user-1", "email": "jo@x.com", "aud": "authenticated"})),
        )
        .mount(server)
        .await;
}

// ============ Quote endpoint ============

#[tokio::test]
async fn test_quote_rejects_non_post_verbs() {
    for verb in [Method::GET, Method::PUT, Method::DELETE] {
        let request = Request::builder()
            .method(verb.clone())
            .uri("/api/quote")
            .body(Body::empty())
            .unwrap();

        let (status, headers, body) = send(unconfigured_app(), request).await;

        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED, "{}", verb);
        assert_eq!(headers.get(header::ALLOW).unwrap(), "POST");
        assert_eq!(body, json!({"error": "Method not allowed"}));
    }
}

#[tokio::test]
async fn test_quote_success_returns_ok() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/leads"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (status, _, body) = send(
        configured_app(&mock_server.uri()),
        json_request(
            Method::POST,
            "/api/quote",
            json!({"lead": {"name": "Jo Lee", "email": "jo@x.com", "adults": 2}}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"ok": true}));
}

#[tokio::test]
async fn test_quote_fractional_or_text_counts_are_rejected() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/leads"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&mock_server)
        .await;

    let (status, _, body) = send(
        configured_app(&mock_server.uri()),
        json_request(
            Method::POST,
            "/api/quote",
            json!({"lead": {"name": "Jo", "email": "jo@x.com", "adults": 2.7, "children": "abc"}}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Invalid adults: expected a whole number"}));
}

#[tokio::test]
async fn test_quote_missing_name_is_client_error() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/leads"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&mock_server)
        .await;

    let (status, _, body) = send(
        configured_app(&mock_server.uri()),
        json_request(Method::POST, "/api/quote", json!({"lead": {"email": "jo@x.com"}})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Missing name or email"}));
}

#[tokio::test]
async fn test_quote_without_lead_field_is_client_error() {
    let mock_server = MockServer::start().await;

    let (status, _, body) = send(
        configured_app(&mock_server.uri()),
        json_request(Method::POST, "/api/quote", json!({"name": "Jo", "email": "jo@x.com"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing name or email");
}

#[tokio::test]
async fn test_quote_malformed_body_is_client_error() {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/quote")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let (status, _, body) = send(unconfigured_app(), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Invalid request body"));
}

#[tokio::test]
async fn test_quote_without_sink_is_server_error() {
    let (status, _, body) = send(
        unconfigured_app(),
        json_request(
            Method::POST,
            "/api/quote",
            json!({"lead": {"name": "Jo", "email": "jo@x.com"}}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Supabase env vars missing"));
}

#[tokio::test]
async fn test_quote_sink_failure_surfaces_message() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/leads"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "code": "42P01",
            "message": "relation \"public.leads\" does not exist"
        })))
        .mount(&mock_server)
        .await;

    let (status, _, body) = send(
        configured_app(&mock_server.uri()),
        json_request(
            Method::POST,
            "/api/quote",
            json!({"lead": {"name": "Jo", "email": "jo@x.com"}}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body["error"],
        "Supabase insert failed: relation \"public.leads\" does not exist (42P01)"
    );
}

// ============ Capabilities & health ============

#[tokio::test]
async fn test_health() {
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, _, body) = send(unconfigured_app(), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_capabilities_reflect_configuration() {
    let request = Request::builder()
        .uri("/api/capabilities")
        .body(Body::empty())
        .unwrap();
    let (_, _, body) = send(unconfigured_app(), request).await;
    assert_eq!(
        body,
        json!({"lead_storage": false, "notifications": false, "login": false, "vault": false})
    );

    let mock_server = MockServer::start().await;
    let request = Request::builder()
        .uri("/api/capabilities")
        .body(Body::empty())
        .unwrap();
    let (_, _, body) = send(configured_app(&mock_server.uri()), request).await;
    assert_eq!(
        body,
        json!({"lead_storage": true, "notifications": false, "login": true, "vault": true})
    );
}

// ============ Login ============

#[tokio::test]
async fn test_login_unavailable_without_public_auth() {
    let (status, _, body) = send(
        unconfigured_app(),
        json_request(Method::POST, "/api/auth/magic-link", json!({"email": "jo@x.com"})),
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body, json!({"error": "Login unavailable"}));
}

#[tokio::test]
async fn test_magic_link_forwarded_with_redirect() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/otp"))
        .and(query_param("redirect_to", "https://lexvoyage.co"))
        .and(header_is("apikey", "anon-key"))
        .and(body_partial_json(json!({"email": "jo@x.com"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (status, _, body) = send(
        configured_app(&mock_server.uri()),
        json_request(
            Method::POST,
            "/api/auth/magic-link",
            json!({"email": " jo@x.com ", "redirect_to": "https://lexvoyage.co"}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"sent": true}));
}

#[tokio::test]
async fn test_magic_link_requires_email() {
    let mock_server = MockServer::start().await;

    let (status, _, _) = send(
        configured_app(&mock_server.uri()),
        json_request(Method::POST, "/api/auth/magic-link", json!({"email": "  "})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_current_user() {
    let mock_server = MockServer::start().await;
    mount_user(&mock_server).await;

    let (status, _, body) = send(
        configured_app(&mock_server.uri()),
        authed(Method::GET, "/api/auth/user"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"id": "user-1", "email": "jo@x.com"}));
}

#[tokio::test]
async fn test_current_user_with_rejected_token() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"msg": "invalid JWT"})))
        .mount(&mock_server)
        .await;

    let (status, _, _) = send(
        configured_app(&mock_server.uri()),
        authed(Method::GET, "/api/auth/user"),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/logout"))
        .and(header_is("authorization", format!("Bearer {}", TOKEN).as_str()))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (status, _, body) = send(
        configured_app(&mock_server.uri()),
        authed(Method::POST, "/api/auth/logout"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"signed_out": true}));
}

// ============ Vault ============

#[tokio::test]
async fn test_vault_unavailable_without_public_auth() {
    let (status, _, body) = send(unconfigured_app(), authed(Method::GET, "/api/vault/documents")).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body, json!({"error": "Vault unavailable"}));
}

#[tokio::test]
async fn test_vault_requires_token() {
    let mock_server = MockServer::start().await;
    let request = Request::builder()
        .uri("/api/vault/documents")
        .body(Body::empty())
        .unwrap();

    let (status, _, _) = send(configured_app(&mock_server.uri()), request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_vault_lists_own_namespace() {
    let mock_server = MockServer::start().await;
    mount_user(&mock_server).await;

    Mock::given(method("POST"))
        .and(path("/storage/v1/object/list/documents"))
        .and(header_is("authorization", format!("Bearer {}", TOKEN).as_str()))
        .and(body_partial_json(json!({
            "prefix": "user-1",
            "sortBy": {"column": "created_at", "order": "desc"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "name": "1718000000000_itinerary.pdf",
                "id": "b1c2",
                "created_at": "2024-06-10T08:00:00Z",
                "metadata": {"size": 1024}
            },
            {"name": "drafts", "id": null, "created_at": null, "metadata": null}
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (status, _, body) = send(
        configured_app(&mock_server.uri()),
        authed(Method::GET, "/api/vault/documents"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!([{"name": "1718000000000_itinerary.pdf", "createdAt": "2024-06-10T08:00:00Z"}])
    );
}

#[tokio::test]
async fn test_vault_upload_prefixes_namespace_and_timestamp() {
    let mock_server = MockServer::start().await;
    mount_user(&mock_server).await;

    Mock::given(method("POST"))
        .and(path_regex(r"^/storage/v1/object/documents/user-1/\d+_trip\.pdf$"))
        .and(header_is("x-upsert", "false"))
        .and(header_is("content-type", "application/pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"Key": "documents/user-1/x"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/vault/documents?name=trip.pdf")
        .header(header::AUTHORIZATION, format!("Bearer {}", TOKEN))
        .header(header::CONTENT_TYPE, "application/pdf")
        .body(Body::from(&b"%PDF-1.4"[..]))
        .unwrap();

    let (status, _, body) = send(configured_app(&mock_server.uri()), request).await;

    assert_eq!(status, StatusCode::CREATED);
    let stored = body["path"].as_str().unwrap();
    assert!(stored.starts_with("user-1/"), "{}", stored);
    assert!(stored.ends_with("_trip.pdf"), "{}", stored);
}

#[tokio::test]
async fn test_vault_upload_rejects_empty_file() {
    let mock_server = MockServer::start().await;
    mount_user(&mock_server).await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/vault/documents?name=trip.pdf")
        .header(header::AUTHORIZATION, format!("Bearer {}", TOKEN))
        .body(Body::empty())
        .unwrap();

    let (status, _, body) = send(configured_app(&mock_server.uri()), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Empty file"}));
}

#[tokio::test]
async fn test_vault_signed_url_defaults_to_ten_minutes() {
    let mock_server = MockServer::start().await;
    mount_user(&mock_server).await;

    Mock::given(method("POST"))
        .and(path("/storage/v1/object/sign/documents/user-1/a.pdf"))
        .and(body_json(json!({"expiresIn": 600})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "signedURL": "/object/sign/documents/user-1/a.pdf?token=abc"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (status, _, body) = send(
        configured_app(&mock_server.uri()),
        authed(Method::GET, "/api/vault/documents/a.pdf/signed-url"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "signed_url": format!(
                "{}/storage/v1/object/sign/documents/user-1/a.pdf?token=abc",
                mock_server.uri()
            ),
            "expires_in": 600
        })
    );
}

#[tokio::test]
async fn test_vault_signed_url_cannot_leave_namespace() {
    let mock_server = MockServer::start().await;
    mount_user(&mock_server).await;

    Mock::given(method("POST"))
        .and(path_regex(r"^/storage/v1/object/sign/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let (status, _, _) = send(
        configured_app(&mock_server.uri()),
        authed(Method::GET, "/api/vault/documents/other-user%2Fa.pdf/signed-url"),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_vault_missing_document_is_not_found() {
    let mock_server = MockServer::start().await;
    mount_user(&mock_server).await;

    Mock::given(method("POST"))
        .and(path("/storage/v1/object/sign/documents/user-1/gone.pdf"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({"error": "not_found", "message": "Object not found"})),
        )
        .mount(&mock_server)
        .await;

    let (status, _, _) = send(
        configured_app(&mock_server.uri()),
        authed(Method::GET, "/api/vault/documents/gone.pdf/signed-url?ttl=60"),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}
