//! End-to-end tests for the search endpoint.
//!
//! The full stack — router, orchestrator, resolver, cache, HTTP client —
//! runs in-process against a `wiremock` stand-in for the members directory.

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::MockServer;

use common::{
    contact_payload, empty_search_payload, mount_contact, mount_contact_with_delay, mount_search,
    search_payload,
};
use mpmailer_api::cache::{CacheStore, MemoryCache};
use mpmailer_api::config::{CacheConfig, DirectoryConfig, DEFAULT_BODY_TEMPLATE};
use mpmailer_api::directory::{DirectoryApi, HttpDirectoryClient, MpResolver};
use mpmailer_api::rest::{self, AppState};
use mpmailer_api::search::SearchOrchestrator;
use mpmailer_api::template::TemplateEngine;

/// Build the app against a stub directory server.
fn app(server: &MockServer, timeout_seconds: u64) -> Router {
    let directory_config = DirectoryConfig {
        search_url: server.uri(),
        api_key: String::new(),
        timeout_seconds,
    };
    let cache_config = CacheConfig {
        enabled: true,
        ttl_seconds: 3600,
        sweep_interval_seconds: 600,
    };

    let client: Arc<dyn DirectoryApi> = Arc::new(
        HttpDirectoryClient::new(server.uri(), "").with_member_base(server.uri()),
    );
    let cache: Arc<dyn CacheStore> = Arc::new(MemoryCache::new());
    let resolver = MpResolver::new(client, cache, &directory_config, &cache_config);
    let orchestrator = SearchOrchestrator::new(
        resolver,
        TemplateEngine::new("", DEFAULT_BODY_TEMPLATE),
    );

    rest::router(AppState {
        orchestrator: Arc::new(orchestrator),
    })
}

fn post_search(payload: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/v1/search")
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .expect("request builds")
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body read");
    serde_json::from_slice(&bytes).expect("json body")
}

#[tokio::test]
async fn search_returns_member_draft_and_mail_link() {
    let server = MockServer::start().await;
    mount_search(
        &server,
        "SW1A1AA",
        search_payload(123, "Ms Jane Doe MP", "Holborn and St Pancras"),
    )
    .await;
    mount_contact(&server, 123, contact_payload("jane.doe.mp@parliament.uk")).await;

    let response = app(&server, 5)
        .oneshot(post_search(&json!({
            "postcode": "SW1A 1AA",
            "user_name": "Sam Smith",
            "user_email": "sam@example.org"
        })))
        .await
        .expect("request handled");

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;

    assert_eq!(body["found"], json!(true));
    assert_eq!(body["member"]["id"], json!("123"));
    assert_eq!(body["member"]["name"], json!("Ms Jane Doe MP"));
    assert_eq!(body["member"]["location"], json!("Holborn and St Pancras"));
    assert_eq!(body["member"]["email"], json!("jane.doe.mp@parliament.uk"));
    assert_eq!(body["postcode"], json!("SW1A 1AA"));
    assert_eq!(
        body["subject"],
        json!("Correspondence from your constituent in HOLBORN AND ST PANCRAS")
    );

    let rendered = body["body"].as_str().expect("body rendered");
    assert!(rendered.contains("Dear Ms Jane Doe MP,"));
    assert!(rendered.contains("Sam Smith"));
    assert!(rendered.contains("sam@example.org"));

    let mail_url = body["mailUrl"].as_str().expect("mail link");
    assert!(
        mail_url.starts_with("mailto:jane.doe.mp%40parliament.uk?subject="),
        "unexpected mail link: {mail_url}"
    );
}

#[tokio::test]
async fn empty_identity_leaves_placeholders_editable() {
    let server = MockServer::start().await;
    mount_search(
        &server,
        "M11AE",
        search_payload(200, "Mr John Roe MP", "Manchester Central"),
    )
    .await;
    mount_contact(&server, 200, contact_payload("john.roe.mp@parliament.uk")).await;

    let response = app(&server, 5)
        .oneshot(post_search(&json!({ "postcode": "M1 1AE" })))
        .await
        .expect("request handled");

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;

    let rendered = body["body"].as_str().expect("body rendered");
    assert!(rendered.contains("[Your name]"));
    assert!(rendered.contains("[Your email]"));
}

#[tokio::test]
async fn no_search_hits_is_a_not_found_outcome() {
    let server = MockServer::start().await;
    mount_search(&server, "EC1A1BB", empty_search_payload()).await;

    let response = app(&server, 5)
        .oneshot(post_search(&json!({ "postcode": "EC1A 1BB" })))
        .await
        .expect("request handled");

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;

    assert_eq!(body["found"], json!(false));
    assert!(body.get("member").is_none());
    assert!(body.get("mailUrl").is_none());
    let message = body["message"].as_str().expect("message");
    assert!(message.contains("EC1A 1BB"));

    // The contact endpoint was never called.
    let requests = server.received_requests().await.expect("recording enabled");
    assert_eq!(requests.len(), 1);
}

#[tokio::test]
async fn invalid_postcode_is_rejected_without_upstream_calls() {
    let server = MockServer::start().await;

    let response = app(&server, 5)
        .oneshot(post_search(&json!({ "postcode": "12345" })))
        .await
        .expect("request handled");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["code"], json!("INVALID_POSTCODE"));
    assert_eq!(body["detail"], json!("Please enter a valid UK postcode."));

    let requests = server.received_requests().await.expect("recording enabled");
    assert!(requests.is_empty());
}

#[tokio::test]
async fn upstream_failure_is_a_bad_gateway_problem() {
    use wiremock::matchers::method;
    use wiremock::{Mock, ResponseTemplate};

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let response = app(&server, 5)
        .oneshot(post_search(&json!({ "postcode": "SW1A 1AA" })))
        .await
        .expect("request handled");

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = json_body(response).await;
    assert_eq!(body["code"], json!("UPSTREAM_UNAVAILABLE"));
    let detail = body["detail"].as_str().expect("detail");
    assert!(detail.contains("500"));
    // Upstream bodies never leak into the user-facing payload.
    assert!(!detail.contains("boom"));
}

#[tokio::test]
async fn contact_timeout_degrades_to_member_without_email() {
    let server = MockServer::start().await;
    mount_search(
        &server,
        "SW1A1AA",
        search_payload(123, "Ms Jane Doe MP", "Holborn and St Pancras"),
    )
    .await;
    mount_contact_with_delay(
        &server,
        123,
        contact_payload("jane.doe.mp@parliament.uk"),
        Duration::from_secs(5),
    )
    .await;

    let response = app(&server, 1)
        .oneshot(post_search(&json!({ "postcode": "SW1A 1AA" })))
        .await
        .expect("request handled");

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;

    assert_eq!(body["found"], json!(true));
    assert_eq!(body["member"]["email"], json!(""));
    assert!(body.get("mailUrl").is_none());
}

#[tokio::test]
async fn repeated_search_is_served_from_cache() {
    let server = MockServer::start().await;
    mount_search(
        &server,
        "B338TH",
        search_payload(300, "Ms Ada Example MP", "Birmingham Yardley"),
    )
    .await;
    mount_contact(&server, 300, contact_payload("ada.example.mp@parliament.uk")).await;

    let app = app(&server, 5);
    for _ in 0..3 {
        let response = app
            .clone()
            .oneshot(post_search(&json!({ "postcode": "B33 8TH" })))
            .await
            .expect("request handled");
        assert_eq!(response.status(), StatusCode::OK);
    }

    // One search and one contact call; the repeats hit the cache.
    let requests = server.received_requests().await.expect("recording enabled");
    assert_eq!(requests.len(), 2);
}

#[tokio::test]
async fn health_endpoint_responds_ok() {
    let server = MockServer::start().await;

    let response = app(&server, 5)
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("request handled");

    assert_eq!(response.status(), StatusCode::OK);
}
