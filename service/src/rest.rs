//! REST API handlers and `OpenAPI` documentation.
//!
//! The search endpoint is the only operation the UI layer calls; errors use
//! RFC 7807 Problem Details so the front end can render them uniformly.

// The OpenApi derive macro generates code that triggers this lint
#![allow(clippy::needless_for_each)]

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize, Serializer};
use utoipa::{OpenApi, ToSchema};

use crate::search::{MemberSummary, SearchError, SearchOrchestrator, SearchOutcome};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<SearchOrchestrator>,
}

/// Serialize a `StatusCode` as its `u16` representation.
#[allow(clippy::trivially_copy_pass_by_ref)] // serde requires `&T` signature
fn serialize_status_code<S: Serializer>(status: &StatusCode, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u16(status.as_u16())
}

/// RFC 7807 Problem Details error response.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProblemDetails {
    /// URI reference identifying the problem type
    #[serde(rename = "type")]
    pub problem_type: String,
    /// Short human-readable summary
    pub title: String,
    /// HTTP status code
    #[serde(serialize_with = "serialize_status_code")]
    #[schema(value_type = u16)]
    pub status: StatusCode,
    /// Human-readable explanation specific to this occurrence
    pub detail: String,
    /// Machine-readable error code
    pub code: String,
}

impl ProblemDetails {
    /// Create an invalid-input error response.
    #[must_use]
    pub fn invalid_postcode(detail: &str) -> Self {
        Self {
            problem_type: "https://mpmailer.org/errors/invalid-postcode".to_string(),
            title: "Invalid Postcode".to_string(),
            status: StatusCode::BAD_REQUEST,
            detail: detail.to_string(),
            code: "INVALID_POSTCODE".to_string(),
        }
    }

    /// Create an upstream-failure error response.
    #[must_use]
    pub fn upstream_unavailable(detail: &str) -> Self {
        Self {
            problem_type: "https://mpmailer.org/errors/upstream-unavailable".to_string(),
            title: "Members Directory Unavailable".to_string(),
            status: StatusCode::BAD_GATEWAY,
            detail: detail.to_string(),
            code: "UPSTREAM_UNAVAILABLE".to_string(),
        }
    }

    /// Create an internal server error response.
    #[must_use]
    pub fn internal_error(detail: &str) -> Self {
        Self {
            problem_type: "https://mpmailer.org/errors/internal".to_string(),
            title: "Internal Server Error".to_string(),
            status: StatusCode::INTERNAL_SERVER_ERROR,
            detail: detail.to_string(),
            code: "INTERNAL_ERROR".to_string(),
        }
    }
}

impl IntoResponse for ProblemDetails {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(self)).into_response()
    }
}

impl From<SearchError> for ProblemDetails {
    fn from(error: SearchError) -> Self {
        match &error {
            SearchError::MissingPostcode | SearchError::InvalidPostcode => {
                Self::invalid_postcode(&error.user_message())
            }
            SearchError::Upstream(_) => Self::upstream_unavailable(&error.user_message()),
        }
    }
}

/// Search request body.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SearchRequest {
    /// UK postcode, with or without the internal space.
    pub postcode: String,
    /// Sender name substituted into the draft; optional.
    #[serde(default)]
    pub user_name: String,
    /// Sender email substituted into the draft; optional.
    #[serde(default)]
    pub user_email: String,
}

/// `OpenAPI` documentation for the REST API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "MP Mailer API",
        version = "1.0.0",
        description = "Find your Member of Parliament by postcode and draft an email",
        license(name = "MIT")
    ),
    servers(
        (url = "/api/v1", description = "REST API v1")
    ),
    paths(search_mp, health),
    components(schemas(SearchRequest, SearchOutcome, MemberSummary, ProblemDetails))
)]
pub struct ApiDoc;

/// Find the MP for a postcode and draft an email
///
/// Resolves the postcode through the Parliament members directory and
/// returns the member summary together with the rendered draft and a
/// `mailto:` link. A postcode with no matching member yields a
/// `found = false` payload, not an error.
///
/// # Errors
///
/// Returns `ProblemDetails` for invalid postcodes (400) and upstream
/// directory failures (502).
#[utoipa::path(
    post,
    path = "/search",
    tag = "Search",
    request_body = SearchRequest,
    responses(
        (status = 200, description = "Search completed", body = SearchOutcome),
        (status = 400, description = "Missing or malformed postcode", body = ProblemDetails),
        (status = 502, description = "Members directory unavailable", body = ProblemDetails)
    )
)]
pub async fn search_mp(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<SearchOutcome>, ProblemDetails> {
    let outcome = state
        .orchestrator
        .search(&request.postcode, &request.user_name, &request.user_email)
        .await?;
    Ok(Json(outcome))
}

/// Liveness probe
///
/// # Errors
///
/// Never fails.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    responses((status = 200, description = "Service is up"))
)]
#[allow(clippy::unused_async)] // Required for Axum handler signature
pub async fn health() -> impl IntoResponse {
    StatusCode::OK
}

/// Routes shared by the binary and the integration tests.
///
/// Cross-cutting layers (CORS, security headers, rate limiting, tracing)
/// are applied by the composition root.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/search", post(search_mp))
        .route("/health", get(health))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn problem_details_serializes_correctly() {
        let problem = ProblemDetails::invalid_postcode("Please enter a valid UK postcode.");
        let json = serde_json::to_string(&problem).expect("serialize");
        assert!(json.contains("\"type\":"));
        assert!(json.contains("\"status\":400"));
        assert!(json.contains("INVALID_POSTCODE"));
    }

    #[test]
    fn upstream_error_maps_to_bad_gateway() {
        use crate::directory::DirectoryError;

        let problem: ProblemDetails =
            SearchError::Upstream(DirectoryError::Network("dns failure".to_string())).into();
        assert_eq!(problem.status, StatusCode::BAD_GATEWAY);
        assert_eq!(problem.code, "UPSTREAM_UNAVAILABLE");
        // Transport details never reach the user-facing payload.
        assert!(!problem.detail.contains("dns"));
    }

    #[test]
    fn missing_postcode_maps_to_bad_request() {
        let problem: ProblemDetails = SearchError::MissingPostcode.into();
        assert_eq!(problem.status, StatusCode::BAD_REQUEST);
        assert_eq!(problem.detail, "UK postcode is required.");
    }
}
