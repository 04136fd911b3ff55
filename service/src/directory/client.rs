//! HTTP client for the Parliament members directory API.
//!
//! The trait abstraction enables:
//!
//! - Easy mocking in unit tests
//! - HTTP-level testing with `wiremock` in integration tests
//! - Swapping implementations (e.g., a different directory provider)
//!
//! # Example
//!
//! ```ignore
//! use mpmailer_api::directory::{DirectoryApi, HttpDirectoryClient};
//!
//! let client = HttpDirectoryClient::new(
//!     "https://members-api.parliament.uk/api/Members/Search",
//!     "",
//! );
//! let payload = client
//!     .request("", &params, Method::GET, Duration::from_secs(30))
//!     .await?;
//! ```

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use thiserror::Error;

/// Fixed base for member-scoped endpoints such as `{id}/Contact`.
pub const MEMBER_DIRECTORY_BASE: &str = "https://members-api.parliament.uk/api/Members";

/// User-Agent sent with every directory request.
const USER_AGENT: &str = concat!("mpmailer-api/", env!("CARGO_PKG_VERSION"));

/// Errors that can occur when calling the members directory.
#[derive(Debug, Clone, Error)]
pub enum DirectoryError {
    /// Transport failure: DNS, connection refused, timeout.
    #[error("could not reach the members directory: {0}")]
    Network(String),

    /// Response status outside the 2xx range.
    #[error("members directory returned status {status}")]
    Http { status: u16 },

    /// Success status but the body is not valid JSON.
    #[error("members directory returned a malformed payload: {0}")]
    Decode(String),
}

/// Trait for directory API requests.
///
/// The single `request` operation covers both the location search (empty
/// endpoint) and member-scoped lookups; callers interpret the returned JSON.
/// Use [`HttpDirectoryClient`] for real HTTP calls, or
/// [`mock::MockDirectoryClient`] in tests.
#[async_trait]
pub trait DirectoryApi: Send + Sync {
    /// Perform a directory request and return the parsed JSON body unmodified.
    async fn request(
        &self,
        endpoint: &str,
        params: &BTreeMap<String, String>,
        method: Method,
        timeout: Duration,
    ) -> Result<serde_json::Value, DirectoryError>;
}

/// HTTP-based implementation of [`DirectoryApi`] using reqwest.
pub struct HttpDirectoryClient {
    client: reqwest::Client,
    search_base: String,
    member_base: String,
    api_key: String,
}

impl HttpDirectoryClient {
    /// Create a client with the given search base URL and API key.
    ///
    /// An empty API key disables the `Authorization` header.
    pub fn new(search_base: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), search_base, api_key)
    }

    /// Create a client with a custom `reqwest::Client` (for testing with custom config).
    pub fn with_client(
        client: reqwest::Client,
        search_base: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            search_base: search_base.into(),
            member_base: MEMBER_DIRECTORY_BASE.to_string(),
            api_key: api_key.into(),
        }
    }

    /// Override the member-directory base used for `Contact` endpoints.
    ///
    /// Production keeps the fixed [`MEMBER_DIRECTORY_BASE`]; tests point this
    /// at a stub server.
    #[must_use]
    pub fn with_member_base(mut self, member_base: impl Into<String>) -> Self {
        self.member_base = member_base.into();
        self
    }

    /// Resolve the full URL for an endpoint.
    ///
    /// Member contact endpoints live under the member-directory base; an
    /// empty endpoint is the search base itself; anything else is appended
    /// to the search base.
    fn build_url(&self, endpoint: &str) -> String {
        if endpoint.contains("/Contact") {
            return format!(
                "{}/{}",
                self.member_base.trim_end_matches('/'),
                endpoint.trim_start_matches('/')
            );
        }
        if endpoint.is_empty() {
            return self.search_base.clone();
        }
        format!(
            "{}/{}",
            self.search_base.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        )
    }
}

fn map_transport_error(error: &reqwest::Error) -> DirectoryError {
    DirectoryError::Network(error.to_string())
}

#[async_trait]
impl DirectoryApi for HttpDirectoryClient {
    async fn request(
        &self,
        endpoint: &str,
        params: &BTreeMap<String, String>,
        method: Method,
        timeout: Duration,
    ) -> Result<serde_json::Value, DirectoryError> {
        let url = self.build_url(endpoint);
        tracing::debug!(%url, method = %method, "directory request");

        let mut builder = self
            .client
            .request(method.clone(), url)
            .timeout(timeout)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(reqwest::header::USER_AGENT, USER_AGENT);

        if !self.api_key.is_empty() {
            builder = builder.bearer_auth(&self.api_key);
        }

        if !params.is_empty() {
            // BTreeMap iteration is sorted by key, so both the query string
            // and the JSON body come out in canonical order.
            if method == Method::GET {
                builder = builder.query(params);
            } else if method == Method::POST || method == Method::PUT || method == Method::PATCH {
                builder = builder.json(params);
            }
        }

        let response = builder
            .send()
            .await
            .map_err(|error| map_transport_error(&error))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DirectoryError::Http {
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|error| map_transport_error(&error))?;
        serde_json::from_slice(&body).map_err(|error| DirectoryError::Decode(error.to_string()))
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[allow(clippy::unwrap_used, clippy::missing_panics_doc, clippy::must_use_candidate)]
pub mod mock {
    //! Mock implementation for unit testing.

    use super::{DirectoryApi, DirectoryError};
    use async_trait::async_trait;
    use reqwest::Method;
    use std::collections::{BTreeMap, HashMap};
    use std::sync::Mutex;
    use std::time::Duration;

    /// A request observed by the mock.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct RecordedRequest {
        pub endpoint: String,
        pub params: BTreeMap<String, String>,
        pub method: Method,
    }

    /// Mock implementation of [`DirectoryApi`] for unit tests.
    ///
    /// Script responses per endpoint with `set_response` and inspect the
    /// observed traffic with `requests()`. Unscripted endpoints answer 404.
    #[derive(Default)]
    pub struct MockDirectoryClient {
        responses: Mutex<HashMap<String, Result<serde_json::Value, DirectoryError>>>,
        requests: Mutex<Vec<RecordedRequest>>,
    }

    impl MockDirectoryClient {
        pub fn new() -> Self {
            Self::default()
        }

        /// Script the result returned for an endpoint.
        pub fn set_response(
            &self,
            endpoint: &str,
            result: Result<serde_json::Value, DirectoryError>,
        ) {
            self.responses
                .lock()
                .unwrap()
                .insert(endpoint.to_string(), result);
        }

        /// All requests observed so far, in order.
        pub fn requests(&self) -> Vec<RecordedRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl DirectoryApi for MockDirectoryClient {
        async fn request(
            &self,
            endpoint: &str,
            params: &BTreeMap<String, String>,
            method: Method,
            _timeout: Duration,
        ) -> Result<serde_json::Value, DirectoryError> {
            self.requests.lock().unwrap().push(RecordedRequest {
                endpoint: endpoint.to_string(),
                params: params.clone(),
                method,
            });

            self.responses
                .lock()
                .unwrap()
                .get(endpoint)
                .cloned()
                .unwrap_or(Err(DirectoryError::Http { status: 404 }))
        }
    }
}
