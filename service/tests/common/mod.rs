//! Shared helpers for integration tests.
//!
//! Payload builders mirror the live members-api shapes; mount helpers wrap
//! the common wiremock stubs. Each test binary uses a subset.

#![allow(dead_code)]

use std::time::Duration;

use serde_json::{json, Value};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Search payload with a single member hit.
pub fn search_payload(id: u64, name: &str, constituency: &str) -> Value {
    json!({
        "items": [
            {
                "value": {
                    "id": id,
                    "nameFullTitle": name,
                    "latestHouseMembership": {
                        "membershipFromName": constituency
                    }
                }
            }
        ]
    })
}

/// Search payload with no hits.
pub fn empty_search_payload() -> Value {
    json!({ "items": [] })
}

/// Contact payload with one published email.
pub fn contact_payload(email: &str) -> Value {
    json!({ "value": [ { "email": email } ] })
}

/// Stub the location search for a normalized postcode.
pub async fn mount_search(server: &MockServer, location: &str, payload: Value) {
    Mock::given(method("GET"))
        .and(path("/"))
        .and(query_param("Location", location))
        .respond_with(ResponseTemplate::new(200).set_body_json(payload))
        .mount(server)
        .await;
}

/// Stub the contact lookup for a member id.
pub async fn mount_contact(server: &MockServer, member_id: u64, payload: Value) {
    Mock::given(method("GET"))
        .and(path(format!("/{member_id}/Contact")))
        .respond_with(ResponseTemplate::new(200).set_body_json(payload))
        .mount(server)
        .await;
}

/// Stub a contact lookup that answers only after `delay`.
pub async fn mount_contact_with_delay(
    server: &MockServer,
    member_id: u64,
    payload: Value,
    delay: Duration,
) {
    Mock::given(method("GET"))
        .and(path(format!("/{member_id}/Contact")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(payload)
                .set_delay(delay),
        )
        .mount(server)
        .await;
}
