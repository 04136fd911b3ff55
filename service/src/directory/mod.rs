//! Parliament members directory integration.
//!
//! Resolving a postcode takes two chained directory calls: a location
//! search, then a contact lookup for the member id the search produced.
//!
//! # Architecture
//!
//! The module uses a trait-based design for testability:
//!
//! - [`DirectoryApi`] - Trait defining the generic request operation
//! - [`HttpDirectoryClient`] - Real HTTP implementation using reqwest
//! - [`mock::MockDirectoryClient`] - Mock for unit tests (behind `test-utils` feature)
//! - [`MpResolver`] - The two-stage resolution pipeline on top of the client
//!   and the response cache
//!
//! # Testing Patterns
//!
//! Unit tests script the mock per endpoint:
//!
//! ```ignore
//! use mpmailer_api::directory::mock::MockDirectoryClient;
//!
//! let mock = MockDirectoryClient::new();
//! mock.set_response("", Ok(search_payload));
//! mock.set_response("123/Contact", Ok(contact_payload));
//!
//! let resolved = resolver.resolve_by_postcode("SW1A 1AA", &filters).await?;
//! ```
//!
//! Integration tests drive [`HttpDirectoryClient`] against a `wiremock`
//! server instead.

mod client;
mod resolver;
mod types;

pub use client::{DirectoryApi, DirectoryError, HttpDirectoryClient, MEMBER_DIRECTORY_BASE};
pub use resolver::{MpResolver, ResolveError};
pub use types::{
    ContactEntry, ContactResponse, HouseMembership, MemberValue, ResolvedMp, SearchItem,
    SearchResponse,
};

#[cfg(any(test, feature = "test-utils"))]
pub use client::mock;
