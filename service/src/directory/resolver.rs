//! Two-stage postcode-to-member resolution.
//!
//! A resolution is one location search followed, when the search produced a
//! member id, by one contact lookup. The calls are sequential because the
//! contact endpoint needs the id from the search. Both responses go through
//! the cache under independent fingerprints.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use thiserror::Error;

use mpm_postcode::{InvalidPostcode, Postcode};

use crate::cache::{fingerprint, CacheStore};
use crate::config::{CacheConfig, DirectoryConfig};
use crate::directory::client::{DirectoryApi, DirectoryError};
use crate::directory::types::{ContactResponse, ResolvedMp, SearchResponse};

/// Default page window sent with every location search.
const DEFAULT_SKIP: &str = "0";
const DEFAULT_TAKE: &str = "20";

/// Errors from a resolution attempt.
///
/// A postcode with no matching member is not an error; see
/// [`MpResolver::resolve_by_postcode`].
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    InvalidPostcode(#[from] InvalidPostcode),

    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

/// Resolves a postcode to a member with contact details.
pub struct MpResolver {
    client: Arc<dyn DirectoryApi>,
    cache: Arc<dyn CacheStore>,
    search_url: String,
    timeout: Duration,
    cache_enabled: bool,
    cache_ttl_seconds: u64,
}

impl MpResolver {
    pub fn new(
        client: Arc<dyn DirectoryApi>,
        cache: Arc<dyn CacheStore>,
        directory: &DirectoryConfig,
        cache_config: &CacheConfig,
    ) -> Self {
        Self {
            client,
            cache,
            search_url: directory.search_url.clone(),
            timeout: directory.timeout(),
            cache_enabled: cache_config.enabled,
            cache_ttl_seconds: cache_config.ttl_seconds,
        }
    }

    /// Resolve the member for a postcode.
    ///
    /// Returns `Ok(None)` when the directory knows no member for the
    /// location. A failed contact lookup never fails the resolution; the
    /// member comes back with an empty email.
    ///
    /// # Errors
    ///
    /// [`ResolveError::InvalidPostcode`] for malformed input (checked before
    /// any network traffic) and [`ResolveError::Directory`] when the search
    /// call itself fails.
    pub async fn resolve_by_postcode(
        &self,
        postcode: &str,
        filters: &BTreeMap<String, String>,
    ) -> Result<Option<ResolvedMp>, ResolveError> {
        let postcode = Postcode::parse(postcode)?;

        let mut params = BTreeMap::from([
            ("Location".to_string(), postcode.as_str().to_string()),
            ("skip".to_string(), DEFAULT_SKIP.to_string()),
            ("take".to_string(), DEFAULT_TAKE.to_string()),
        ]);
        // Caller-supplied filters win on key collision.
        for (name, value) in filters {
            params.insert(name.clone(), value.clone());
        }

        let payload = self.cached_request("", &params).await?;
        let search: SearchResponse = serde_json::from_value(payload)
            .map_err(|error| DirectoryError::Decode(error.to_string()))?;

        let Some(item) = search.items.first() else {
            tracing::info!(postcode = %postcode.as_str(), "no member found for postcode");
            return Ok(None);
        };
        let Some(member) = &item.value else {
            return Err(DirectoryError::Decode(
                "first search item carries no member record".to_string(),
            )
            .into());
        };

        let id = member.id_text();
        let email = match &id {
            Some(id) => self.fetch_contact_email(id).await,
            None => String::new(),
        };

        Ok(Some(ResolvedMp {
            id: id.unwrap_or_default(),
            name: member.name_full_title.clone().unwrap_or_default(),
            constituency: member.constituency(),
            email,
        }))
    }

    /// Contact lookup for a member id; absorbs every failure.
    async fn fetch_contact_email(&self, member_id: &str) -> String {
        let endpoint = format!("{member_id}/Contact");
        let payload = match self.cached_request(&endpoint, &BTreeMap::new()).await {
            Ok(payload) => payload,
            Err(error) => {
                tracing::warn!(
                    %error,
                    member_id,
                    "contact lookup failed; returning member without email"
                );
                return String::new();
            }
        };

        match serde_json::from_value::<ContactResponse>(payload) {
            Ok(contact) => contact.first_email(),
            Err(error) => {
                tracing::warn!(%error, member_id, "contact payload malformed; ignoring it");
                String::new()
            }
        }
    }

    /// GET a directory endpoint through the cache.
    ///
    /// Cache failures are downgraded to misses; the request always proceeds.
    async fn cached_request(
        &self,
        endpoint: &str,
        params: &BTreeMap<String, String>,
    ) -> Result<serde_json::Value, DirectoryError> {
        let key = fingerprint(endpoint, params, Method::GET.as_str(), &self.search_url);

        if self.cache_enabled {
            match self.cache.get(&key) {
                Ok(Some(payload)) => {
                    tracing::debug!(endpoint, "directory cache hit");
                    return Ok(payload);
                }
                Ok(None) => {}
                Err(error) => {
                    tracing::debug!(%error, endpoint, "cache read failed; treating as miss");
                }
            }
        }

        let payload = self
            .client
            .request(endpoint, params, Method::GET, self.timeout)
            .await?;

        if self.cache_enabled {
            if let Err(error) = self.cache.set(&key, payload.clone(), self.cache_ttl_seconds) {
                tracing::debug!(%error, endpoint, "cache write failed; response not cached");
            }
        }

        Ok(payload)
    }
}
