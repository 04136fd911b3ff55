//! Response cache with TTL expiry and deterministic request fingerprints.
//!
//! Cached payloads are keyed by a fingerprint of the request that produced
//! them, so identical requests always map to the same entry. Expiry is
//! checked at read time; the background sweep only reclaims storage.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, TimeDelta, Utc};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Errors from the cache backend.
///
/// Callers must treat any cache error as a miss; the cache never blocks a
/// request from proceeding.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),
}

/// Key/value store with per-entry TTL.
pub trait CacheStore: Send + Sync {
    /// Fetch a payload; entries past their expiry read as absent.
    ///
    /// # Errors
    /// Returns [`CacheError::Unavailable`] when the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<serde_json::Value>, CacheError>;

    /// Store a payload, replacing any existing entry for the key.
    ///
    /// # Errors
    /// Returns [`CacheError::Unavailable`] when the backend cannot be written.
    fn set(&self, key: &str, payload: serde_json::Value, ttl_seconds: u64)
        -> Result<(), CacheError>;

    /// Remove one entry.
    ///
    /// # Errors
    /// Returns [`CacheError::Unavailable`] when the backend cannot be written.
    fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Remove every entry.
    ///
    /// # Errors
    /// Returns [`CacheError::Unavailable`] when the backend cannot be written.
    fn clear_all(&self) -> Result<(), CacheError>;

    /// Remove entries already past their expiry; returns the purge count.
    ///
    /// # Errors
    /// Returns [`CacheError::Unavailable`] when the backend cannot be written.
    fn clear_expired(&self) -> Result<usize, CacheError>;
}

#[derive(Debug, Clone)]
struct CacheEntry {
    payload: serde_json::Value,
    expires_at: DateTime<Utc>,
}

/// Cache occupancy counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub total: usize,
    pub active: usize,
    pub expired: usize,
}

/// In-process [`CacheStore`] over a `RwLock`-guarded map.
///
/// Concurrent readers and writers are safe; writes to the same key are
/// last-write-wins, which is acceptable because keys are content-addressed.
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl MemoryCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Occupancy counters, split by expiry state.
    ///
    /// # Errors
    /// Returns [`CacheError::Unavailable`] when the backend cannot be read.
    pub fn stats(&self) -> Result<CacheStats, CacheError> {
        let entries = self
            .entries
            .read()
            .map_err(|_| CacheError::Unavailable("cache lock poisoned".to_string()))?;
        let now = Utc::now();
        let expired = entries.values().filter(|e| e.expires_at <= now).count();
        Ok(CacheStats {
            total: entries.len(),
            active: entries.len() - expired,
            expired,
        })
    }
}

fn expiry_from_ttl(ttl_seconds: u64) -> DateTime<Utc> {
    let ttl = i64::try_from(ttl_seconds).unwrap_or(i64::MAX);
    let delta = TimeDelta::try_seconds(ttl).unwrap_or(TimeDelta::MAX);
    Utc::now()
        .checked_add_signed(delta)
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

fn poisoned() -> CacheError {
    CacheError::Unavailable("cache lock poisoned".to_string())
}

impl CacheStore for MemoryCache {
    fn get(&self, key: &str) -> Result<Option<serde_json::Value>, CacheError> {
        let entries = self.entries.read().map_err(|_| poisoned())?;
        // Read-time expiry: a stale entry is absent even before any sweep.
        Ok(entries
            .get(key)
            .filter(|entry| entry.expires_at > Utc::now())
            .map(|entry| entry.payload.clone()))
    }

    fn set(
        &self,
        key: &str,
        payload: serde_json::Value,
        ttl_seconds: u64,
    ) -> Result<(), CacheError> {
        let entry = CacheEntry {
            payload,
            expires_at: expiry_from_ttl(ttl_seconds),
        };
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        entries.insert(key.to_string(), entry);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        entries.remove(key);
        Ok(())
    }

    fn clear_all(&self) -> Result<(), CacheError> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        entries.clear();
        Ok(())
    }

    fn clear_expired(&self) -> Result<usize, CacheError> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        let now = Utc::now();
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        Ok(before - entries.len())
    }
}

/// Deterministic cache key for a directory request.
///
/// Hashes the (endpoint, method, base URL, parameters) tuple with SHA-256.
/// Parameters arrive in a `BTreeMap`, so two maps with the same pairs hash
/// identically regardless of how they were built. Fields are separated by a
/// NUL byte to keep the digest unambiguous.
#[must_use]
pub fn fingerprint(
    endpoint: &str,
    params: &BTreeMap<String, String>,
    method: &str,
    base_url: &str,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(endpoint.as_bytes());
    hasher.update([0]);
    hasher.update(method.as_bytes());
    hasher.update([0]);
    hasher.update(base_url.as_bytes());
    for (name, value) in params {
        hasher.update([0]);
        hasher.update(name.as_bytes());
        hasher.update([0]);
        hasher.update(value.as_bytes());
    }
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}
