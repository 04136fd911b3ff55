//! Serde views over Parliament members directory payloads.
//!
//! The directory client returns raw JSON; these types are how the resolver
//! reads it. Every upstream field is optional — the live API omits fields
//! freely, and a missing display field must never fail a resolution.

use serde::Deserialize;
use serde_json::Value;

/// Location search response: `{ "items": [ { "value": { ... } } ] }`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub items: Vec<SearchItem>,
}

/// One search hit wrapping the member record.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchItem {
    #[serde(default)]
    pub value: Option<MemberValue>,
}

/// The member record inside a search hit.
#[derive(Debug, Clone, Deserialize)]
pub struct MemberValue {
    /// Member id; the live API sends a number, older payloads a string.
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default, rename = "nameFullTitle")]
    pub name_full_title: Option<String>,
    #[serde(default, rename = "latestHouseMembership")]
    pub latest_house_membership: Option<HouseMembership>,
}

impl MemberValue {
    /// Member id rendered as URL text, when present and non-empty.
    #[must_use]
    pub fn id_text(&self) -> Option<String> {
        match self.id.as_ref()? {
            Value::Number(n) => Some(n.to_string()),
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            _ => None,
        }
    }

    /// Constituency name, preferring the display variant.
    #[must_use]
    pub fn constituency(&self) -> String {
        let Some(membership) = &self.latest_house_membership else {
            return String::new();
        };
        membership
            .membership_from_name
            .clone()
            .filter(|name| !name.is_empty())
            .or_else(|| membership.membership_from.clone())
            .unwrap_or_default()
    }
}

/// Current house membership of a member; carries the constituency.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HouseMembership {
    #[serde(default, rename = "membershipFromName")]
    pub membership_from_name: Option<String>,
    #[serde(default, rename = "membershipFrom")]
    pub membership_from: Option<String>,
}

/// Contact lookup response: `{ "value": [ { "email": ... }, ... ] }`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactResponse {
    #[serde(default)]
    pub value: Vec<ContactEntry>,
}

/// One published contact channel.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactEntry {
    #[serde(default)]
    pub email: Option<String>,
}

impl ContactResponse {
    /// Email of the first published contact entry, empty when none.
    #[must_use]
    pub fn first_email(&self) -> String {
        self.value
            .first()
            .and_then(|entry| entry.email.clone())
            .unwrap_or_default()
    }
}

/// A fully resolved member: search fields plus the contact email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMp {
    pub id: String,
    pub name: String,
    pub constituency: String,
    pub email: String,
}
