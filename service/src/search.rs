//! The externally-facing search operation.
//!
//! Validates input, resolves the member, renders the draft, and packages
//! everything the UI layer needs, including the `mailto:` link.

use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use mpm_postcode::Postcode;

use crate::directory::{DirectoryError, MpResolver, ResolveError, ResolvedMp};
use crate::template::{default_subject, RenderContext, TemplateEngine};

/// Errors surfaced to the UI layer.
///
/// Every variant carries a message fit for end users; internals stay in the
/// logs.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("UK postcode is required.")]
    MissingPostcode,

    #[error("Please enter a valid UK postcode.")]
    InvalidPostcode,

    #[error("could not resolve member: {0}")]
    Upstream(DirectoryError),
}

impl SearchError {
    /// User-displayable description; never includes response bodies.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::MissingPostcode => "UK postcode is required.".to_string(),
            Self::InvalidPostcode => "Please enter a valid UK postcode.".to_string(),
            Self::Upstream(DirectoryError::Http { status }) => {
                format!("The Parliament members directory returned error code {status}.")
            }
            Self::Upstream(_) => {
                "Could not reach the Parliament members directory. Please try again later."
                    .to_string()
            }
        }
    }
}

/// Member summary included in a successful outcome.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MemberSummary {
    pub id: String,
    pub name: String,
    /// Constituency name; empty when the directory omitted it.
    pub location: String,
    /// Published contact email; empty when none is available.
    pub email: String,
}

/// Result of one search, serialized to the UI layer as-is.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchOutcome {
    /// Whether a member was found for the postcode.
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member: Option<MemberSummary>,
    /// Display-form postcode echoed back on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postcode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// `mailto:` link; absent when the member has no published email.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mail_url: Option<String>,
    /// User-facing explanation for a not-found outcome.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SearchOutcome {
    fn not_found(postcode: &Postcode) -> Self {
        Self {
            found: false,
            member: None,
            postcode: None,
            subject: None,
            body: None,
            mail_url: None,
            message: Some(format!(
                "No MP found for postcode {}. Please check your postcode and try again.",
                postcode.display()
            )),
        }
    }
}

/// The sole entry point the UI layer calls.
///
/// Owns its collaborators; idempotent apart from cache writes performed
/// transitively by the resolver.
pub struct SearchOrchestrator {
    resolver: MpResolver,
    templates: TemplateEngine,
}

impl SearchOrchestrator {
    pub fn new(resolver: MpResolver, templates: TemplateEngine) -> Self {
        Self {
            resolver,
            templates,
        }
    }

    /// Resolve a postcode and draft the email.
    ///
    /// `user_name` and `user_email` may be empty; the matching template
    /// tokens then stay literal so the user can fill them in later.
    ///
    /// # Errors
    ///
    /// [`SearchError`] for missing or malformed postcodes and for upstream
    /// search failures. A postcode with no member is a `found = false`
    /// outcome, not an error.
    pub async fn search(
        &self,
        postcode: &str,
        user_name: &str,
        user_email: &str,
    ) -> Result<SearchOutcome, SearchError> {
        if postcode.trim().is_empty() {
            return Err(SearchError::MissingPostcode);
        }
        let postcode = Postcode::parse(postcode).map_err(|_| SearchError::InvalidPostcode)?;

        let resolved = self
            .resolver
            .resolve_by_postcode(postcode.as_str(), &BTreeMap::new())
            .await
            .map_err(|error| match error {
                ResolveError::InvalidPostcode(_) => SearchError::InvalidPostcode,
                ResolveError::Directory(directory) => SearchError::Upstream(directory),
            })?;

        let Some(member) = resolved else {
            return Ok(SearchOutcome::not_found(&postcode));
        };

        Ok(self.draft(&postcode, member, user_name, user_email))
    }

    fn draft(
        &self,
        postcode: &Postcode,
        member: ResolvedMp,
        user_name: &str,
        user_email: &str,
    ) -> SearchOutcome {
        let ctx = RenderContext {
            mp_name: member.name.clone(),
            postcode: postcode.display(),
            mp_email: member.email.clone(),
            location: member.constituency.clone(),
            user_name: user_name.to_string(),
            user_email: user_email.to_string(),
        };

        let body = self.templates.render_body(&ctx);
        let mut subject = self.templates.render_subject(&ctx);
        if subject.is_empty() {
            subject = default_subject(&ctx.location);
        }

        let mail_url = (!member.email.is_empty()).then(|| build_mailto(&member.email, &subject, &body));

        SearchOutcome {
            found: true,
            member: Some(MemberSummary {
                id: member.id,
                name: member.name,
                location: member.constituency,
                email: member.email,
            }),
            postcode: Some(postcode.display()),
            subject: Some(subject),
            body: Some(body),
            mail_url,
            message: None,
        }
    }
}

/// Build the `mailto:` link with percent-encoded components.
///
/// An empty body (no configured template) degrades to a bare address link.
fn build_mailto(email: &str, subject: &str, body: &str) -> String {
    if body.is_empty() {
        return format!("mailto:{}", urlencoding::encode(email));
    }
    format!(
        "mailto:{}?subject={}&body={}",
        urlencoding::encode(email),
        urlencoding::encode(subject),
        urlencoding::encode(body)
    )
}
