//! Placeholder substitution for the email draft templates.
//!
//! Recognized tokens live in one table mapping each token to a resolver
//! function, so adding a token is a data change. Substitution is a single
//! literal pass: a token injected by an earlier replacement is never
//! re-scanned. The bracketed identity tokens stay in the output verbatim
//! when the user left the matching field blank, so the draft remains
//! self-editable.

/// Values available to the template tokens for one render.
#[derive(Debug, Clone, Default)]
pub struct RenderContext {
    pub mp_name: String,
    /// Display-form postcode; rendered uppercase by the `{POSTCODE}` token.
    pub postcode: String,
    pub mp_email: String,
    pub location: String,
    /// User-supplied name; empty leaves the `[Your name]` tokens in place.
    pub user_name: String,
    /// User-supplied email; empty leaves the `[Your email]` tokens in place.
    pub user_email: String,
}

type TokenResolver = fn(&RenderContext) -> String;

fn user_value_or_literal(value: &str, literal: &str) -> String {
    if value.is_empty() {
        literal.to_string()
    } else {
        value.to_string()
    }
}

/// Recognized placeholder tokens, matched case-sensitively.
///
/// Both capitalizations of the bracketed identity tokens are registered
/// separately; there is no generic case-insensitive matching.
const TOKENS: &[(&str, TokenResolver)] = &[
    ("{MP_NAME}", |ctx| ctx.mp_name.clone()),
    ("{POSTCODE}", |ctx| ctx.postcode.to_uppercase()),
    ("{MP_EMAIL}", |ctx| ctx.mp_email.clone()),
    ("{LOCATION}", |ctx| ctx.location.clone()),
    ("[Your name]", |ctx| {
        user_value_or_literal(&ctx.user_name, "[Your name]")
    }),
    ("[Your Name]", |ctx| {
        user_value_or_literal(&ctx.user_name, "[Your Name]")
    }),
    ("[Your email]", |ctx| {
        user_value_or_literal(&ctx.user_email, "[Your email]")
    }),
    ("[Your Email]", |ctx| {
        user_value_or_literal(&ctx.user_email, "[Your Email]")
    }),
];

/// Substitute every recognized token in `template` from `ctx`.
#[must_use]
pub fn render(template: &str, ctx: &RenderContext) -> String {
    let mut rendered = template.to_string();
    for (token, resolve) in TOKENS {
        if rendered.contains(token) {
            rendered = rendered.replace(token, &resolve(ctx));
        }
    }
    rendered
}

/// Subject used when the configured subject template renders to nothing.
#[must_use]
pub fn default_subject(location: &str) -> String {
    format!(
        "Correspondence from your constituent in {}",
        location.to_uppercase()
    )
}

/// The configured subject and body templates, applied per request.
#[derive(Debug, Clone)]
pub struct TemplateEngine {
    subject: String,
    body: String,
}

impl TemplateEngine {
    pub fn new(subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            body: body.into(),
        }
    }

    /// Render the subject template; the empty-subject fallback is the
    /// caller's decision.
    #[must_use]
    pub fn render_subject(&self, ctx: &RenderContext) -> String {
        render(&self.subject, ctx)
    }

    #[must_use]
    pub fn render_body(&self, ctx: &RenderContext) -> String {
        render(&self.body, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> RenderContext {
        RenderContext {
            mp_name: "Ms Jane Doe MP".to_string(),
            postcode: "Sw1a 1aa".to_string(),
            mp_email: "jane.doe.mp@parliament.uk".to_string(),
            location: "Holborn and St Pancras".to_string(),
            user_name: String::new(),
            user_email: String::new(),
        }
    }

    #[test]
    fn substitutes_member_tokens() {
        let rendered = render("Dear {MP_NAME}, member for {LOCATION} ({MP_EMAIL})", &ctx());
        assert_eq!(
            rendered,
            "Dear Ms Jane Doe MP, member for Holborn and St Pancras (jane.doe.mp@parliament.uk)"
        );
    }

    #[test]
    fn postcode_token_renders_uppercase() {
        assert_eq!(render("{POSTCODE}", &ctx()), "SW1A 1AA");
    }

    #[test]
    fn identity_tokens_stay_literal_when_user_fields_are_empty() {
        let rendered = render("Sincerely,\n[Your name]\n[Your email]", &ctx());
        assert_eq!(rendered, "Sincerely,\n[Your name]\n[Your email]");
    }

    #[test]
    fn identity_tokens_replace_both_capitalizations() {
        let mut context = ctx();
        context.user_name = "Sam Smith".to_string();
        context.user_email = "sam@example.org".to_string();
        let rendered = render(
            "[Your name] / [Your Name] / [Your email] / [Your Email]",
            &context,
        );
        assert_eq!(
            rendered,
            "Sam Smith / Sam Smith / sam@example.org / sam@example.org"
        );
    }

    #[test]
    fn substitution_is_not_recursive() {
        // A token spelled inside a user-supplied value is processed after
        // the member tokens and therefore stays literal.
        let mut context = ctx();
        context.user_name = "{MP_NAME}".to_string();
        assert_eq!(render("[Your name]", &context), "{MP_NAME}");
    }

    #[test]
    fn unknown_tokens_pass_through() {
        assert_eq!(render("{UNKNOWN} stays", &ctx()), "{UNKNOWN} stays");
    }

    #[test]
    fn default_subject_uppercases_location() {
        assert_eq!(
            default_subject("Holborn and St Pancras"),
            "Correspondence from your constituent in HOLBORN AND ST PANCRAS"
        );
    }

    #[test]
    fn engine_renders_configured_templates() {
        let engine = TemplateEngine::new("About {LOCATION}", "Dear {MP_NAME},");
        assert_eq!(
            engine.render_subject(&ctx()),
            "About Holborn and St Pancras"
        );
        assert_eq!(engine.render_body(&ctx()), "Dear Ms Jane Doe MP,");
    }

    #[test]
    fn empty_templates_render_empty() {
        let engine = TemplateEngine::new("", "");
        assert_eq!(engine.render_subject(&ctx()), "");
        assert_eq!(engine.render_body(&ctx()), "");
    }
}
