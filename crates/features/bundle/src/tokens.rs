//! Placeholder tokens and how each one resolves.
//!
//! Every recognized `{{NAME}}` maps to one [`Rule`]; one generic pass applies the table to
//! any template.

use crate::model::{DEPLOY_TIME_EMAIL, Submission};
use crate::template::DocumentKind;
use std::borrow::Cow;

/// How a token obtains its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// `addon-<tenant>.<domain>`
    AddonHost,
    /// Supplied email, else the platform sentinel; the deploy-time literal in profiles of
    /// platforms that inject it.
    Email,
    OrganizationKey,
    /// Empty when absent.
    EnrollmentAuthToken,
    /// Empty when absent.
    EnrollmentEncryptionToken,
    TenantName,
    TopLevelDomain,
}

/// The recognized tokens. Names are case-sensitive.
pub const TOKENS: [(&str, Rule); 9] = [
    ("TENANT_HOST_NAME", Rule::AddonHost),
    ("ADDON_HOST", Rule::AddonHost),
    ("EMAIL", Rule::Email),
    ("ORGANIZATION_KEY", Rule::OrganizationKey),
    ("organizationKey", Rule::OrganizationKey),
    ("ENROLLMENT_AUTH_TOKEN", Rule::EnrollmentAuthToken),
    ("ENROLLMENT_ENCRYPTION_TOKEN", Rule::EnrollmentEncryptionToken),
    ("tenantName", Rule::TenantName),
    ("topLevelDomain", Rule::TopLevelDomain),
];

#[must_use]
pub fn lookup(name: &str) -> Option<Rule> {
    TOKENS.iter().find(|(token, _)| *token == name).map(|&(_, rule)| rule)
}

/// Token values of one submission, resolved once per request.
#[derive(Debug, Clone)]
pub struct Resolver<'a> {
    submission: &'a Submission,
    addon_host: String,
}

impl<'a> Resolver<'a> {
    #[must_use]
    pub fn new(submission: &'a Submission) -> Self {
        Self { submission, addon_host: submission.addon_host() }
    }

    #[must_use]
    pub fn addon_host(&self) -> &str {
        &self.addon_host
    }

    /// Raw value of `rule` for a document of `kind`.
    #[must_use]
    pub fn value(&self, rule: Rule, kind: DocumentKind) -> &str {
        let s = self.submission;
        match rule {
            Rule::AddonHost => &self.addon_host,
            Rule::Email if kind == DocumentKind::Profile && s.mdm_platform.injects_profile_email() => {
                DEPLOY_TIME_EMAIL
            },
            Rule::Email => s.email.as_deref().unwrap_or_else(|| s.mdm_platform.email_sentinel()),
            Rule::OrganizationKey => &s.organization_key,
            Rule::EnrollmentAuthToken => s.enrollment_auth_token.as_deref().unwrap_or_default(),
            Rule::EnrollmentEncryptionToken => {
                s.enrollment_encryption_token.as_deref().unwrap_or_default()
            },
            Rule::TenantName => &s.tenant_name,
            Rule::TopLevelDomain => <&'static str>::from(s.top_level_domain),
        }
    }

    /// Value of the token `name` as inserted into a document of `kind`, or `None` when the
    /// token is not recognized.
    #[must_use]
    pub fn resolve(&self, name: &str, kind: DocumentKind) -> Option<Cow<'_, str>> {
        let value = self.value(lookup(name)?, kind);
        Some(if kind.is_xml() { escape_xml(value) } else { Cow::Borrowed(value) })
    }
}

/// Replaces every recognized `{{NAME}}` in one left-to-right pass.
///
/// Inserted values are never rescanned. An unrecognized token is kept and scanning resumes
/// one character later, so `{{{EMAIL}}` still substitutes the inner token. An unterminated
/// `{{` is copied verbatim.
pub fn substitute<'v, F>(template: &str, mut resolve: F) -> String
where
    F: FnMut(&str) -> Option<Cow<'v, str>>,
{
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];

        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };

        if let Some(value) = resolve(&after[..end]) {
            out.push_str(&value);
            rest = &after[end + 2..];
        } else {
            out.push('{');
            rest = &rest[start + 1..];
        }
    }

    out.push_str(rest);
    out
}

fn escape_xml(value: &str) -> Cow<'_, str> {
    if !value.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(value);
    }

    let mut escaped = String::with_capacity(value.len() + 8);
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    Cow::Owned(escaped)
}
