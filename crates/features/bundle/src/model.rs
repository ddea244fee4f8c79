//! Wire request and its validated form.

use crate::error::BundleError;
use nsgen_derive::api_model;
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};
use validator::{Validate, ValidationErrors};

/// Email value of the profile document when the platform fills it in at deploy time.
pub const DEPLOY_TIME_EMAIL: &str = "{{mail}}";

/// One request field: Rust name, wire name and the checks the derive cannot express.
struct Field {
    name: &'static str,
    wire: &'static str,
    check: fn(&ConfigRequest) -> Result<(), BundleError>,
}

/// Request fields in form order; the first failing field is the one reported.
const FIELDS: [Field; 7] = [
    Field { name: "tenant_name", wire: "tenantName", check: |r| check_tenant(&r.tenant_name) },
    Field {
        name: "top_level_domain",
        wire: "topLevelDomain",
        check: |r| parse_domain(&r.top_level_domain).map(drop),
    },
    Field {
        name: "organization_key",
        wire: "organizationKey",
        check: |r| check_free_text("organizationKey", &r.organization_key),
    },
    Field {
        name: "enrollment_auth_token",
        wire: "enrollmentAuthToken",
        check: |r| check_optional("enrollmentAuthToken", r.enrollment_auth_token.as_deref()),
    },
    Field {
        name: "enrollment_encryption_token",
        wire: "enrollmentEncryptionToken",
        check: |r| {
            check_optional("enrollmentEncryptionToken", r.enrollment_encryption_token.as_deref())
        },
    },
    Field { name: "email", wire: "email", check: |r| check_optional("email", r.email.as_deref()) },
    Field {
        name: "mdm_platform",
        wire: "mdmPlatform",
        check: |r| parse_platform(&r.mdm_platform).map(drop),
    },
];

/// Form submission as sent by the web client.
///
/// Every field defaults so that a missing value surfaces as a field validation error
/// rather than a body decoding failure.
#[api_model(deny_unknown_fields = false)]
#[derive(Clone, Default, Validate)]
#[serde(default)]
pub struct ConfigRequest {
    /// Tenant name without domain, e.g. `acme`
    #[validate(length(min = 1, max = 63, message = "must be 1-63 characters"))]
    pub tenant_name: String,
    /// One of the Netskope top-level domains, e.g. `goskope.com`
    pub top_level_domain: String,
    #[validate(length(min = 1, message = "is required"))]
    pub organization_key: String,
    pub enrollment_auth_token: Option<String>,
    pub enrollment_encryption_token: Option<String>,
    /// User email. Besides being a valid address it must not contain `"`, `$`, `\`,
    /// backticks or `{{`/`}}`, since it is written into double-quoted shell assignments.
    #[validate(email(message = "is not a valid email address"))]
    pub email: Option<String>,
    /// Display name of the MDM platform, e.g. `Microsoft Intune`
    pub mdm_platform: String,
    pub is_multi_user: bool,
}

/// Netskope tenant domains.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, IntoStaticStr,
)]
pub enum TopLevelDomain {
    #[strum(serialize = "au.goskope.com")]
    Au,
    #[strum(serialize = "ca.goskope.com")]
    Ca,
    #[strum(serialize = "de.goskope.com")]
    De,
    #[strum(serialize = "eu.goskope.com")]
    Eu,
    #[strum(serialize = "eur.goskope.com")]
    Eur,
    #[strum(serialize = "fr.goskope.com")]
    Fr,
    #[strum(serialize = "goskope.com")]
    Global,
    #[strum(serialize = "in.goskope.com")]
    In,
    #[strum(serialize = "jp.goskope.com")]
    Jp,
    #[strum(serialize = "na-eur.goskope.com")]
    NaEur,
    #[strum(serialize = "na.goskope.com")]
    Na,
    #[strum(serialize = "uk.goskope.com")]
    Uk,
    #[strum(serialize = "us.goskope.com")]
    Us,
}

/// Supported MDM platforms, keyed by their display name.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, IntoStaticStr,
)]
pub enum MdmPlatform {
    #[strum(serialize = "Microsoft Intune")]
    MicrosoftIntune,
    #[strum(serialize = "Jamf Pro")]
    JamfPro,
    #[strum(serialize = "VMware Workspace ONE")]
    WorkspaceOne,
    #[strum(serialize = "Mosyle")]
    Mosyle,
}

impl MdmPlatform {
    /// The platform's own user-email variable, used when no email was supplied.
    #[must_use]
    pub const fn email_sentinel(self) -> &'static str {
        match self {
            Self::MicrosoftIntune => "{{mail}}",
            Self::JamfPro => "$EMAIL",
            Self::WorkspaceOne => "{EmailAddress}",
            Self::Mosyle => "%Email%",
        }
    }

    /// Platforms that inject the user email into the profile while deploying it.
    #[must_use]
    pub const fn injects_profile_email(self) -> bool {
        matches!(self, Self::MicrosoftIntune)
    }
}

/// A request that passed validation. Only submissions reach the renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub tenant_name: String,
    pub top_level_domain: TopLevelDomain,
    pub organization_key: String,
    pub enrollment_auth_token: Option<String>,
    pub enrollment_encryption_token: Option<String>,
    pub email: Option<String>,
    pub mdm_platform: MdmPlatform,
    pub is_multi_user: bool,
}

impl Submission {
    /// `addon-<tenant>.<domain>`
    #[must_use]
    pub fn addon_host(&self) -> String {
        format!("addon-{}.{}", self.tenant_name, self.top_level_domain)
    }
}

impl TryFrom<ConfigRequest> for Submission {
    type Error = BundleError;

    fn try_from(request: ConfigRequest) -> Result<Self, Self::Error> {
        let request = request.normalized();
        let derived = request.validate().err();

        for field in &FIELDS {
            if let Some(error) = derived.as_ref().and_then(|errors| field_violation(errors, field)) {
                return Err(error);
            }
            (field.check)(&request)?;
        }
        if let Some(errors) = derived {
            return Err(BundleError::validation("body", errors.to_string()));
        }

        let top_level_domain = parse_domain(&request.top_level_domain)?;
        let mdm_platform = parse_platform(&request.mdm_platform)?;

        Ok(Self {
            tenant_name: request.tenant_name,
            top_level_domain,
            organization_key: request.organization_key,
            enrollment_auth_token: request.enrollment_auth_token,
            enrollment_encryption_token: request.enrollment_encryption_token,
            email: request.email,
            mdm_platform,
            is_multi_user: request.is_multi_user,
        })
    }
}

impl ConfigRequest {
    /// Trims every string and drops blank optional values.
    fn normalized(self) -> Self {
        Self {
            tenant_name: self.tenant_name.trim().to_owned(),
            top_level_domain: self.top_level_domain.trim().to_owned(),
            organization_key: self.organization_key.trim().to_owned(),
            enrollment_auth_token: non_blank(self.enrollment_auth_token),
            enrollment_encryption_token: non_blank(self.enrollment_encryption_token),
            email: non_blank(self.email),
            mdm_platform: self.mdm_platform.trim().to_owned(),
            is_multi_user: self.is_multi_user,
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_owned()).filter(|v| !v.is_empty())
}

fn field_violation(errors: &ValidationErrors, field: &Field) -> Option<BundleError> {
    let error = errors.field_errors().get(field.name)?.first()?;
    let message = error.message.clone().unwrap_or_else(|| error.code.clone());
    Some(BundleError::validation(field.wire, message))
}

fn parse_domain(value: &str) -> Result<TopLevelDomain, BundleError> {
    value
        .parse()
        .map_err(|_| BundleError::validation("topLevelDomain", "is not a supported Netskope domain"))
}

fn parse_platform(value: &str) -> Result<MdmPlatform, BundleError> {
    value
        .parse()
        .map_err(|_| BundleError::validation("mdmPlatform", "is not a supported MDM platform"))
}

fn check_tenant(tenant: &str) -> Result<(), BundleError> {
    if tenant.contains('.') {
        return Err(BundleError::validation("tenantName", "must not contain '.'"));
    }
    if !tenant.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(BundleError::validation(
            "tenantName",
            "may only contain letters, digits and '-'",
        ));
    }
    Ok(())
}

fn check_optional(field: &'static str, value: Option<&str>) -> Result<(), BundleError> {
    value.map_or(Ok(()), |value| check_free_text(field, value))
}

/// Values end up inside double-quoted shell assignments and template text.
fn check_free_text(field: &'static str, value: &str) -> Result<(), BundleError> {
    if value.contains("{{") || value.contains("}}") {
        return Err(BundleError::validation(field, "must not contain '{{' or '}}'"));
    }
    if value.chars().any(|c| c.is_control() || matches!(c, '"' | '`' | '$' | '\\')) {
        return Err(BundleError::validation(
            field,
            "must not contain quotes, '$', '\\', backticks or control characters",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    fn request() -> ConfigRequest {
        ConfigRequest {
            tenant_name: " john ".to_owned(),
            top_level_domain: "goskope.com".to_owned(),
            organization_key: "abc123".to_owned(),
            mdm_platform: "Microsoft Intune".to_owned(),
            ..ConfigRequest::default()
        }
    }

    fn invalid_field(request: ConfigRequest) -> String {
        match Submission::try_from(request) {
            Err(BundleError::Validation { field, .. }) => field.into_owned(),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn valid_request_is_trimmed_and_typed() {
        let submission = Submission::try_from(ConfigRequest {
            email: Some("   ".to_owned()),
            enrollment_auth_token: Some(" tok ".to_owned()),
            ..request()
        })
        .unwrap();

        assert_eq!(submission.tenant_name, "john");
        assert_eq!(submission.top_level_domain, TopLevelDomain::Global);
        assert_eq!(submission.mdm_platform, MdmPlatform::MicrosoftIntune);
        assert_eq!(submission.email, None);
        assert_eq!(submission.enrollment_auth_token.as_deref(), Some("tok"));
        assert_eq!(submission.addon_host(), "addon-john.goskope.com");
    }

    #[test]
    fn dotted_tenant_is_rejected() {
        let err = Submission::try_from(ConfigRequest {
            tenant_name: "john.doe".to_owned(),
            ..request()
        })
        .unwrap_err();
        assert!(err.to_string().contains("must not contain '.'"), "{err}");
    }

    #[test]
    fn offending_field_is_named() {
        assert_eq!(invalid_field(ConfigRequest { tenant_name: "  ".to_owned(), ..request() }), "tenantName");
        assert_eq!(
            invalid_field(ConfigRequest { organization_key: String::new(), ..request() }),
            "organizationKey"
        );
        assert_eq!(
            invalid_field(ConfigRequest { email: Some("not-an-email".to_owned()), ..request() }),
            "email"
        );
        assert_eq!(
            invalid_field(ConfigRequest { top_level_domain: "example.com".to_owned(), ..request() }),
            "topLevelDomain"
        );
        assert_eq!(
            invalid_field(ConfigRequest { mdm_platform: "Kandji".to_owned(), ..request() }),
            "mdmPlatform"
        );
    }

    #[test]
    fn first_field_in_form_order_wins() {
        let field = invalid_field(ConfigRequest {
            tenant_name: String::new(),
            organization_key: String::new(),
            ..request()
        });
        assert_eq!(field, "tenantName");
    }

    #[test]
    fn errors_follow_form_order_across_checks() {
        let field = invalid_field(ConfigRequest {
            top_level_domain: "example.com".to_owned(),
            organization_key: "{{EMAIL}}".to_owned(),
            ..request()
        });
        assert_eq!(field, "topLevelDomain");

        let field = invalid_field(ConfigRequest {
            top_level_domain: "example.com".to_owned(),
            email: Some("not-an-email".to_owned()),
            ..request()
        });
        assert_eq!(field, "topLevelDomain");

        let field = invalid_field(ConfigRequest {
            email: Some("a$b@example.com".to_owned()),
            mdm_platform: "Kandji".to_owned(),
            ..request()
        });
        assert_eq!(field, "email");
    }

    #[test]
    fn template_and_shell_syntax_is_rejected() {
        assert_eq!(
            invalid_field(ConfigRequest { organization_key: "{{EMAIL}}".to_owned(), ..request() }),
            "organizationKey"
        );
        assert_eq!(
            invalid_field(ConfigRequest {
                enrollment_encryption_token: Some("a\"; rm -rf /".to_owned()),
                ..request()
            }),
            "enrollmentEncryptionToken"
        );
    }

    #[test]
    fn enumerations_round_trip_their_wire_names() {
        assert_eq!(TopLevelDomain::iter().count(), 13);
        for domain in TopLevelDomain::iter() {
            assert_eq!(domain.to_string().parse::<TopLevelDomain>().unwrap(), domain);
        }
        for platform in MdmPlatform::iter() {
            assert_eq!(platform.to_string().parse::<MdmPlatform>().unwrap(), platform);
        }
    }

    #[test]
    fn only_intune_injects_profile_email() {
        let injecting: Vec<_> = MdmPlatform::iter().filter(|p| p.injects_profile_email()).collect();
        assert_eq!(injecting, [MdmPlatform::MicrosoftIntune]);
        assert_eq!(MdmPlatform::MicrosoftIntune.email_sentinel(), DEPLOY_TIME_EMAIL);
    }
}
