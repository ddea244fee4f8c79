//! Turns a submission and its templates into the documents of one bundle.

use crate::error::BundleError;
use crate::model::Submission;
use crate::template::{DocumentKind, TemplateSet};
use crate::tokens::{Resolver, substitute};
use nsgen_domain::constants::ADDON_HOST_PREFIX;
use serde_json::json;

/// Shell variable toggled by the multi-user block.
pub const MULTI_USER_FLAG: &str = "MULTI_USER_MODE";
/// File the multi-user block writes into the console user's Netskope directory.
pub const USER_CONFIG_FILE: &str = "nsuserconfig.json";
const HEREDOC_MARKER: &str = "NSGEN_EOF";

/// One rendered archive entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    pub kind: DocumentKind,
    pub entry_name: String,
    pub content: Vec<u8>,
}

/// Rendered documents in archive order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedBundle {
    documents: Vec<RenderedDocument>,
}

impl RenderedBundle {
    #[must_use]
    pub fn documents(&self) -> &[RenderedDocument] {
        &self.documents
    }

    pub fn entry_names(&self) -> impl Iterator<Item = &str> {
        self.documents.iter().map(|doc| doc.entry_name.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// The first document of `kind`, if the layout has one.
    #[must_use]
    pub fn document(&self, kind: DocumentKind) -> Option<&RenderedDocument> {
        self.documents.iter().find(|doc| doc.kind == kind)
    }
}

/// Renders every template for `submission`.
///
/// Pure: the same inputs always produce byte-identical output.
///
/// # Errors
/// Returns [`BundleError::ConfigConsistency`] if the multi-user block cannot be built.
pub fn render(submission: &Submission, templates: &TemplateSet) -> Result<RenderedBundle, BundleError> {
    let resolver = Resolver::new(submission);

    let documents = templates
        .documents()
        .iter()
        .map(|template| {
            let kind = template.kind();
            let mut text = substitute(template.text(), |name| resolver.resolve(name, kind));

            if kind == DocumentKind::PreInstall {
                let block = multi_user_block(submission, resolver.addon_host())?;
                text = insert_before_final_line(&text, &block);
            }

            Ok(RenderedDocument {
                kind,
                entry_name: template.entry_name().to_owned(),
                content: text.into_bytes(),
            })
        })
        .collect::<Result<Vec<_>, BundleError>>()?;

    Ok(RenderedBundle { documents })
}

/// Shell snippet injected into the pre-install script.
///
/// Disabled mode is a single flag assignment. Enabled mode recomputes the host in shell,
/// aborts with exit 1 unless it starts with `addon-`, writes the per-user descriptor and
/// exits 0 before the rest of the script runs.
fn multi_user_block(submission: &Submission, addon_host: &str) -> Result<String, BundleError> {
    if !submission.is_multi_user {
        return Ok(format!("{MULTI_USER_FLAG}=\"disabled\"\n"));
    }

    if !addon_host.starts_with(ADDON_HOST_PREFIX) {
        return Err(BundleError::ConfigConsistency {
            message: format!("addon host must start with '{ADDON_HOST_PREFIX}'").into(),
            context: Some(addon_host.to_owned().into()),
        });
    }

    let descriptor = serde_json::to_string_pretty(&json!({
        "organizationKey": submission.organization_key,
        "addonHost": addon_host,
    }))
    .map_err(|e| BundleError::Internal { message: e.to_string().into(), context: None })?;

    let tenant = shell_quote(&submission.tenant_name);
    let domain = shell_quote(&submission.top_level_domain.to_string());

    Ok(format!(
        r##"# Multi-user enrollment
{MULTI_USER_FLAG}="enabled"
MU_TENANT_NAME={tenant}
MU_TOP_LEVEL_DOMAIN={domain}
MU_ADDON_HOST="{ADDON_HOST_PREFIX}${{MU_TENANT_NAME}}.${{MU_TOP_LEVEL_DOMAIN}}"
case "$MU_ADDON_HOST" in
  {ADDON_HOST_PREFIX}*) ;;
  *)
    echo "Invalid addon host: $MU_ADDON_HOST" >&2
    exit 1
    ;;
esac
MU_CONSOLE_USER="$(stat -f%Su /dev/console)"
MU_CONFIG_DIR="/Users/${{MU_CONSOLE_USER}}/Library/Application Support/Netskope/STAgent"
mkdir -p "$MU_CONFIG_DIR"
cat > "${{MU_CONFIG_DIR}}/{USER_CONFIG_FILE}" <<'{HEREDOC_MARKER}'
{descriptor}
{HEREDOC_MARKER}
exit 0
"##
    ))
}

/// Inserts `block` as whole lines right before the last non-blank line of `script`.
fn insert_before_final_line(script: &str, block: &str) -> String {
    let content_end = script.trim_end().len();
    let line_start = script[..content_end].rfind('\n').map_or(0, |i| i + 1);

    let mut out = String::with_capacity(script.len() + block.len() + 1);
    out.push_str(&script[..line_start]);
    out.push_str(block);
    if !block.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(&script[line_start..]);
    out
}

/// Single-quotes a value for POSIX shells.
fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MdmPlatform, TopLevelDomain};

    fn submission(is_multi_user: bool) -> Submission {
        Submission {
            tenant_name: "john".to_owned(),
            top_level_domain: TopLevelDomain::Global,
            organization_key: "abc123".to_owned(),
            enrollment_auth_token: None,
            enrollment_encryption_token: None,
            email: None,
            mdm_platform: MdmPlatform::JamfPro,
            is_multi_user,
        }
    }

    #[test]
    fn block_goes_before_last_non_blank_line() {
        let out = insert_before_final_line("#!/bin/sh\necho hi\nexit 0\n\n", "BLOCK\n");
        assert_eq!(out, "#!/bin/sh\necho hi\nBLOCK\nexit 0\n\n");
    }

    #[test]
    fn single_line_script_gets_block_first() {
        assert_eq!(insert_before_final_line("exit 0", "X"), "X\nexit 0");
        assert_eq!(insert_before_final_line("", "X\n"), "X\n");
    }

    #[test]
    fn disabled_block_is_one_flag() {
        let block = multi_user_block(&submission(false), "addon-john.goskope.com").unwrap();
        assert_eq!(block, "MULTI_USER_MODE=\"disabled\"\n");
    }

    #[test]
    fn enabled_block_checks_prefix_and_writes_descriptor() {
        let block = multi_user_block(&submission(true), "addon-john.goskope.com").unwrap();

        assert!(block.contains("MULTI_USER_MODE=\"enabled\""));
        assert!(block.contains("MU_TENANT_NAME='john'"));
        assert!(block.contains("  addon-*) ;;"));
        assert!(block.contains("exit 1"));
        assert!(block.contains("\"organizationKey\": \"abc123\""));
        assert!(block.contains("\"addonHost\": \"addon-john.goskope.com\""));
        assert!(block.trim_end().ends_with("exit 0"));
    }

    #[test]
    fn host_without_prefix_is_a_consistency_error() {
        let err = multi_user_block(&submission(true), "john.goskope.com").unwrap_err();
        assert!(matches!(err, BundleError::ConfigConsistency { .. }));
    }

    #[test]
    fn shell_quote_escapes_single_quotes() {
        assert_eq!(shell_quote("o'neil"), r"'o'\''neil'");
    }
}
