//! Template documents and the layouts that name them.

use crate::error::{BundleError, BundleErrorExt};
use nsgen_domain::config::BundleLayout;
use std::path::Path;
use tokio::fs;
use tracing::debug;

pub const PLIST_TEMPLATE: &str = "com.netskope.client.Netskope-Client.plist";
pub const MOBILECONFIG_TEMPLATE: &str = "NetskopeClient.mobileconfig";
pub const PRE_INSTALL_TEMPLATE: &str = "pre-install.sh";
pub const POST_INSTALL_TEMPLATE: &str = "post-install.sh";

/// Role of a document inside the bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    /// Property list or configuration profile (XML).
    Profile,
    PreInstall,
    PostInstall,
}

impl DocumentKind {
    /// Unix permissions of the archive entry.
    #[must_use]
    pub const fn unix_mode(self) -> u32 {
        match self {
            Self::Profile => 0o644,
            Self::PreInstall | Self::PostInstall => 0o755,
        }
    }

    /// Whether substituted values must be XML-escaped.
    #[must_use]
    pub const fn is_xml(self) -> bool {
        matches!(self, Self::Profile)
    }
}

/// Where a document comes from and what it is called in the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutEntry {
    pub kind: DocumentKind,
    /// File name inside the templates directory.
    pub source: &'static str,
    /// Entry name inside the archive.
    pub entry: &'static str,
}

/// Entries of a layout in archive order: profile, pre-install, post-install.
#[must_use]
pub const fn layout_entries(layout: BundleLayout) -> [LayoutEntry; 3] {
    let (profile_source, pre_entry, post_entry) = match layout {
        BundleLayout::Plist => (PLIST_TEMPLATE, PRE_INSTALL_TEMPLATE, POST_INSTALL_TEMPLATE),
        BundleLayout::Mobileconfig => {
            (MOBILECONFIG_TEMPLATE, PRE_INSTALL_TEMPLATE, POST_INSTALL_TEMPLATE)
        },
        BundleLayout::IntuneLegacy => {
            (PLIST_TEMPLATE, "intune-preinstall.sh", "intune-postinstall.sh")
        },
    };

    [
        LayoutEntry { kind: DocumentKind::Profile, source: profile_source, entry: profile_source },
        LayoutEntry { kind: DocumentKind::PreInstall, source: PRE_INSTALL_TEMPLATE, entry: pre_entry },
        LayoutEntry {
            kind: DocumentKind::PostInstall,
            source: POST_INSTALL_TEMPLATE,
            entry: post_entry,
        },
    ]
}

/// Raw template text bound to its archive entry. Never modified after loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateDocument {
    kind: DocumentKind,
    entry_name: String,
    text: String,
}

impl TemplateDocument {
    pub fn new(kind: DocumentKind, entry_name: impl Into<String>, text: impl Into<String>) -> Self {
        Self { kind, entry_name: entry_name.into(), text: text.into() }
    }

    #[must_use]
    pub const fn kind(&self) -> DocumentKind {
        self.kind
    }

    #[must_use]
    pub fn entry_name(&self) -> &str {
        &self.entry_name
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// The ordered documents of one layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSet {
    documents: Vec<TemplateDocument>,
}

impl TemplateSet {
    #[must_use]
    pub const fn new(documents: Vec<TemplateDocument>) -> Self {
        Self { documents }
    }

    /// Reads the layout's templates from `dir`.
    ///
    /// # Errors
    /// Returns [`BundleError::Archive`] if a template is missing or unreadable, or
    /// [`BundleError::ConfigConsistency`] if it is not UTF-8.
    pub async fn load(dir: &Path, layout: BundleLayout) -> Result<Self, BundleError> {
        let mut documents = Vec::with_capacity(3);

        for entry in layout_entries(layout) {
            let path = dir.join(entry.source);
            let bytes = fs::read(&path)
                .await
                .context(format!("Failed to read template {}", path.display()))?;
            let text = String::from_utf8(bytes).map_err(|_| BundleError::ConfigConsistency {
                message: "template is not valid UTF-8".into(),
                context: Some(path.display().to_string().into()),
            })?;
            documents.push(TemplateDocument::new(entry.kind, entry.entry, text));
        }

        debug!(layout = layout.as_str(), dir = %dir.display(), "Templates loaded");
        Ok(Self { documents })
    }

    #[must_use]
    pub fn documents(&self) -> &[TemplateDocument] {
        &self.documents
    }
}
