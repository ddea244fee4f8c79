//! Bundle feature slice.
//!
//! Renders the Netskope client templates for one form submission and packages them as a
//! zip archive, delivered either directly or through a short-lived download token.
//!
//! Pipeline: [`ConfigRequest`] → [`Submission`] → [`TemplateSet`] → [`RenderedBundle`] →
//! archive bytes (→ [`DownloadTicket`]).

pub mod archive;
pub mod downloads;
mod error;
pub mod model;
pub mod renderer;
#[cfg(feature = "server")]
pub mod server;
mod service;
pub mod template;
pub mod tokens;

pub use crate::downloads::{DownloadHandle, DownloadStore, MemoryDownloadStore};
pub use crate::error::{BundleError, BundleErrorExt};
pub use crate::model::{ConfigRequest, MdmPlatform, Submission, TopLevelDomain};
pub use crate::renderer::{RenderedBundle, RenderedDocument};
pub use crate::service::DownloadTicket;
pub use crate::template::{DocumentKind, TemplateDocument, TemplateSet};

use nsgen_domain::config::BundleConfig;
use nsgen_kernel::domain::registry::InitializedSlice;
use nsgen_storage::Storage;
use std::sync::Arc;

/// Bundle feature state.
#[nsgen_derive::nsgen_slice]
pub struct Bundle {
    config: BundleConfig,
    storage: Storage,
    downloads: Arc<dyn DownloadStore>,
}

/// Initialize the bundle feature with an in-process download registry.
///
/// # Errors
/// Returns [`BundleError::ConfigConsistency`] if the bundle configuration is unusable.
pub fn init(config: &BundleConfig, storage: Storage) -> Result<InitializedSlice, BundleError> {
    let slice = Bundle::open(config.clone(), storage, Arc::new(MemoryDownloadStore::new()))?;

    tracing::info!(
        layout = config.layout.as_str(),
        templates = %config.templates_dir.display(),
        ttl_seconds = config.download_ttl_seconds,
        "Bundle slice initialized"
    );

    Ok(InitializedSlice::new(slice))
}
