#![allow(dead_code, unreachable_pub)]

use nsgen_bundle::{Bundle, ConfigRequest, DownloadStore, MemoryDownloadStore};
use nsgen_domain::config::{BundleConfig, BundleLayout};
use nsgen_storage::Storage;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

/// The templates shipped at the workspace root.
pub fn templates_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../../templates")
}

pub fn intune_request() -> ConfigRequest {
    ConfigRequest {
        tenant_name: "john".to_owned(),
        top_level_domain: "goskope.com".to_owned(),
        organization_key: "abc123".to_owned(),
        mdm_platform: "Microsoft Intune".to_owned(),
        ..ConfigRequest::default()
    }
}

pub struct Fixture {
    pub bundle: Bundle,
    pub storage: Storage,
    pub downloads: Arc<MemoryDownloadStore>,
    pub dir: TempDir,
}

pub async fn fixture(layout: BundleLayout) -> Fixture {
    fixture_with(BundleConfig { templates_dir: templates_dir(), layout, ..BundleConfig::default() })
        .await
}

pub async fn fixture_with(config: BundleConfig) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let storage = Storage::builder().root(dir.path().join("scratch")).connect().await.unwrap();
    let downloads = Arc::new(MemoryDownloadStore::new());
    let store: Arc<dyn DownloadStore> = downloads.clone();
    let bundle = Bundle::open(config, storage.clone(), store).unwrap();

    Fixture { bundle, storage, downloads, dir }
}
