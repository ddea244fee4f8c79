use crate::constants::{DEFAULT_ARCHIVE_NAME, DEFAULT_DOWNLOAD_TTL_SECONDS};
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use std::ops::{Deref, DerefMut};
use std::path::PathBuf;
use std::sync::Arc;

/// Top-level service configuration.
#[derive(Default, Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfigInner {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub bundle: BundleConfig,
    pub logging: LoggingConfig,
    pub runtime: RuntimeSettings,
}

/// Thin Arc-wrapped config for inexpensive cloning into subsystems.
#[derive(Default, Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(flatten, default)]
    inner: Arc<ApiConfigInner>,
}

impl Deref for ApiConfig {
    type Target = ApiConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for ApiConfig {
    fn deref_mut(&mut self) -> &mut ApiConfigInner {
        Arc::make_mut(&mut self.inner)
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub address: IpAddr,
    pub port: u16,
    pub ssl: Option<SslConfig>,
}

/// TLS certificate/key paths.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SslConfig {
    pub cert: PathBuf,
    pub key: PathBuf,
}

/// Scratch storage for archives waiting to be downloaded.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub scratch_dir: PathBuf,
}

/// Which documents make up a bundle and how they are named inside the archive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BundleLayout {
    /// Property list plus `pre-install.sh` / `post-install.sh`.
    #[default]
    Plist,
    /// Configuration profile plus `pre-install.sh` / `post-install.sh`.
    Mobileconfig,
    /// Property list plus the script names expected by the legacy Intune flow.
    IntuneLegacy,
}

impl BundleLayout {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Plist => "plist",
            Self::Mobileconfig => "mobileconfig",
            Self::IntuneLegacy => "intune-legacy",
        }
    }
}

/// Template rendering and archive delivery settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BundleConfig {
    pub templates_dir: PathBuf,
    pub layout: BundleLayout,
    pub download_ttl_seconds: u64,
    pub archive_name: String,
}

/// Log output settings consumed by the binary when building the logger.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Env-filter directives, e.g. `"info,tower_http=debug"`.
    pub filter: String,
    /// Directory for rolling log files. Console only when absent.
    pub dir: Option<PathBuf>,
    pub json: bool,
}

/// Named tokio runtime presets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuntimeProfile {
    #[default]
    HighPerformance,
    MemoryEfficient,
    Balanced,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RuntimeSettings {
    pub profile: RuntimeProfile,
    pub worker_threads: Option<usize>,
}

// --- Default ---

impl Default for ServerConfig {
    fn default() -> Self {
        Self { address: IpAddr::V4(Ipv4Addr::UNSPECIFIED), port: 3001, ssl: None }
    }
}

impl Default for SslConfig {
    fn default() -> Self {
        Self { cert: PathBuf::from("cert.pem"), key: PathBuf::from("key.pem") }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { scratch_dir: PathBuf::from("scratch") }
    }
}

impl Default for BundleConfig {
    fn default() -> Self {
        Self {
            templates_dir: PathBuf::from("templates"),
            layout: BundleLayout::default(),
            download_ttl_seconds: DEFAULT_DOWNLOAD_TTL_SECONDS,
            archive_name: DEFAULT_ARCHIVE_NAME.to_owned(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { filter: "info".to_owned(), dir: None, json: false }
    }
}
