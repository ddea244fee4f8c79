use crate::engine::{Storage, StorageInner};
use crate::error::{StorageError, StorageErrorExt};
use private::Sealed;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::time::Duration;
use tokio::fs;
use tracing::info;

/// Artifacts older than this are considered abandoned.
const DEFAULT_RETENTION: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
struct StorageConfig {
    create: bool,
    retention: Duration,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { create: true, retention: DEFAULT_RETENTION }
    }
}

#[derive(Debug, Default)]
pub struct NoRoot;
#[derive(Debug)]
pub struct WithRoot(PathBuf);

mod private {
    pub(super) trait Sealed {}
}
impl Sealed for NoRoot {}
impl Sealed for WithRoot {}

#[allow(private_bounds)]
#[derive(Debug, Default)]
pub struct StorageBuilder<S: Sealed = NoRoot> {
    state: S,
    config: StorageConfig,
}

#[allow(private_bounds)]
impl<S: Sealed> StorageBuilder<S> {
    #[must_use = "Sets whether the root directory should be created if it does not exist"]
    pub const fn create(mut self, enable: bool) -> Self {
        self.config.create = enable;
        self
    }

    #[must_use = "Sets how long an artifact may stay on disk before it is reclaimed"]
    pub const fn retention(mut self, retention: Duration) -> Self {
        self.config.retention = retention;
        self
    }

    fn transition<N: Sealed>(self, state: N) -> StorageBuilder<N> {
        StorageBuilder { state, config: self.config }
    }
}

impl StorageBuilder<NoRoot> {
    #[must_use = "Creates a new storage builder with default configuration"]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use = "Sets the root directory path for the storage engine"]
    pub fn root(self, path: impl Into<PathBuf>) -> StorageBuilder<WithRoot> {
        self.transition(WithRoot(path.into()))
    }
}

impl StorageBuilder<WithRoot> {
    /// Consumes the configuration and opens the scratch storage.
    ///
    /// 1. Creates the root directory when `create(true)` (the default) was set.
    /// 2. Canonicalizes the root so sandbox checks compare physical paths.
    /// 3. Reclaims temp files and artifacts older than the retention window. Cleanup
    ///    failures are logged and never abort the boot.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] if the root cannot be created or resolved.
    pub async fn connect(self) -> Result<Storage, StorageError> {
        let root = &self.state.0;

        if self.config.create {
            fs::create_dir_all(root)
                .await
                .context(format!("Failed to bootstrap scratch root: {}", root.display()))?;
        }

        let canonical = fs::canonicalize(root)
            .await
            .context(format!("Failed to resolve scratch root: {}", root.display()))?;

        info!(path = %canonical.display(), retention = ?self.config.retention, "Scratch storage ready");

        let storage = Storage {
            inner: Arc::new(StorageInner {
                root: canonical,
                retention: self.config.retention,
                tmp_counter: AtomicU64::new(1),
            }),
        };

        storage.purge_stale().await;

        Ok(storage)
    }
}
