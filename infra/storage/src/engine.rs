//! The [`Storage`] handle: sandboxed, atomic file I/O under one scratch root.

use crate::builder::StorageBuilder;
use crate::error::{StorageError, StorageErrorExt};
use crate::maintenance::{self, TMP_MARKER};
use crate::security;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// The internal shared state of a [`Storage`] instance.
#[derive(Debug)]
pub struct StorageInner {
    /// The canonicalized physical root all paths are resolved against.
    pub(crate) root: PathBuf,
    /// Age after which files are reclaimed by [`Storage::purge_stale`].
    pub(crate) retention: Duration,
    /// Source of unique temp-file suffixes.
    pub(crate) tmp_counter: AtomicU64,
}

/// A thread-safe handle to the scratch storage.
///
/// The handle is reference-counted and cheap to clone across tasks. All paths are relative
/// to the root and validated before touching the disk.
#[derive(Debug, Clone)]
pub struct Storage {
    pub(crate) inner: Arc<StorageInner>,
}

impl Deref for Storage {
    type Target = StorageInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl Storage {
    #[must_use = "The storage engine is not initialized until you call .connect()"]
    pub fn builder() -> StorageBuilder {
        StorageBuilder::new()
    }

    /// The canonical root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves a relative path to a physical path inside the root.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::PathTraversalAttempt`] if the path is absolute, empty, or
    /// would escape the root. Returns [`StorageError::Io`] if an ancestor cannot be verified.
    pub fn resolve(&self, path: impl AsRef<Path>) -> Result<PathBuf, StorageError> {
        security::resolve_path(&self.root, path)
    }

    /// Reads a whole file.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::FileNotFound`] if the file does not exist and
    /// [`StorageError::Io`] for any other read failure.
    pub async fn read(&self, path: impl AsRef<Path>) -> Result<Vec<u8>, StorageError> {
        let resolved = self.resolve(path)?;

        match fs::read(&resolved).await {
            Ok(data) => Ok(data),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::FileNotFound {
                    message: resolved.display().to_string().into(),
                    context: None,
                })
            },
            Err(err) => Err(StorageError::Io {
                source: err,
                context: Some(format!("Read failed: {}", resolved.display()).into()),
            }),
        }
    }

    /// Writes a file atomically.
    ///
    /// Data is written to `<name>.nsgentmp.<n>`, synced, and renamed over the target, so the
    /// target is either absent or complete. Parent directories are created as needed.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::PathTraversalAttempt`] if the path escapes the root and
    /// [`StorageError::Io`] if the disk refuses the write.
    pub async fn write(&self, path: impl AsRef<Path>, data: &[u8]) -> Result<(), StorageError> {
        let resolved = self.resolve(path)?;

        if let Some(parent) = resolved.parent() {
            fs::create_dir_all(parent)
                .await
                .context(format!("Failed to create parent of {}", resolved.display()))?;
        }

        let temp = unique_tmp_path(&resolved, &self.tmp_counter);

        let written = async {
            let mut file = fs::OpenOptions::new()
                .create_new(true)
                .write(true)
                .open(&temp)
                .await
                .context(format!("Temp creation failed: {}", temp.display()))?;
            file.write_all(data).await.context("Write failed")?;
            file.sync_all().await.context("Hardware sync failed")?;
            fs::rename(&temp, &resolved).await.context(format!(
                "Atomic swap failed: {} -> {}",
                temp.display(),
                resolved.display()
            ))
        }
        .await;

        if written.is_err() {
            let _ = fs::remove_file(&temp).await;
        }
        written?;

        debug!(path = %resolved.display(), bytes = data.len(), "File saved atomically");
        Ok(())
    }

    /// Deletes a file.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::FileNotFound`] if there is nothing to delete and
    /// [`StorageError::Io`] if the removal fails.
    pub async fn delete(&self, path: impl AsRef<Path>) -> Result<(), StorageError> {
        let resolved = self.resolve(path)?;

        match fs::remove_file(&resolved).await {
            Ok(()) => {
                debug!(path = %resolved.display(), "File deleted");
                Ok(())
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::FileNotFound {
                    message: resolved.display().to_string().into(),
                    context: None,
                })
            },
            Err(err) => Err(StorageError::Io {
                source: err,
                context: Some(format!("Failed to delete: {}", resolved.display()).into()),
            }),
        }
    }

    /// Deletes a file if it is still there; a missing file is not an error.
    ///
    /// Failures are logged rather than returned: callers use this on paths they already
    /// gave up on.
    pub async fn discard(&self, path: impl AsRef<Path>) {
        match self.delete(path).await {
            Ok(()) | Err(StorageError::FileNotFound { .. }) => {},
            Err(err) => warn!(error = %err, "Failed to discard scratch file"),
        }
    }

    /// Checks whether a file exists.
    ///
    /// # Errors
    ///
    /// Returns an error only if path resolution fails.
    pub fn exists(&self, path: impl AsRef<Path>) -> Result<bool, StorageError> {
        Ok(self.resolve(path)?.exists())
    }

    /// Removes temp files and artifacts older than the retention window.
    ///
    /// Returns how many files were removed.
    pub async fn purge_stale(&self) -> usize {
        maintenance::purge_stale(&self.root, self.retention).await
    }
}

fn unique_tmp_path(target: &Path, counter: &AtomicU64) -> PathBuf {
    let counter = counter.fetch_add(1, Ordering::Relaxed);
    let file_name = target.file_name().and_then(|s| s.to_str()).unwrap_or("scratch");
    target.with_file_name(format!("{file_name}{TMP_MARKER}{counter}"))
}
