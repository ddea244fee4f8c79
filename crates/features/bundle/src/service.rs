use crate::archive;
use crate::downloads::{DownloadHandle, DownloadStore};
use crate::error::{BundleError, BundleErrorExt};
use crate::model::{ConfigRequest, Submission};
use crate::renderer::{self, RenderedBundle};
use crate::template::TemplateSet;
use crate::{Bundle, BundleInner};
use chrono::{DateTime, Utc};
use nsgen_domain::config::BundleConfig;
use nsgen_kernel::{SAFE_ALPHABET, safe_nanoid};
use nsgen_storage::{Storage, StorageError};
use std::borrow::Cow;
use std::sync::Arc;
use tracing::{debug, info};

/// Length of download tokens.
pub(crate) const TOKEN_LENGTH: usize = 24;
const TOKEN_ATTEMPTS: usize = 4;

/// Result of a deferred generation: where and until when the archive can be fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTicket {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl Bundle {
    /// Builds the slice after checking the configuration.
    ///
    /// # Errors
    /// Returns [`BundleError::ConfigConsistency`] if the TTL is zero, the archive name is not
    /// a plain `*.zip` file name, or the templates directory does not exist.
    pub fn open(
        config: BundleConfig,
        storage: Storage,
        downloads: Arc<dyn DownloadStore>,
    ) -> Result<Self, BundleError> {
        validate_config(&config)?;
        Ok(Self::new(BundleInner { config, storage, downloads }))
    }

    #[must_use]
    pub fn config(&self) -> &BundleConfig {
        &self.config
    }

    /// Loads the configured layout's templates. Read on every call so edits apply without
    /// a restart.
    ///
    /// # Errors
    /// See [`TemplateSet::load`].
    pub async fn templates(&self) -> Result<TemplateSet, BundleError> {
        TemplateSet::load(&self.config.templates_dir, self.config.layout).await
    }

    /// Validates `request`, loads the templates and renders them.
    ///
    /// Validation happens before any file is touched.
    ///
    /// # Errors
    /// [`BundleError::Validation`] for bad input; template and consistency failures otherwise.
    pub async fn render(&self, request: ConfigRequest) -> Result<RenderedBundle, BundleError> {
        let submission = Submission::try_from(request)?;
        let templates = self.templates().await?;
        let bundle = renderer::render(&submission, &templates)?;

        info!(
            tenant = %submission.tenant_name,
            platform = %submission.mdm_platform,
            layout = self.config.layout.as_str(),
            multi_user = submission.is_multi_user,
            entries = bundle.len(),
            "Bundle rendered"
        );
        Ok(bundle)
    }

    /// Streamed mode: the finished archive bytes.
    ///
    /// # Errors
    /// Any error of [`Bundle::render`] or [`archive::assemble`].
    pub async fn generate_archive(&self, request: ConfigRequest) -> Result<Vec<u8>, BundleError> {
        let bundle = self.render(request).await?;
        archive::assemble(&bundle)
    }

    /// Deferred mode: stores the archive in scratch storage behind a fresh token.
    ///
    /// # Errors
    /// Any error of [`Bundle::generate_archive`], or [`BundleError::Storage`] if the archive
    /// cannot be written.
    pub async fn generate_link(&self, request: ConfigRequest) -> Result<DownloadTicket, BundleError> {
        let bytes = self.generate_archive(request).await?;
        self.persist(&bytes).await
    }

    /// Registers `archive` under a new token, then writes it atomically.
    ///
    /// Unclaimed handles that already expired are swept first, archives included.
    ///
    /// The token is only returned after the file exists, so nobody can claim it early.
    ///
    /// # Errors
    /// Returns [`BundleError::Storage`] if the write fails; the handle is withdrawn.
    pub async fn persist(&self, archive: &[u8]) -> Result<DownloadTicket, BundleError> {
        self.sweep_expired().await;

        for _ in 0..TOKEN_ATTEMPTS {
            let token = safe_nanoid!(TOKEN_LENGTH);
            let handle = DownloadHandle::new(format!("{token}.zip"), self.config.download_ttl_seconds);
            let expires_at = handle.expires_at;
            let file = handle.file.clone();

            if !self.downloads.put(&token, handle) {
                debug!("Download token collision, retrying");
                continue;
            }

            if let Err(err) = self.storage.write(&file, archive).await {
                self.downloads.take(&token);
                return Err(err).context("Failed to store archive for download");
            }

            info!(token = %token, bytes = archive.len(), expires_at = %expires_at, "Archive stored for download");
            return Ok(DownloadTicket { token, expires_at });
        }

        Err(BundleError::Internal {
            message: "could not allocate a unique download token".into(),
            context: None,
        })
    }

    /// Drops handles nobody claimed in time, together with their archives.
    async fn sweep_expired(&self) {
        let expired = self.downloads.drain_expired(Utc::now());
        if expired.is_empty() {
            return;
        }

        for handle in &expired {
            self.storage.discard(&handle.file).await;
        }
        debug!(count = expired.len(), "Expired downloads swept");
    }

    /// Claims the archive behind `token`.
    ///
    /// The handle is removed before anything else, so a token works at most once. Expired
    /// handles have their file deleted and report not-found; successful claims delete the
    /// file once it has been read.
    ///
    /// # Errors
    /// Returns [`BundleError::NotFound`] for unknown, claimed or expired tokens.
    pub async fn download(&self, token: &str) -> Result<Vec<u8>, BundleError> {
        if !is_token(token) {
            return Err(BundleError::not_found("malformed token"));
        }

        let handle = self
            .downloads
            .take(token)
            .ok_or_else(|| BundleError::not_found("unknown token"))?;

        if handle.is_expired_at(Utc::now()) {
            self.storage.discard(&handle.file).await;
            debug!(token = %token, "Expired download discarded");
            return Err(BundleError::not_found("token expired"));
        }

        let bytes = match self.storage.read(&handle.file).await {
            Ok(bytes) => bytes,
            Err(StorageError::FileNotFound { .. }) => {
                return Err(BundleError::not_found("archive no longer exists"));
            },
            Err(err) => {
                self.storage.discard(&handle.file).await;
                return Err(err).context("Failed to read stored archive");
            },
        };
        self.storage.discard(&handle.file).await;

        info!(token = %token, bytes = bytes.len(), "Archive downloaded");
        Ok(bytes)
    }
}

fn is_token(token: &str) -> bool {
    token.len() == TOKEN_LENGTH && token.chars().all(|c| SAFE_ALPHABET.contains(&c))
}

fn validate_config(config: &BundleConfig) -> Result<(), BundleError> {
    let invalid = |message: Cow<'static, str>| BundleError::ConfigConsistency {
        message,
        context: Some("bundle configuration".into()),
    };

    if config.download_ttl_seconds == 0 {
        return Err(invalid("download_ttl_seconds must be greater than zero".into()));
    }

    let name = &config.archive_name;
    let plain = !name.is_empty()
        && name.ends_with(".zip")
        && !name.chars().any(|c| c.is_control() || matches!(c, '/' | '\\' | '"'));
    if !plain {
        return Err(invalid(format!("archive_name '{name}' must be a plain *.zip file name").into()));
    }

    if !config.templates_dir.is_dir() {
        return Err(invalid(
            format!("templates directory {} does not exist", config.templates_dir.display())
                .into(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_tokens_are_recognized() {
        assert!(is_token(&safe_nanoid!(TOKEN_LENGTH)));
        assert!(!is_token("../../etc/passwd"));
        assert!(!is_token(&"0".repeat(TOKEN_LENGTH)));
    }

    #[test]
    fn config_validation_rejects_unusable_settings() {
        let dir = tempfile::tempdir().unwrap();
        let valid = BundleConfig { templates_dir: dir.path().to_path_buf(), ..BundleConfig::default() };
        assert!(validate_config(&valid).is_ok());

        for broken in [
            BundleConfig { download_ttl_seconds: 0, ..valid.clone() },
            BundleConfig { archive_name: "bundle.tar".to_owned(), ..valid.clone() },
            BundleConfig { archive_name: "../x.zip".to_owned(), ..valid.clone() },
            BundleConfig { templates_dir: dir.path().join("missing"), ..valid.clone() },
        ] {
            let err = validate_config(&broken).unwrap_err();
            assert!(matches!(err, BundleError::ConfigConsistency { .. }), "{broken:?}");
        }
    }
}
