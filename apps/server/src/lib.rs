//! # NSGEN Server
//!
//! HTTP front of the bundle generator: serves the form API, the deferred download endpoint
//! and the `OpenAPI` documentation on `Axum`.
//!
//! ## Example
//! ```no_run
//! use nsgen_server::Server;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     Server::builder()
//!         .port(3001)
//!         .build()
//!         .await?
//!         .run()
//!         .await
//! }
//! ```

mod router;

use anyhow::{Context, Result, anyhow};
use axum_server::Handle;
use axum_server::tls_rustls::RustlsConfig;
use nsgen_kernel::prelude::{ApiConfig, ApiState};
use nsgen_storage::Storage;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info};

/// Time in-flight requests get to finish after a shutdown signal.
const GRACEFUL_SHUTDOWN: Duration = Duration::from_secs(30);

/// A fluent builder for configuring and initializing the [`Server`].
#[must_use = "builders do nothing unless you call .build()"]
#[derive(Debug, Default)]
pub struct ServerBuilder {
    cfg: ApiConfig,
}

impl ServerBuilder {
    /// Set up the server's configuration.
    pub fn config(mut self, cfg: ApiConfig) -> Self {
        self.cfg = cfg;
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.cfg.server.port = port;
        self
    }

    /// Opens the scratch directory; leftovers older than one download lifetime are purged.
    async fn init_storage(&self) -> Result<Storage> {
        Storage::builder()
            .root(&self.cfg.storage.scratch_dir)
            .retention(Duration::from_secs(self.cfg.bundle.download_ttl_seconds))
            .connect()
            .await
            .context("Failed to open scratch storage")
    }

    fn validate_ssl_config(&self) -> Result<()> {
        if let Some(ssl) = &self.cfg.server.ssl {
            if !ssl.cert.exists() {
                anyhow::bail!("SSL certificate not found at: {}", ssl.cert.display());
            }
            if !ssl.key.exists() {
                anyhow::bail!("SSL key not found at: {}", ssl.key.display());
            }

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                let metadata = ssl.key.metadata()?;
                if metadata.permissions().mode() & 0o077 != 0 {
                    tracing::warn!(
                        "SECURITY: SSL Private Key {} has insecure permissions (should be 600)",
                        ssl.key.display()
                    );
                }
            }
        }
        Ok(())
    }

    /// Consumes the builder and initializes the server.
    ///
    /// # Process
    /// 1. Validates the TLS files when TLS is configured
    /// 2. Opens the scratch storage and purges stale archives
    /// 3. Initializes the bundle slice (templates directory, TTL, archive name)
    /// 4. Constructs application state
    ///
    /// # Errors
    /// Returns an error if:
    /// * SSL certificate/key files are missing
    /// * The scratch directory cannot be created
    /// * The bundle configuration is unusable
    pub async fn build(self) -> Result<Server> {
        self.validate_ssl_config()?;

        let address = SocketAddr::new(self.cfg.server.address, self.cfg.server.port);
        info!(address = %address, "Initializing server");

        let storage = self.init_storage().await?;
        let bundle = nsgen_bundle::init(&self.cfg.bundle, storage)
            .map_err(|e| anyhow!("Bundle slice bootstrap failed: {e}"))?;

        let state = ApiState::builder()
            .config(self.cfg)
            .register_slices([bundle])
            .build()
            .context("Failed to finalize API state registry")?;

        info!(slices = state.slice_ids().count(), "API state ready");
        Ok(Server { state })
    }
}

/// A fully initialized server instance ready to run.
#[must_use = "call .run().await to start the server"]
#[derive(Debug)]
pub struct Server {
    state: ApiState,
}

impl Server {
    /// Returns a new [`ServerBuilder`] to configure the server.
    pub fn builder() -> ServerBuilder {
        ServerBuilder::default()
    }

    /// Serves HTTP (or HTTPS when `[server.ssl]` is set) until SIGINT/SIGTERM, then drains
    /// in-flight requests for up to [`GRACEFUL_SHUTDOWN`].
    ///
    /// # Errors
    /// Returns an error if binding fails or the TLS material cannot be loaded.
    pub async fn run(self) -> Result<()> {
        let server = self.state.config.server.clone();
        let address = SocketAddr::new(server.address, server.port);
        let app = router::init(self.state).into_make_service();

        let handle = Handle::<SocketAddr>::new();
        tokio::spawn(drain_on_signal(handle.clone()));

        match &server.ssl {
            Some(ssl) => {
                let tls = RustlsConfig::from_pem_file(&ssl.cert, &ssl.key)
                    .await
                    .context("Failed to load SSL/TLS certificates")?;

                info!(address = %address, scheme = "https", "Serving bundle API");
                axum_server::bind_rustls(address, tls)
                    .handle(handle)
                    .serve(app)
                    .await
                    .context("HTTPS server failed")?;
            },
            None => {
                info!(address = %address, scheme = "http", "Serving bundle API");
                axum_server::bind(address).handle(handle).serve(app).await.context("HTTP server failed")?;
            },
        }

        info!("Server shutdown complete");
        Ok(())
    }

    /// Returns a reference to the application state.
    #[must_use]
    pub const fn state(&self) -> &ApiState {
        &self.state
    }
}

async fn drain_on_signal(handle: Handle<SocketAddr>) {
    if let Err(e) = shutdown_signal().await {
        error!(error = %e, "Shutdown signal listener failed");
        return;
    }
    info!(grace = ?GRACEFUL_SHUTDOWN, "Shutdown requested, draining connections");
    handle.graceful_shutdown(Some(GRACEFUL_SHUTDOWN));
}

/// Waits for SIGINT (Ctrl+C) or, on Unix, SIGTERM.
async fn shutdown_signal() -> Result<()> {
    let ctrl_c = async { signal::ctrl_c().await.context("Failed to install Ctrl+C handler") };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .context("Failed to install SIGTERM handler")?
            .recv()
            .await;
        Ok::<_, anyhow::Error>(())
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<Result<()>>();

    tokio::select! {
        res = ctrl_c => {
            res.context("Ctrl+C signal received")?;
        },
        res = terminate => {
            res.context("SIGTERM signal received")?;
        },
    }

    Ok(())
}
