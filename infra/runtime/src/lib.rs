//! # Runtime
//!
//! Builds the multi-threaded [Tokio](https://tokio.rs) runtime the server runs on.
//!
//! The binary loads its configuration before any async code exists, so the runtime is
//! created explicitly from the `[runtime]` section instead of through `#[tokio::main]`.
//!
//! ## Profiles
//! * **High Performance**: larger stacks and long keep-alive; the server default.
//! * **Memory Efficient**: half the workers and small stacks for constrained hosts.
//! * **Balanced**: stock defaults.
//!
//! ## Example
//!
//! ```rust
//! use nsgen_domain::config::{RuntimeProfile, RuntimeSettings};
//! use nsgen_runtime::{build_runtime_with_config, RuntimeConfig};
//!
//! let settings = RuntimeSettings { profile: RuntimeProfile::Balanced, worker_threads: Some(2) };
//! let runtime = build_runtime_with_config(&RuntimeConfig::from_settings(&settings))?;
//! assert_eq!(runtime.block_on(async { 21 * 2 }), 42);
//! # Ok::<(), anyhow::Error>(())
//! ```

pub use anyhow::Result;

use anyhow::anyhow;
use nsgen_domain::config::{RuntimeProfile, RuntimeSettings};
use std::{sync::OnceLock, thread::available_parallelism, time::Duration};
use tokio::runtime::{Builder, Runtime};
use tracing::debug;

/// The default number of worker threads if detection fails.
const DEFAULT_WORKER_THREADS: usize = 4;
/// The default stack size for threads (3 `MiB`).
const DEFAULT_STACK_SIZE: usize = 3 * 1024 * 1024;
const MIN_STACK_SIZE: usize = 1024 * 1024;
const MAX_STACK_SIZE: usize = 16 * 1024 * 1024;
const MAX_WORKER_THREADS: usize = 1024;
const THREAD_KEEP_ALIVE: Duration = Duration::from_secs(60);
const DEFAULT_THREAD_NAME: &str = "nsgen-worker";

static WORKER_THREADS: OnceLock<usize> = OnceLock::new();

/// `TOKIO_WORKER_THREADS` if set and sane, otherwise the available parallelism.
fn detected_worker_threads() -> usize {
    *WORKER_THREADS.get_or_init(|| {
        std::env::var("TOKIO_WORKER_THREADS")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .filter(|&n| n > 0 && n <= MAX_WORKER_THREADS)
            .unwrap_or_else(|| {
                available_parallelism()
                    .map(std::num::NonZero::get)
                    .unwrap_or(DEFAULT_WORKER_THREADS)
            })
    })
}

const fn clamp_stack_size(stack_size: usize) -> usize {
    if stack_size < MIN_STACK_SIZE {
        MIN_STACK_SIZE
    } else if stack_size > MAX_STACK_SIZE {
        MAX_STACK_SIZE
    } else {
        stack_size
    }
}

/// Parameters of the Tokio runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub worker_threads: usize,
    pub stack_size: usize,
    pub thread_name: String,
    pub thread_keep_alive: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            worker_threads: detected_worker_threads(),
            stack_size: DEFAULT_STACK_SIZE,
            thread_name: DEFAULT_THREAD_NAME.to_owned(),
            thread_keep_alive: THREAD_KEEP_ALIVE,
        }
    }
}

impl RuntimeConfig {
    /// Preset for the HTTP server under load.
    #[must_use = "Use this configuration for high-performance server applications"]
    pub fn high_performance() -> Self {
        Self {
            worker_threads: detected_worker_threads(),
            stack_size: 4 * 1024 * 1024,
            thread_name: "nsgen-hp".to_owned(),
            thread_keep_alive: Duration::from_secs(300),
        }
    }

    /// Preset for small containers where memory footprint matters.
    #[must_use = "Use this configuration for resource-constrained hosts"]
    pub fn memory_efficient() -> Self {
        Self {
            worker_threads: (detected_worker_threads() / 2).max(1),
            stack_size: 2 * 1024 * 1024,
            thread_name: "nsgen-mem".to_owned(),
            thread_keep_alive: Duration::from_secs(30),
        }
    }

    /// Resolves the configured profile, applying an explicit worker count when present.
    #[must_use]
    pub fn from_settings(settings: &RuntimeSettings) -> Self {
        let config = match settings.profile {
            RuntimeProfile::HighPerformance => Self::high_performance(),
            RuntimeProfile::MemoryEfficient => Self::memory_efficient(),
            RuntimeProfile::Balanced => Self::default(),
        };

        match settings.worker_threads {
            Some(threads) => config.with_worker_threads(threads),
            None => config,
        }
    }

    #[must_use = "Customize the number of worker threads for the runtime"]
    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = threads.clamp(1, MAX_WORKER_THREADS);
        self
    }

    #[must_use = "Customize the stack size for worker threads"]
    pub const fn with_stack_size(mut self, size: usize) -> Self {
        self.stack_size = clamp_stack_size(size);
        self
    }

    #[must_use = "Customize the thread name"]
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.thread_name = if name.trim().is_empty() { DEFAULT_THREAD_NAME.to_owned() } else { name };
        self
    }

    fn normalized(&self) -> Self {
        self.clone()
            .with_worker_threads(self.worker_threads)
            .with_stack_size(self.stack_size)
            .with_thread_name(self.thread_name.clone())
    }
}

/// Creates a multi-threaded runtime with I/O and timers enabled.
///
/// Out-of-range values in `config` are clamped rather than rejected.
///
/// # Errors
///
/// Returns an error if the OS refuses to create the runtime (thread or descriptor limits).
pub fn build_runtime_with_config(config: &RuntimeConfig) -> Result<Runtime> {
    let config = config.normalized();
    debug!(config = ?config, "Building tokio runtime");

    let mut builder = Builder::new_multi_thread();
    builder
        .worker_threads(config.worker_threads)
        .thread_name(&config.thread_name)
        .thread_stack_size(config.stack_size)
        .thread_keep_alive(config.thread_keep_alive)
        .enable_all();

    builder.build().map_err(|e| anyhow!("Failed to initialize runtime: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_threads_validation() {
        let config = RuntimeConfig::default().with_worker_threads(0);
        assert_eq!(config.worker_threads, 1);

        let config = RuntimeConfig::default().with_worker_threads(2000);
        assert_eq!(config.worker_threads, MAX_WORKER_THREADS);
    }

    #[test]
    fn test_stack_size_validation() {
        let config = RuntimeConfig::default().with_stack_size(100);
        assert_eq!(config.stack_size, MIN_STACK_SIZE);

        let config = RuntimeConfig::default().with_stack_size(100 * 1024 * 1024);
        assert_eq!(config.stack_size, MAX_STACK_SIZE);
    }

    #[test]
    fn test_profiles_resolve_from_settings() {
        let hp = RuntimeConfig::from_settings(&RuntimeSettings::default());
        assert_eq!(hp, RuntimeConfig::high_performance());

        let settings =
            RuntimeSettings { profile: RuntimeProfile::MemoryEfficient, worker_threads: Some(3) };
        let mem = RuntimeConfig::from_settings(&settings);
        assert_eq!(mem.worker_threads, 3);
        assert_eq!(mem.thread_name, "nsgen-mem");
        assert!(mem.stack_size < hp.stack_size);
    }

    #[test]
    fn test_blank_thread_name_falls_back() {
        let config = RuntimeConfig::default().with_thread_name("   ");
        assert_eq!(config.thread_name, DEFAULT_THREAD_NAME);
    }

    #[test]
    fn test_runtime_executes_futures() -> Result<()> {
        let config = RuntimeConfig::default().with_worker_threads(1);
        let runtime = build_runtime_with_config(&config)?;
        assert_eq!(runtime.block_on(async { 7 }), 7);
        Ok(())
    }
}
