use anyhow::Context;
use nsgen_kernel::config::load_config;
use nsgen_kernel::prelude::ApiConfig;
use nsgen_logger::Logger;
use nsgen_runtime::{RuntimeConfig, build_runtime_with_config};
use nsgen_server::Server;
use tracing::info;

#[cfg(feature = "profiling")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

fn main() -> anyhow::Result<()> {
    #[cfg(feature = "profiling")]
    let _profiler = dhat::Profiler::new_heap();

    let cfg: ApiConfig =
        load_config(None::<&str>).context("Critical: Configuration is malformed")?;

    let logger = Logger::builder().name(env!("CARGO_PKG_NAME")).env_filter(&cfg.logging.filter);
    let _log = match &cfg.logging.dir {
        Some(dir) => logger.path(dir).json(cfg.logging.json).init()?,
        None => logger.init()?,
    };

    info!(
        layout = cfg.bundle.layout.as_str(),
        templates = %cfg.bundle.templates_dir.display(),
        scratch = %cfg.storage.scratch_dir.display(),
        ttl_seconds = cfg.bundle.download_ttl_seconds,
        runtime = ?cfg.runtime.profile,
        "Configuration loaded"
    );

    let runtime = build_runtime_with_config(&RuntimeConfig::from_settings(&cfg.runtime))?;

    runtime.block_on(async { Server::builder().config(cfg).build().await?.run().await })
}
