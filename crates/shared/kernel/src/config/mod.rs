use config::{Config, Environment, File};
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Prefix of environment overrides, e.g. `NSGEN__SERVER__PORT=8080`.
pub const ENV_PREFIX: &str = "NSGEN";
const DEFAULT_CONFIG_PATH: &str = "server";

#[nsgen_derive::nsgen_error]
pub enum ConfigError {
    #[error("Config error{}: {source}", format_context(.context))]
    Config { source: config::ConfigError, context: Option<Cow<'static, str>> },
}

/// Loads configuration from a file layered with environment overrides.
///
/// 1. **Base file**: `path`, or `server` (any supported extension) in the working directory.
///    An explicitly given file must exist; the default file is optional so the service can
///    start on built-in defaults.
/// 2. **Environment**: variables prefixed with `NSGEN__`, nested with `__`
///    (`NSGEN__BUNDLE__LAYOUT=mobileconfig` sets `bundle.layout`).
///
/// # Errors
/// Returns [`ConfigError::Config`] if a required file is missing or the merged values do not
/// deserialize into `T`.
///
/// # Example
/// ```rust
/// use nsgen_kernel::config::load_config;
///
/// #[derive(Default, serde::Deserialize)]
/// struct AppConfig {
///     port: u16,
/// }
///
/// let cfg: AppConfig = load_config(Some("config/local")).unwrap_or_default();
/// ```
pub fn load_config<T>(path: Option<impl AsRef<Path>>) -> Result<T, ConfigError>
where
    T: DeserializeOwned,
{
    let required = path.is_some();
    let effective_path =
        path.map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), |p| p.as_ref().to_path_buf());

    let builder = Config::builder()
        .add_source(File::from(effective_path.as_path()).required(required))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .try_parsing(true)
                .separator("__")
                .convert_case(config::Case::Snake),
        );

    debug!(path = %effective_path.display(), required, "Loading config");

    let config = builder
        .build()
        .context("Failed to build config")?
        .try_deserialize::<T>()
        .context("Failed to deserialize config")?;

    Ok(config)
}
