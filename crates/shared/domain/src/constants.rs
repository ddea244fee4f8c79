//! Wire-level constants shared between the HTTP layer and the bundle generator.

/// `OpenAPI` tag of the operational endpoints.
pub const SYSTEM_TAG: &str = "System";
/// `OpenAPI` tag of the bundle generation endpoints.
pub const BUNDLE_TAG: &str = "Bundle";

/// File name suggested to the browser for every generated archive.
pub const DEFAULT_ARCHIVE_NAME: &str = "netskope_config.zip";
/// Lifetime of a deferred download handle.
pub const DEFAULT_DOWNLOAD_TTL_SECONDS: u64 = 300;
/// Prefix every tenant addon host starts with.
pub const ADDON_HOST_PREFIX: &str = "addon-";
